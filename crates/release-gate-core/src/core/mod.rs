// crates/release-gate-core/src/core/mod.rs
// ============================================================================
// Module: Release Gate Core Types
// Description: Canonical domain types for artifact promotion and lifecycle.
// Purpose: Provide stable, serializable types shared by every release-gate crate.
// Dependencies: serde, sha2, thiserror, time
// ============================================================================

//! ## Overview
//! Core types define identifiers, tag policy, environment chains, audit
//! records, lock state, signature metadata, lifecycle events, and the error
//! taxonomy. Transports, signers, and notifiers in sibling crates speak only
//! in these types.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod environment;
pub mod error;
pub mod events;
pub mod identifiers;
pub mod records;
pub mod signature;
pub mod tags;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use environment::ChainError;
pub use environment::EnvironmentChain;
pub use environment::EnvironmentConfig;
pub use environment::GateRequirement;
pub use environment::SignaturePolicy;
pub use error::PromotionError;
pub use error::RegistryError;
pub use error::sanitize_error_summary;
pub use events::LifecycleEvent;
pub use events::LifecycleNotification;
pub use identifiers::Digest;
pub use identifiers::EnvironmentName;
pub use identifiers::GateId;
pub use identifiers::IdentifierError;
pub use identifiers::OperatorId;
pub use identifiers::PromotionId;
pub use identifiers::RollbackId;
pub use identifiers::TagName;
pub use identifiers::TraceId;
pub use identifiers::hex_encode;
pub use records::GateResult;
pub use records::GateStatus;
pub use records::LockStatus;
pub use records::PromotionOutcome;
pub use records::PromotionRecord;
pub use records::RollbackImpact;
pub use records::RollbackRecord;
pub use records::SCHEMA_VERSION_KEY;
pub use records::SupersededArtifact;
pub use signature::SignatureMetadata;
pub use signature::SignatureMode;
pub use tags::SemVer;
pub use tags::environment_tag;
pub use tags::is_immutable_tag;
pub use tags::latest_tag;
pub use tags::rollback_tag;
pub use time::Timestamp;
