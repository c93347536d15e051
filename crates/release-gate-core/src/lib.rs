// crates/release-gate-core/src/lib.rs
// ============================================================================
// Module: Release Gate Core Library
// Description: Public API surface for the release-gate core.
// Purpose: Expose domain types, interfaces, and the promotion controller.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Release gate core moves versioned artifacts through an ordered chain of
//! environments. It validates gates, enforces tag immutability, verifies
//! signatures, freezes environments, and executes rollbacks. The registry,
//! signer, and notifier are reached only through the traits in
//! [`interfaces`], so transports live in sibling crates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::Artifact;
pub use interfaces::AuditError;
pub use interfaces::AuditTrail;
pub use interfaces::Authorizer;
pub use interfaces::Clock;
pub use interfaces::EventNotifier;
pub use interfaces::GateContext;
pub use interfaces::GateError;
pub use interfaces::GateEvaluator;
pub use interfaces::GateVerdict;
pub use interfaces::LayerDescriptor;
pub use interfaces::ManifestRecord;
pub use interfaces::NotifyError;
pub use interfaces::RegistryTransport;
pub use interfaces::SignatureVerifier;
pub use interfaces::TagReservation;
pub use interfaces::VerificationError;
pub use interfaces::VerifiedSignature;
pub use runtime::AnnotationGateEvaluator;
pub use runtime::ControllerLogEvent;
pub use runtime::ControllerLogSink;
pub use runtime::ControllerSettings;
pub use runtime::FileLogSink;
pub use runtime::GateOutcome;
pub use runtime::InMemoryAuditTrail;
pub use runtime::InMemoryNotifier;
pub use runtime::InMemoryRegistry;
pub use runtime::JsonlAuditTrail;
pub use runtime::MemoryLogSink;
pub use runtime::NoopLogSink;
pub use runtime::NoopNotifier;
pub use runtime::PromotionController;
pub use runtime::PromotionRequest;
pub use runtime::RollbackRequest;
pub use runtime::StaticAuthorizer;
pub use runtime::StderrLogSink;
pub use runtime::SystemClock;
pub use runtime::evaluate_gates;
