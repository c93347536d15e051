// crates/release-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Release Gate Runtime
// Description: Promotion controller, gate evaluation, and reference backends.
// Purpose: Execute promotions, locks, and rollbacks against the interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the promotion controller and the in-process
//! implementations of its seams (registry, audit trail, notifier, clock,
//! authorizer, log sinks). Every outer surface calls into the same controller.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod controller;
pub mod gates;
pub mod log;
pub mod registry;
pub mod rollback;
pub mod services;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::InMemoryAuditTrail;
pub use audit::JsonlAuditTrail;
pub use controller::ControllerSettings;
pub use controller::PromotionController;
pub use controller::PromotionRequest;
pub use gates::AnnotationGateEvaluator;
pub use gates::GateOutcome;
pub use gates::evaluate_gates;
pub use log::ControllerLogEvent;
pub use log::ControllerLogSink;
pub use log::FileLogSink;
pub use log::MemoryLogSink;
pub use log::NoopLogSink;
pub use log::StderrLogSink;
pub use registry::InMemoryRegistry;
pub use rollback::RollbackRequest;
pub use services::InMemoryNotifier;
pub use services::NoopNotifier;
pub use services::StaticAuthorizer;
pub use services::SystemClock;
