// crates/release-gate-registry/src/lib.rs
// ============================================================================
// Module: Release Gate Registry Library
// Description: OCI distribution transport and circuit breaker.
// Purpose: Reach a real registry without letting outages cascade.
// Dependencies: release-gate-core, reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! [`OciRegistryClient`] speaks the OCI distribution HTTP API and implements
//! [`release_gate_core::RegistryTransport`]. [`BreakerTransport`] wraps any
//! transport with a shared [`CircuitBreaker`] so repeated availability
//! failures short-circuit without network traffic.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod breaker;
pub mod oci;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use breaker::BreakerClock;
pub use breaker::BreakerTransport;
pub use breaker::CircuitBreaker;
pub use breaker::CircuitBreakerConfig;
pub use breaker::CircuitState;
pub use breaker::ManualBreakerClock;
pub use breaker::SystemBreakerClock;
pub use oci::ANNOTATION_SIDECAR_SUFFIX;
pub use oci::ARTIFACT_TYPE;
pub use oci::OciRegistryClient;
pub use oci::OciRegistryConfig;
