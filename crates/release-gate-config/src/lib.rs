// crates/release-gate-config/src/lib.rs
// ============================================================================
// Module: Release Gate Config Library
// Description: Canonical config model, validation, and runtime conversion.
// Purpose: Single source of truth for release-gate.toml semantics.
// Dependencies: release-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `release-gate-config` defines the configuration model for the release
//! controller: the environment chain, registry connection and circuit breaker,
//! signing and trust, webhooks, rollback authorization, audit, and logging.
//! Loading is strict and fail-closed; a loaded configuration converts into the
//! runtime types of the other release-gate crates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
