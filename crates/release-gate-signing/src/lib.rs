// crates/release-gate-signing/src/lib.rs
// ============================================================================
// Module: Release Gate Signing Library
// Description: Artifact signing and signature bundle verification.
// Purpose: Provide the signing client and the controller's signature verifier.
// Dependencies: release-gate-core, ed25519-dalek, reqwest, serde_jcs
// ============================================================================

//! ## Overview
//! [`SigningClient`] signs artifact content either keylessly (identity token,
//! short-lived certificate, transparency log entry) or with a long-lived
//! ed25519 key, and returns [`release_gate_core::SignatureMetadata`] for the
//! `signature.*` annotations. [`BundleVerifier`] implements
//! [`release_gate_core::SignatureVerifier`] against a [`TrustRoot`].
//! Certificate authority and transparency log services are reached through
//! traits with HTTP and in-process implementations.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod authority;
pub mod bundle;
pub mod client;
pub mod error;
pub mod http;
pub mod identity;
pub mod keys;
pub mod merkle;
pub mod tlog;
pub mod verify;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use authority::CertificateAuthority;
pub use authority::CertificateRequest;
pub use authority::HttpCertificateAuthority;
pub use authority::LocalCertificateAuthority;
pub use bundle::BUNDLE_MEDIA_TYPE;
pub use bundle::SignatureBundle;
pub use bundle::SigningCertificate;
pub use client::SigningClient;
pub use client::attach;
pub use client::fetch;
pub use error::SigningError;
pub use http::ServiceEndpoint;
pub use identity::AmbientTokenSource;
pub use identity::EnvTokenSource;
pub use identity::GithubActionsTokenSource;
pub use identity::IdentityToken;
pub use identity::IdentityTokenSource;
pub use identity::InteractiveTokenSource;
pub use identity::StaticTokenSource;
pub use keys::generate_signing_key;
pub use keys::load_signing_key;
pub use keys::load_verifying_key;
pub use tlog::HttpTransparencyLog;
pub use tlog::InMemoryTransparencyLog;
pub use tlog::LogEntryRequest;
pub use tlog::TransparencyLog;
pub use verify::BundleVerifier;
pub use verify::TrustRoot;
