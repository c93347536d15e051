// crates/release-gate-signing/src/error.rs
// ============================================================================
// Module: Signing Errors
// Description: Failures raised while signing, verifying, or storing signatures.
// Purpose: Keep signing failures typed and map them onto promotion errors.
// Dependencies: release-gate-core, thiserror
// ============================================================================

//! ## Overview
//! [`SigningError`] covers identity, key, certificate authority, and
//! transparency log failures. Converting into
//! [`release_gate_core::PromotionError`] keeps registry failures on their own
//! exit codes and reports everything else as a signature failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use release_gate_core::PromotionError;
use release_gate_core::RegistryError;
use release_gate_core::VerificationError;
use release_gate_core::sanitize_error_summary;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Signing service client errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// No identity token source produced a token.
    #[error("no identity token available")]
    NoIdentityToken,
    /// Identity token could not be parsed.
    #[error("invalid identity token: {0}")]
    InvalidToken(String),
    /// Signing or verifying key could not be loaded.
    #[error("signing key error: {0}")]
    Key(String),
    /// Certificate authority rejected the request or answered badly.
    #[error("certificate authority error: {0}")]
    CertificateAuthority(String),
    /// Transparency log rejected the entry or answered badly.
    #[error("transparency log error: {0}")]
    TransparencyLog(String),
    /// A signing service could not be reached.
    #[error("signing service unavailable: {0}")]
    Unavailable(String),
    /// Bundle or request encoding failed.
    #[error("signature encoding failed: {0}")]
    Encoding(String),
    /// Produced or stored signature does not verify.
    #[error(transparent)]
    Verification(#[from] VerificationError),
    /// Registry read or write failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<SigningError> for PromotionError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::Registry(err) => err.into(),
            SigningError::Encoding(message) => Self::internal(message),
            other => Self::SignatureVerification(sanitize_error_summary(&other.to_string())),
        }
    }
}
