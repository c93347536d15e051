// crates/release-gate-core/src/core/signature.rs
// ============================================================================
// Module: Release Gate Signature Metadata
// Description: Signature metadata attached to artifacts as annotations.
// Purpose: Carry signing results between the signing client and the controller.
// Dependencies: crate::core::time, serde
// ============================================================================

//! ## Overview
//! [`SignatureMetadata`] is written once at sign time as `signature.*`
//! annotations and read back during promotion. The bundle is opaque to the
//! controller; only a [`crate::interfaces::SignatureVerifier`] interprets it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Annotation Keys
// ============================================================================

/// Signed attestation bundle.
pub const SIGNATURE_BUNDLE_KEY: &str = "signature.bundle";
/// Signing mode.
pub const SIGNATURE_MODE_KEY: &str = "signature.mode";
/// Certificate issuer (identity provider).
pub const SIGNATURE_ISSUER_KEY: &str = "signature.issuer";
/// Certificate subject identity.
pub const SIGNATURE_SUBJECT_KEY: &str = "signature.subject";
/// Signing time.
pub const SIGNATURE_SIGNED_AT_KEY: &str = "signature.signed-at";
/// Transparency log index.
pub const SIGNATURE_LOG_INDEX_KEY: &str = "signature.rekor-index";
/// Certificate fingerprint.
pub const SIGNATURE_CERT_FINGERPRINT_KEY: &str = "signature.cert-fingerprint";

// ============================================================================
// SECTION: Signature Mode
// ============================================================================

/// How an artifact was signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureMode {
    /// Short-lived identity-bound certificate recorded in a transparency log.
    Keyless,
    /// Long-lived private key.
    Key,
}

impl SignatureMode {
    /// Returns the annotation label for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keyless => "keyless",
            Self::Key => "key",
        }
    }

    /// Parses an annotation label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "keyless" => Some(Self::Keyless),
            "key" => Some(Self::Key),
            _ => None,
        }
    }
}

impl fmt::Display for SignatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Signature Metadata
// ============================================================================

/// Signature metadata attached to an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMetadata {
    /// Opaque signed attestation bundle (JSON).
    pub bundle: String,
    /// Signing mode.
    pub mode: SignatureMode,
    /// Identity issuer, when keyless.
    pub issuer: Option<String>,
    /// Subject identity, when keyless.
    pub subject: Option<String>,
    /// Signing time.
    pub signed_at: Timestamp,
    /// Transparency log index, when keyless.
    pub log_index: Option<u64>,
    /// Certificate (or public key) fingerprint.
    pub cert_fingerprint: Option<String>,
}

impl SignatureMetadata {
    /// Reads signature metadata from annotations.
    ///
    /// Returns `None` when no bundle is present or required keys are malformed.
    #[must_use]
    pub fn from_annotations(annotations: &BTreeMap<String, String>) -> Option<Self> {
        let bundle = annotations.get(SIGNATURE_BUNDLE_KEY)?.clone();
        let mode = SignatureMode::parse(annotations.get(SIGNATURE_MODE_KEY)?)?;
        let signed_at = Timestamp::parse_rfc3339(annotations.get(SIGNATURE_SIGNED_AT_KEY)?)?;
        Some(Self {
            bundle,
            mode,
            issuer: annotations.get(SIGNATURE_ISSUER_KEY).cloned(),
            subject: annotations.get(SIGNATURE_SUBJECT_KEY).cloned(),
            signed_at,
            log_index: annotations
                .get(SIGNATURE_LOG_INDEX_KEY)
                .and_then(|value| value.parse::<u64>().ok()),
            cert_fingerprint: annotations.get(SIGNATURE_CERT_FINGERPRINT_KEY).cloned(),
        })
    }

    /// Returns true when any signature key is present, even if malformed.
    #[must_use]
    pub fn is_present(annotations: &BTreeMap<String, String>) -> bool {
        annotations.keys().any(|key| key.starts_with("signature."))
    }

    /// Writes signature metadata into annotations.
    pub fn write_annotations(&self, annotations: &mut BTreeMap<String, String>) {
        annotations.insert(SIGNATURE_BUNDLE_KEY.to_string(), self.bundle.clone());
        annotations.insert(SIGNATURE_MODE_KEY.to_string(), self.mode.as_str().to_string());
        annotations.insert(SIGNATURE_SIGNED_AT_KEY.to_string(), self.signed_at.to_rfc3339());
        let optional = [
            (SIGNATURE_ISSUER_KEY, self.issuer.clone()),
            (SIGNATURE_SUBJECT_KEY, self.subject.clone()),
            (SIGNATURE_LOG_INDEX_KEY, self.log_index.map(|index| index.to_string())),
            (SIGNATURE_CERT_FINGERPRINT_KEY, self.cert_fingerprint.clone()),
        ];
        for (key, value) in optional {
            match value {
                Some(value) => annotations.insert(key.to_string(), value),
                None => annotations.remove(key),
            };
        }
    }
}
