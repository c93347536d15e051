// crates/release-gate-signing/src/bundle.rs
// ============================================================================
// Module: Signature Bundle
// Description: Wire model for signature bundles, certificates, and log entries.
// Purpose: Define the self-contained attestation stored in `signature.bundle`.
// Dependencies: base64, ed25519-dalek, release-gate-core, serde, serde_jcs
// ============================================================================

//! ## Overview
//! A [`SignatureBundle`] binds a content digest to an ed25519 signature over
//! the digest string. Key bundles carry the public key; keyless bundles carry
//! the short-lived [`SigningCertificate`] and the transparency [`LogEntry`]
//! proving the signature was logged. Signed structures are serialized with
//! JCS (RFC 8785) so every party hashes and signs identical bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64;
use ed25519_dalek::Signature;
use ed25519_dalek::VerifyingKey;
use release_gate_core::Digest;
use release_gate_core::SignatureMode;
use release_gate_core::Timestamp;
use release_gate_core::VerificationError;
use serde::Deserialize;
use serde::Serialize;

use crate::error::SigningError;
use crate::merkle::InclusionProof;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type recorded in every bundle.
pub const BUNDLE_MEDIA_TYPE: &str = "application/vnd.release-gate.signature-bundle.v1+json";

// ============================================================================
// SECTION: Certificates
// ============================================================================

/// Signed portion of a short-lived signing certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateBody {
    /// Serial number assigned by the authority.
    pub serial: String,
    /// Identity the certificate is bound to (email or subject claim).
    pub subject: String,
    /// Identity provider that vouched for the subject.
    pub issuer: String,
    /// Base64 ed25519 public key of the signer.
    pub public_key: String,
    /// Start of validity.
    pub not_before: Timestamp,
    /// End of validity.
    pub not_after: Timestamp,
}

/// Certificate issued by a certificate authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningCertificate {
    /// Certified fields.
    pub body: CertificateBody,
    /// Fingerprint of the issuing authority key.
    pub authority_key_id: String,
    /// Base64 authority signature over the JCS encoding of `body`.
    pub signature: String,
}

impl SigningCertificate {
    /// Returns the certificate fingerprint (`sha256:` of its JCS encoding).
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Encoding`] when canonicalization fails.
    pub fn fingerprint(&self) -> Result<String, SigningError> {
        Ok(Digest::of_bytes(&canonical_bytes(self)?).to_string())
    }

    /// Returns true when `at` falls inside the validity window.
    #[must_use]
    pub fn is_valid_at(&self, at: Timestamp) -> bool {
        self.body.not_before <= at && at <= self.body.not_after
    }
}

// ============================================================================
// SECTION: Transparency Log
// ============================================================================

/// Log checkpoint signed by the transparency log key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCheckpoint {
    /// Log origin line.
    pub origin: String,
    /// Tree size at the checkpoint.
    pub tree_size: u64,
    /// Root hash (hex).
    pub root_hash: String,
    /// Base64 log signature over [`SignedCheckpoint::note_body`].
    pub signature: String,
}

impl SignedCheckpoint {
    /// Returns the signed note text: origin, size, and root, one per line.
    #[must_use]
    pub fn note_body(&self) -> String {
        format!("{}\n{}\n{}\n", self.origin, self.tree_size, self.root_hash)
    }
}

/// Entry returned by the transparency log after integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Leaf index.
    pub log_index: u64,
    /// Fingerprint of the log key.
    pub log_id: String,
    /// Time the entry was integrated.
    pub integrated_time: Timestamp,
    /// Proof that the leaf is included under `checkpoint`.
    pub inclusion_proof: InclusionProof,
    /// Checkpoint the proof verifies against.
    pub checkpoint: SignedCheckpoint,
}

/// Leaf content committed to the transparency log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLeaf {
    /// Signed content digest.
    pub content_digest: Digest,
    /// Base64 content signature.
    pub signature: String,
    /// Fingerprint of the signing certificate.
    pub certificate_fingerprint: String,
    /// Time the log integrated the entry.
    pub integrated_time: Timestamp,
}

impl LogLeaf {
    /// Returns the canonical leaf bytes hashed into the tree.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Encoding`] when canonicalization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SigningError> {
        canonical_bytes(self)
    }
}

// ============================================================================
// SECTION: Bundle
// ============================================================================

/// Material needed to verify the bundle signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BundleVerification {
    /// Long-lived key signature.
    PublicKey {
        /// Base64 ed25519 public key.
        public_key: String,
    },
    /// Keyless signature with certificate and log entry.
    Certificate {
        /// Short-lived signing certificate.
        certificate: SigningCertificate,
        /// Transparency log entry.
        log_entry: LogEntry,
    },
}

/// Self-contained signed attestation over artifact content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBundle {
    /// Bundle format identifier.
    pub media_type: String,
    /// Digest of the signed content.
    pub content_digest: Digest,
    /// Base64 ed25519 signature over the digest string.
    pub signature: String,
    /// Verification material.
    pub verification: BundleVerification,
}

impl SignatureBundle {
    /// Returns the signing mode implied by the verification material.
    #[must_use]
    pub const fn mode(&self) -> SignatureMode {
        match self.verification {
            BundleVerification::PublicKey {
                ..
            } => SignatureMode::Key,
            BundleVerification::Certificate {
                ..
            } => SignatureMode::Keyless,
        }
    }

    /// Encodes the bundle as canonical JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Encoding`] when canonicalization fails.
    pub fn to_json(&self) -> Result<String, SigningError> {
        String::from_utf8(canonical_bytes(self)?)
            .map_err(|_| SigningError::Encoding("bundle is not utf-8".to_string()))
    }

    /// Parses a bundle from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Malformed`] for invalid JSON or an
    /// unknown media type.
    pub fn from_json(text: &str) -> Result<Self, VerificationError> {
        let bundle: Self = serde_json::from_str(text)
            .map_err(|err| VerificationError::Malformed(err.to_string()))?;
        if bundle.media_type != BUNDLE_MEDIA_TYPE {
            return Err(VerificationError::Malformed(format!(
                "unsupported bundle media type {}",
                bundle.media_type
            )));
        }
        Ok(bundle)
    }
}

// ============================================================================
// SECTION: Encoding Helpers
// ============================================================================

/// Serializes a value with JCS canonicalization.
///
/// # Errors
///
/// Returns [`SigningError::Encoding`] when serialization fails.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SigningError> {
    serde_jcs::to_vec(value).map_err(|err| SigningError::Encoding(err.to_string()))
}

/// Returns the message signed for a content digest.
#[must_use]
pub fn signed_message(digest: &Digest) -> &[u8] {
    digest.as_str().as_bytes()
}

/// Returns the `sha256:` fingerprint of a public key.
#[must_use]
pub fn key_fingerprint(key: &VerifyingKey) -> String {
    Digest::of_bytes(key.as_bytes()).to_string()
}

/// Encodes a public key as base64.
#[must_use]
pub fn encode_public_key(key: &VerifyingKey) -> String {
    Base64.encode(key.as_bytes())
}

/// Encodes a signature as base64.
#[must_use]
pub fn encode_signature(signature: &Signature) -> String {
    Base64.encode(signature.to_bytes())
}

/// Decodes a base64 ed25519 public key.
///
/// # Errors
///
/// Returns [`VerificationError::Malformed`] for bad base64 or key bytes.
pub fn decode_public_key(value: &str) -> Result<VerifyingKey, VerificationError> {
    let bytes = Base64
        .decode(value.trim())
        .map_err(|_| VerificationError::Malformed("invalid base64 public key".to_string()))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| VerificationError::Malformed("public key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| VerificationError::Malformed("invalid ed25519 public key".to_string()))
}

/// Decodes a base64 ed25519 signature.
///
/// # Errors
///
/// Returns [`VerificationError::Malformed`] for bad base64 or signature bytes.
pub fn decode_signature(value: &str) -> Result<Signature, VerificationError> {
    let bytes = Base64
        .decode(value.trim())
        .map_err(|_| VerificationError::Malformed("invalid base64 signature".to_string()))?;
    Signature::from_slice(&bytes)
        .map_err(|_| VerificationError::Malformed("signature must be 64 bytes".to_string()))
}
