// crates/release-gate-signing/src/verify.rs
// ============================================================================
// Module: Bundle Verification
// Description: Offline verification of signature bundles against trust roots.
// Purpose: Implement the controller's signature verifier.
// Dependencies: ed25519-dalek, release-gate-core
// ============================================================================

//! ## Overview
//! Verification is offline and fail-closed. Every bundle must match the
//! content digest and carry a valid ed25519 signature over it. Key bundles
//! additionally need a trusted public key. Keyless bundles need a certificate
//! signed by a trusted authority and a log entry whose checkpoint is signed by
//! a trusted log and whose inclusion proof places the signature leaf under the
//! checkpoint root. The leaf commits to the integration time, and the
//! certificate must be valid at that time rather than at the annotated one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use ed25519_dalek::Signature;
use ed25519_dalek::VerifyingKey;
use release_gate_core::Digest;
use release_gate_core::SignatureMetadata;
use release_gate_core::SignatureMode;
use release_gate_core::SignatureVerifier;
use release_gate_core::VerificationError;
use release_gate_core::VerifiedSignature;

use crate::bundle::BundleVerification;
use crate::bundle::LogEntry;
use crate::bundle::LogLeaf;
use crate::bundle::SignatureBundle;
use crate::bundle::SigningCertificate;
use crate::bundle::canonical_bytes;
use crate::bundle::decode_public_key;
use crate::bundle::decode_signature;
use crate::bundle::key_fingerprint;
use crate::bundle::signed_message;
use crate::merkle::decode_hash;
use crate::merkle::leaf_hash;
use crate::merkle::verify_inclusion;

// ============================================================================
// SECTION: Trust Root
// ============================================================================

/// Keys trusted during verification, indexed by fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustRoot {
    /// Certificate authority keys.
    certificate_authorities: BTreeMap<String, VerifyingKey>,
    /// Transparency log keys.
    transparency_logs: BTreeMap<String, VerifyingKey>,
    /// Long-lived signing keys.
    signing_keys: BTreeMap<String, VerifyingKey>,
}

impl TrustRoot {
    /// Creates an empty trust root that trusts nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trusts certificates signed by `key`.
    #[must_use]
    pub fn with_certificate_authority(mut self, key: VerifyingKey) -> Self {
        self.certificate_authorities.insert(key_fingerprint(&key), key);
        self
    }

    /// Trusts checkpoints signed by `key`.
    #[must_use]
    pub fn with_transparency_log(mut self, key: VerifyingKey) -> Self {
        self.transparency_logs.insert(key_fingerprint(&key), key);
        self
    }

    /// Trusts key-mode signatures made by `key`.
    #[must_use]
    pub fn with_signing_key(mut self, key: VerifyingKey) -> Self {
        self.signing_keys.insert(key_fingerprint(&key), key);
        self
    }

    /// Returns true when keyless bundles can be verified.
    #[must_use]
    pub fn supports_keyless(&self) -> bool {
        !self.certificate_authorities.is_empty() && !self.transparency_logs.is_empty()
    }

    /// Returns true when key-mode bundles can be verified.
    #[must_use]
    pub fn supports_key(&self) -> bool {
        !self.signing_keys.is_empty()
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Verifies signature bundles produced by [`crate::SigningClient`].
#[derive(Debug, Clone, Default)]
pub struct BundleVerifier {
    /// Trusted keys.
    trust: TrustRoot,
    /// Accepted certificate subjects; empty accepts any.
    allowed_subjects: BTreeSet<String>,
    /// Accepted certificate issuers; empty accepts any.
    allowed_issuers: BTreeSet<String>,
}

impl BundleVerifier {
    /// Creates a verifier for `trust`.
    #[must_use]
    pub fn new(trust: TrustRoot) -> Self {
        Self {
            trust,
            allowed_subjects: BTreeSet::new(),
            allowed_issuers: BTreeSet::new(),
        }
    }

    /// Restricts keyless signatures to the given certificate subject.
    #[must_use]
    pub fn with_allowed_subject(mut self, subject: impl Into<String>) -> Self {
        self.allowed_subjects.insert(subject.into());
        self
    }

    /// Restricts keyless signatures to the given identity issuer.
    #[must_use]
    pub fn with_allowed_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.allowed_issuers.insert(issuer.into());
        self
    }

    /// Verifies a key-mode bundle.
    fn verify_key(
        &self,
        public_key: &str,
        digest: &Digest,
        signature: &Signature,
    ) -> Result<VerifiedSignature, VerificationError> {
        let key = decode_public_key(public_key)?;
        let fingerprint = key_fingerprint(&key);
        if !self.trust.signing_keys.contains_key(&fingerprint) {
            return Err(VerificationError::Untrusted(format!(
                "signing key {fingerprint} is not trusted"
            )));
        }
        key.verify_strict(signed_message(digest), signature).map_err(|_| {
            VerificationError::InvalidSignature("signature does not match content".to_string())
        })?;
        Ok(VerifiedSignature {
            mode: SignatureMode::Key,
            subject: None,
            issuer: None,
            log_index: None,
            fingerprint,
        })
    }

    /// Verifies a keyless bundle.
    fn verify_keyless(
        &self,
        metadata: &SignatureMetadata,
        bundle: &SignatureBundle,
        signature: &Signature,
        certificate: &SigningCertificate,
        log_entry: &LogEntry,
    ) -> Result<VerifiedSignature, VerificationError> {
        self.verify_certificate(metadata, certificate)?;
        let signer = decode_public_key(&certificate.body.public_key)?;
        signer.verify_strict(signed_message(&bundle.content_digest), signature).map_err(|_| {
            VerificationError::InvalidSignature("signature does not match content".to_string())
        })?;
        let fingerprint = certificate
            .fingerprint()
            .map_err(|err| VerificationError::Malformed(err.to_string()))?;
        if metadata.cert_fingerprint.as_ref().is_some_and(|annotated| *annotated != fingerprint) {
            return Err(VerificationError::Untrusted(
                "annotated certificate fingerprint does not match the bundle".to_string(),
            ));
        }
        let leaf = LogLeaf {
            content_digest: bundle.content_digest.clone(),
            signature: bundle.signature.clone(),
            certificate_fingerprint: fingerprint.clone(),
            integrated_time: log_entry.integrated_time,
        };
        self.verify_log_entry(metadata, &leaf, log_entry)?;
        verify_signing_time(metadata, certificate, log_entry)?;
        Ok(VerifiedSignature {
            mode: SignatureMode::Keyless,
            subject: Some(certificate.body.subject.clone()),
            issuer: Some(certificate.body.issuer.clone()),
            log_index: Some(log_entry.log_index),
            fingerprint,
        })
    }

    /// Checks the certificate chain and identity.
    fn verify_certificate(
        &self,
        metadata: &SignatureMetadata,
        certificate: &SigningCertificate,
    ) -> Result<(), VerificationError> {
        let authority = self
            .trust
            .certificate_authorities
            .get(&certificate.authority_key_id)
            .ok_or_else(|| {
                VerificationError::Untrusted(format!(
                    "certificate authority {} is not trusted",
                    certificate.authority_key_id
                ))
            })?;
        let body = canonical_bytes(&certificate.body)
            .map_err(|err| VerificationError::Malformed(err.to_string()))?;
        let certificate_signature = decode_signature(&certificate.signature)?;
        authority.verify_strict(&body, &certificate_signature).map_err(|_| {
            VerificationError::InvalidSignature("certificate signature does not verify".to_string())
        })?;
        let body = &certificate.body;
        if metadata.subject.as_ref().is_some_and(|subject| *subject != body.subject)
            || metadata.issuer.as_ref().is_some_and(|issuer| *issuer != body.issuer)
        {
            return Err(VerificationError::Untrusted(
                "annotated identity does not match the certificate".to_string(),
            ));
        }
        if !self.allowed_subjects.is_empty() && !self.allowed_subjects.contains(&body.subject) {
            return Err(VerificationError::Untrusted(format!(
                "signer {} is not an allowed identity",
                body.subject
            )));
        }
        if !self.allowed_issuers.is_empty() && !self.allowed_issuers.contains(&body.issuer) {
            return Err(VerificationError::Untrusted(format!(
                "identity issuer {} is not allowed",
                body.issuer
            )));
        }
        Ok(())
    }

    /// Checks the checkpoint signature and the inclusion proof.
    fn verify_log_entry(
        &self,
        metadata: &SignatureMetadata,
        leaf: &LogLeaf,
        entry: &LogEntry,
    ) -> Result<(), VerificationError> {
        let log_key = self.trust.transparency_logs.get(&entry.log_id).ok_or_else(|| {
            VerificationError::Untrusted(format!("transparency log {} is not trusted", entry.log_id))
        })?;
        let checkpoint = &entry.checkpoint;
        let checkpoint_signature = decode_signature(&checkpoint.signature)?;
        log_key.verify_strict(checkpoint.note_body().as_bytes(), &checkpoint_signature).map_err(
            |_| VerificationError::InvalidProof("checkpoint signature does not verify".to_string()),
        )?;

        let proof = &entry.inclusion_proof;
        if proof.tree_size != checkpoint.tree_size {
            return Err(VerificationError::InvalidProof(
                "proof tree size does not match the checkpoint".to_string(),
            ));
        }
        if proof.log_index != entry.log_index
            || metadata.log_index.is_some_and(|index| index != entry.log_index)
        {
            return Err(VerificationError::InvalidProof(
                "log index does not match the proof".to_string(),
            ));
        }
        let root = decode_hash(&checkpoint.root_hash).ok_or_else(|| {
            VerificationError::InvalidProof("checkpoint root hash is malformed".to_string())
        })?;
        let leaf_bytes =
            leaf.to_bytes().map_err(|err| VerificationError::Malformed(err.to_string()))?;
        verify_inclusion(&leaf_hash(&leaf_bytes), proof, &root)
            .map_err(|err| VerificationError::InvalidProof(err.to_string()))
    }
}

/// Checks the certificate window against the logged integration time.
///
/// The annotated `signed_at` is unauthenticated, so it must agree with the
/// time committed in the verified log leaf.
fn verify_signing_time(
    metadata: &SignatureMetadata,
    certificate: &SigningCertificate,
    log_entry: &LogEntry,
) -> Result<(), VerificationError> {
    let integrated_time = log_entry.integrated_time;
    if metadata.signed_at != integrated_time {
        return Err(VerificationError::Untrusted(format!(
            "annotated signing time {} does not match log integration time {integrated_time}",
            metadata.signed_at
        )));
    }
    if !certificate.is_valid_at(integrated_time) {
        return Err(VerificationError::Untrusted(format!(
            "certificate is not valid at log integration time {integrated_time}"
        )));
    }
    Ok(())
}

impl SignatureVerifier for BundleVerifier {
    fn verify(
        &self,
        metadata: &SignatureMetadata,
        content: &[u8],
    ) -> Result<VerifiedSignature, VerificationError> {
        let bundle = SignatureBundle::from_json(&metadata.bundle)?;
        let digest = Digest::of_bytes(content);
        if bundle.content_digest != digest {
            return Err(VerificationError::DigestMismatch);
        }
        if bundle.mode() != metadata.mode {
            return Err(VerificationError::Malformed(format!(
                "bundle mode {} does not match annotated mode {}",
                bundle.mode(),
                metadata.mode
            )));
        }
        let signature = decode_signature(&bundle.signature)?;
        match &bundle.verification {
            BundleVerification::PublicKey {
                public_key,
            } => self.verify_key(public_key, &digest, &signature),
            BundleVerification::Certificate {
                certificate,
                log_entry,
            } => self.verify_keyless(metadata, &bundle, &signature, certificate, log_entry),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
