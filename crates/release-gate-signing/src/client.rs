// crates/release-gate-signing/src/client.rs
// ============================================================================
// Module: Signing Client
// Description: Keyless and key-based artifact signing.
// Purpose: Produce signature metadata and attach it to registry tags.
// Dependencies: ed25519-dalek, release-gate-core
// ============================================================================

//! ## Overview
//! Keyless signing obtains an identity token, generates an ephemeral key,
//! has the certificate authority certify it for the token identity, signs the
//! content digest, and records the signature in the transparency log. The
//! ephemeral key is dropped once the bundle exists. Key-based signing uses a
//! long-lived key and produces a bundle carrying only the public key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use release_gate_core::Clock;
use release_gate_core::Digest;
use release_gate_core::RegistryTransport;
use release_gate_core::SignatureMetadata;
use release_gate_core::SignatureMode;
use release_gate_core::SystemClock;
use release_gate_core::TagName;

use crate::authority::CertificateAuthority;
use crate::authority::CertificateRequest;
use crate::bundle::BUNDLE_MEDIA_TYPE;
use crate::bundle::BundleVerification;
use crate::bundle::SignatureBundle;
use crate::bundle::encode_public_key;
use crate::bundle::encode_signature;
use crate::bundle::key_fingerprint;
use crate::bundle::signed_message;
use crate::error::SigningError;
use crate::identity::IdentityTokenSource;
use crate::keys::generate_signing_key;
use crate::keys::load_signing_key;
use crate::tlog::LogEntryRequest;
use crate::tlog::TransparencyLog;

// ============================================================================
// SECTION: Signing Client
// ============================================================================

/// How the client signs.
enum SigningMethod {
    /// Identity-bound ephemeral key.
    Keyless {
        /// Identity token sources.
        tokens: Box<dyn IdentityTokenSource>,
        /// Certificate authority.
        authority: Box<dyn CertificateAuthority>,
        /// Transparency log.
        log: Box<dyn TransparencyLog>,
    },
    /// Long-lived signing key.
    Key(SigningKey),
}

/// Signs artifact content.
pub struct SigningClient {
    /// Signing method.
    method: SigningMethod,
    /// Time source for key-mode `signed_at`; keyless uses the log time.
    clock: Box<dyn Clock>,
}

impl SigningClient {
    /// Creates a keyless signing client.
    #[must_use]
    pub fn keyless(
        tokens: impl IdentityTokenSource + 'static,
        authority: impl CertificateAuthority + 'static,
        log: impl TransparencyLog + 'static,
    ) -> Self {
        Self::from_method(SigningMethod::Keyless {
            tokens: Box::new(tokens),
            authority: Box::new(authority),
            log: Box::new(log),
        })
    }

    /// Creates a key-based signing client.
    #[must_use]
    pub fn with_key(key: SigningKey) -> Self {
        Self::from_method(SigningMethod::Key(key))
    }

    /// Creates a key-based signing client from a key file.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Key`] when the key cannot be loaded.
    pub fn from_key_file(path: &Path) -> Result<Self, SigningError> {
        Ok(Self::with_key(load_signing_key(path)?))
    }

    /// Builds a client around a signing method.
    fn from_method(method: SigningMethod) -> Self {
        Self {
            method,
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Returns the signing mode.
    #[must_use]
    pub const fn mode(&self) -> SignatureMode {
        match self.method {
            SigningMethod::Keyless {
                ..
            } => SignatureMode::Keyless,
            SigningMethod::Key(_) => SignatureMode::Key,
        }
    }

    /// Signs `content` and returns the metadata to attach to the artifact.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError`] when a token, certificate, or log entry
    /// cannot be obtained.
    pub fn sign(&self, content: &[u8]) -> Result<SignatureMetadata, SigningError> {
        let digest = Digest::of_bytes(content);
        match &self.method {
            SigningMethod::Keyless {
                tokens,
                authority,
                log,
            } => self.sign_keyless(digest, tokens.as_ref(), authority.as_ref(), log.as_ref()),
            SigningMethod::Key(key) => self.sign_with_key(digest, key),
        }
    }

    /// Keyless flow.
    fn sign_keyless(
        &self,
        digest: Digest,
        tokens: &dyn IdentityTokenSource,
        authority: &dyn CertificateAuthority,
        log: &dyn TransparencyLog,
    ) -> Result<SignatureMetadata, SigningError> {
        let identity_token = tokens.require()?;
        let key = generate_signing_key();
        let public_key = encode_public_key(&key.verifying_key());
        let proof_of_possession = encode_signature(&key.sign(identity_token.subject().as_bytes()));
        let certificate = authority.issue(&CertificateRequest {
            identity_token,
            public_key: public_key.clone(),
            proof_of_possession,
        })?;
        if certificate.body.public_key != public_key {
            return Err(SigningError::CertificateAuthority(
                "issued certificate does not certify the signing key".to_string(),
            ));
        }

        let signature = encode_signature(&key.sign(signed_message(&digest)));
        let log_entry = log.submit(&LogEntryRequest {
            content_digest: digest.clone(),
            signature: signature.clone(),
            certificate: certificate.clone(),
        })?;
        let fingerprint = certificate.fingerprint()?;
        let log_index = log_entry.log_index;
        let signed_at = log_entry.integrated_time;
        let issuer = certificate.body.issuer.clone();
        let subject = certificate.body.subject.clone();
        let bundle = SignatureBundle {
            media_type: BUNDLE_MEDIA_TYPE.to_string(),
            content_digest: digest,
            signature,
            verification: BundleVerification::Certificate {
                certificate,
                log_entry,
            },
        };
        Ok(SignatureMetadata {
            bundle: bundle.to_json()?,
            mode: SignatureMode::Keyless,
            issuer: Some(issuer),
            subject: Some(subject),
            signed_at,
            log_index: Some(log_index),
            cert_fingerprint: Some(fingerprint),
        })
    }

    /// Key-based flow.
    fn sign_with_key(
        &self,
        digest: Digest,
        key: &SigningKey,
    ) -> Result<SignatureMetadata, SigningError> {
        let verifying_key = key.verifying_key();
        let signature = encode_signature(&key.sign(signed_message(&digest)));
        let bundle = SignatureBundle {
            media_type: BUNDLE_MEDIA_TYPE.to_string(),
            content_digest: digest,
            signature,
            verification: BundleVerification::PublicKey {
                public_key: encode_public_key(&verifying_key),
            },
        };
        Ok(SignatureMetadata {
            bundle: bundle.to_json()?,
            mode: SignatureMode::Key,
            issuer: None,
            subject: None,
            signed_at: self.clock.now(),
            log_index: None,
            cert_fingerprint: Some(key_fingerprint(&verifying_key)),
        })
    }

    /// Pulls `tag`, signs its content, and attaches the signature.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError`] when the registry or a signing service fails.
    pub fn sign_tag(
        &self,
        registry: &dyn RegistryTransport,
        tag: &TagName,
    ) -> Result<SignatureMetadata, SigningError> {
        let artifact = registry.pull(tag)?;
        let metadata = self.sign(&artifact.bytes)?;
        attach(registry, tag, &metadata)?;
        Ok(metadata)
    }
}

impl fmt::Debug for SigningClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningClient").field("mode", &self.mode()).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Annotations
// ============================================================================

/// Writes `metadata` into the annotations of `tag`, keeping unrelated keys.
///
/// # Errors
///
/// Returns [`SigningError::Registry`] when annotations cannot be read or written.
pub fn attach(
    registry: &dyn RegistryTransport,
    tag: &TagName,
    metadata: &SignatureMetadata,
) -> Result<(), SigningError> {
    let mut annotations: BTreeMap<String, String> = registry.read_annotations(tag)?;
    metadata.write_annotations(&mut annotations);
    registry.write_annotations(tag, &annotations)?;
    Ok(())
}

/// Reads the signature metadata attached to `tag`, if any.
///
/// # Errors
///
/// Returns [`SigningError::Registry`] when annotations cannot be read.
pub fn fetch(
    registry: &dyn RegistryTransport,
    tag: &TagName,
) -> Result<Option<SignatureMetadata>, SigningError> {
    Ok(SignatureMetadata::from_annotations(&registry.read_annotations(tag)?))
}
