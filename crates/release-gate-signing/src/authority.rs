// crates/release-gate-signing/src/authority.rs
// ============================================================================
// Module: Certificate Authority
// Description: Short-lived signing certificate issuance.
// Purpose: Bind an ephemeral signing key to an OIDC identity.
// Dependencies: ed25519-dalek, release-gate-core, serde
// ============================================================================

//! ## Overview
//! A [`CertificateRequest`] carries the identity token, the ephemeral public
//! key, and a proof of possession: a signature by that key over the token
//! subject. [`HttpCertificateAuthority`] forwards the request to a remote
//! authority; [`LocalCertificateAuthority`] issues certificates in process
//! from a configured authority key for air-gapped setups and tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use release_gate_core::Clock;
use release_gate_core::SystemClock;
use release_gate_core::Timestamp;
use serde::Serialize;

use crate::bundle::CertificateBody;
use crate::bundle::SigningCertificate;
use crate::bundle::canonical_bytes;
use crate::bundle::decode_public_key;
use crate::bundle::decode_signature;
use crate::bundle::encode_signature;
use crate::bundle::key_fingerprint;
use crate::error::SigningError;
use crate::http::ServiceClient;
use crate::http::ServiceEndpoint;
use crate::http::ServiceKind;
use crate::identity::IdentityToken;

// ============================================================================
// SECTION: Interface
// ============================================================================

/// Default certificate lifetime.
pub const DEFAULT_CERTIFICATE_VALIDITY: Duration = Duration::from_secs(600);

/// Request for a signing certificate.
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    /// Identity token authenticating the requester.
    pub identity_token: IdentityToken,
    /// Base64 ephemeral public key to certify.
    pub public_key: String,
    /// Base64 signature by the ephemeral key over the token subject.
    pub proof_of_possession: String,
}

impl fmt::Debug for CertificateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateRequest")
            .field("identity_token", &self.identity_token)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Issues short-lived signing certificates.
pub trait CertificateAuthority: Send + Sync {
    /// Issues a certificate for the requested key and identity.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError`] when the request is rejected or the authority
    /// cannot be reached.
    fn issue(&self, request: &CertificateRequest) -> Result<SigningCertificate, SigningError>;
}

// ============================================================================
// SECTION: Local Authority
// ============================================================================

/// In-process certificate authority holding its own signing key.
///
/// The identity token is trusted as presented; restrict accepted issuers with
/// [`LocalCertificateAuthority::with_trusted_issuer`].
pub struct LocalCertificateAuthority {
    /// Authority signing key.
    key: SigningKey,
    /// Certificate lifetime.
    validity: Duration,
    /// Time source for validity windows.
    clock: Box<dyn Clock>,
    /// Accepted token issuers; empty accepts any.
    trusted_issuers: BTreeSet<String>,
    /// Serial counter.
    next_serial: AtomicU64,
}

impl LocalCertificateAuthority {
    /// Creates an authority signing with `key`.
    #[must_use]
    pub fn new(key: SigningKey) -> Self {
        Self {
            key,
            validity: DEFAULT_CERTIFICATE_VALIDITY,
            clock: Box::new(SystemClock),
            trusted_issuers: BTreeSet::new(),
            next_serial: AtomicU64::new(1),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Overrides the certificate lifetime.
    #[must_use]
    pub const fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Accepts tokens from `issuer`. Once any issuer is added, others are rejected.
    #[must_use]
    pub fn with_trusted_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.trusted_issuers.insert(issuer.into());
        self
    }

    /// Returns the key that verifies issued certificates.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl fmt::Debug for LocalCertificateAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCertificateAuthority")
            .field("key_id", &key_fingerprint(&self.key.verifying_key()))
            .field("validity", &self.validity)
            .field("trusted_issuers", &self.trusted_issuers)
            .finish_non_exhaustive()
    }
}

impl CertificateAuthority for LocalCertificateAuthority {
    fn issue(&self, request: &CertificateRequest) -> Result<SigningCertificate, SigningError> {
        let token = &request.identity_token;
        if !self.trusted_issuers.is_empty() && !self.trusted_issuers.contains(token.issuer()) {
            return Err(SigningError::CertificateAuthority(format!(
                "identity issuer {} is not trusted",
                token.issuer()
            )));
        }
        let public_key = decode_public_key(&request.public_key)
            .map_err(|err| SigningError::CertificateAuthority(err.to_string()))?;
        let proof = decode_signature(&request.proof_of_possession)
            .map_err(|err| SigningError::CertificateAuthority(err.to_string()))?;
        public_key.verify_strict(token.subject().as_bytes(), &proof).map_err(|_| {
            SigningError::CertificateAuthority("proof of possession does not verify".to_string())
        })?;

        let not_before = self.clock.now();
        let validity_ms = i64::try_from(self.validity.as_millis()).unwrap_or(i64::MAX);
        let not_after =
            Timestamp::from_unix_millis(not_before.as_unix_millis().saturating_add(validity_ms));
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        let body = CertificateBody {
            serial: format!("{serial:016x}"),
            subject: token.subject().to_string(),
            issuer: token.issuer().to_string(),
            public_key: request.public_key.clone(),
            not_before,
            not_after,
        };
        let signature = self.key.sign(&canonical_bytes(&body)?);
        Ok(SigningCertificate {
            body,
            authority_key_id: key_fingerprint(&self.key.verifying_key()),
            signature: encode_signature(&signature),
        })
    }
}

// ============================================================================
// SECTION: HTTP Authority
// ============================================================================

/// Path of the certificate issuance endpoint.
const CERTIFICATES_PATH: &str = "api/v1/certificates";

/// Certificate request body sent to a remote authority.
#[derive(Debug, Serialize)]
struct CertificateRequestBody<'a> {
    /// Base64 ephemeral public key.
    public_key: &'a str,
    /// Base64 proof of possession.
    proof_of_possession: &'a str,
}

/// Remote certificate authority reached over HTTP.
///
/// `POST {base}/api/v1/certificates` with the identity token as bearer
/// credential; the response body is a [`SigningCertificate`].
#[derive(Debug, Clone)]
pub struct HttpCertificateAuthority {
    /// Service client.
    client: ServiceClient,
}

impl HttpCertificateAuthority {
    /// Creates a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::CertificateAuthority`] for an unusable URL.
    pub fn new(endpoint: &ServiceEndpoint) -> Result<Self, SigningError> {
        Ok(Self {
            client: ServiceClient::new(ServiceKind::CertificateAuthority, endpoint)?,
        })
    }
}

impl CertificateAuthority for HttpCertificateAuthority {
    fn issue(&self, request: &CertificateRequest) -> Result<SigningCertificate, SigningError> {
        let body = CertificateRequestBody {
            public_key: &request.public_key,
            proof_of_possession: &request.proof_of_possession,
        };
        self.client.post_json(CERTIFICATES_PATH, Some(request.identity_token.raw()), &body)
    }
}
