// crates/release-gate-signing/src/tlog.rs
// ============================================================================
// Module: Transparency Log
// Description: Transparency log submission with inclusion proofs.
// Purpose: Publicly record keyless signatures before they are trusted.
// Dependencies: ed25519-dalek, release-gate-core, serde
// ============================================================================

//! ## Overview
//! Each submission becomes one leaf: the JCS encoding of a [`LogLeaf`],
//! which includes the integration time so the proof also authenticates it. The
//! log answers with the leaf index, an RFC 6962 inclusion proof, and a
//! checkpoint signed by the log key over its origin, size, and root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Mutex;

use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use release_gate_core::Clock;
use release_gate_core::Digest;
use release_gate_core::SystemClock;
use release_gate_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

use crate::bundle::LogEntry;
use crate::bundle::LogLeaf;
use crate::bundle::SignedCheckpoint;
use crate::bundle::SigningCertificate;
use crate::bundle::encode_signature;
use crate::bundle::key_fingerprint;
use crate::error::SigningError;
use crate::http::ServiceClient;
use crate::http::ServiceEndpoint;
use crate::http::ServiceKind;
use crate::merkle::MerkleTree;
use crate::merkle::encode_hash;

// ============================================================================
// SECTION: Interface
// ============================================================================

/// Entry submitted to the transparency log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntryRequest {
    /// Signed content digest.
    pub content_digest: Digest,
    /// Base64 content signature.
    pub signature: String,
    /// Certificate of the signing key.
    pub certificate: SigningCertificate,
}

impl LogEntryRequest {
    /// Returns the leaf this request commits to when integrated at `integrated_time`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Encoding`] when the certificate cannot be fingerprinted.
    pub fn leaf(&self, integrated_time: Timestamp) -> Result<LogLeaf, SigningError> {
        Ok(LogLeaf {
            content_digest: self.content_digest.clone(),
            signature: self.signature.clone(),
            certificate_fingerprint: self.certificate.fingerprint()?,
            integrated_time,
        })
    }
}

/// Append-only transparency log.
pub trait TransparencyLog: Send + Sync {
    /// Records an entry and returns its integration proof.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError`] when the log rejects the entry or cannot be reached.
    fn submit(&self, request: &LogEntryRequest) -> Result<LogEntry, SigningError>;
}

// ============================================================================
// SECTION: In-Memory Log
// ============================================================================

/// In-process transparency log backed by a [`MerkleTree`].
pub struct InMemoryTransparencyLog {
    /// Checkpoint signing key.
    key: SigningKey,
    /// Checkpoint origin line.
    origin: String,
    /// Integration time source.
    clock: Box<dyn Clock>,
    /// Leaves integrated so far.
    tree: Mutex<MerkleTree>,
}

impl InMemoryTransparencyLog {
    /// Creates an empty log signing checkpoints with `key`.
    #[must_use]
    pub fn new(key: SigningKey, origin: impl Into<String>) -> Self {
        Self {
            key,
            origin: origin.into(),
            clock: Box::new(SystemClock),
            tree: Mutex::new(MerkleTree::new()),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Returns the key that verifies checkpoints.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Returns the number of integrated entries.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.tree.lock().map_or(0, |tree| tree.size())
    }
}

impl fmt::Debug for InMemoryTransparencyLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTransparencyLog")
            .field("origin", &self.origin)
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

impl TransparencyLog for InMemoryTransparencyLog {
    fn submit(&self, request: &LogEntryRequest) -> Result<LogEntry, SigningError> {
        let integrated_time = self.clock.now();
        let leaf = request.leaf(integrated_time)?.to_bytes()?;
        let mut tree = self
            .tree
            .lock()
            .map_err(|_| SigningError::TransparencyLog("log mutex poisoned".to_string()))?;
        let log_index = tree.append(&leaf);
        let inclusion_proof = tree.inclusion_proof(log_index).ok_or_else(|| {
            SigningError::TransparencyLog("inclusion proof unavailable".to_string())
        })?;
        let mut checkpoint = SignedCheckpoint {
            origin: self.origin.clone(),
            tree_size: tree.size(),
            root_hash: encode_hash(&tree.root()),
            signature: String::new(),
        };
        checkpoint.signature = encode_signature(&self.key.sign(checkpoint.note_body().as_bytes()));
        Ok(LogEntry {
            log_index,
            log_id: key_fingerprint(&self.key.verifying_key()),
            integrated_time,
            inclusion_proof,
            checkpoint,
        })
    }
}

// ============================================================================
// SECTION: HTTP Log
// ============================================================================

/// Path of the entry submission endpoint.
const ENTRIES_PATH: &str = "api/v1/log/entries";

/// Remote transparency log reached over HTTP.
///
/// `POST {base}/api/v1/log/entries` with a [`LogEntryRequest`] body; the
/// response body is a [`LogEntry`].
#[derive(Debug, Clone)]
pub struct HttpTransparencyLog {
    /// Service client.
    client: ServiceClient,
}

impl HttpTransparencyLog {
    /// Creates a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::TransparencyLog`] for an unusable URL.
    pub fn new(endpoint: &ServiceEndpoint) -> Result<Self, SigningError> {
        Ok(Self {
            client: ServiceClient::new(ServiceKind::TransparencyLog, endpoint)?,
        })
    }
}

impl TransparencyLog for HttpTransparencyLog {
    fn submit(&self, request: &LogEntryRequest) -> Result<LogEntry, SigningError> {
        self.client.post_json(ENTRIES_PATH, None, request)
    }
}
