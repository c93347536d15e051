// crates/release-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Release Gate Interfaces
// Description: Backend-agnostic seams for registry, signing, gates, and audit.
// Purpose: Define the contract surfaces used by the promotion controller.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the controller reaches the registry, signature
//! verification, gate evaluation, authorization, the audit trail, and event
//! delivery without embedding backend details. Implementations must fail
//! closed: an error from a gate or verifier is never treated as a pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::error::RegistryError;
use crate::core::events::LifecycleNotification;
use crate::core::identifiers::Digest;
use crate::core::identifiers::EnvironmentName;
use crate::core::identifiers::GateId;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::TagName;
use crate::core::records::PromotionRecord;
use crate::core::records::RollbackRecord;
use crate::core::signature::SignatureMetadata;
use crate::core::signature::SignatureMode;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Registry Transport
// ============================================================================

/// Media type of release-gate artifact layers when none is supplied.
pub const DEFAULT_ARTIFACT_MEDIA_TYPE: &str = "application/octet-stream";

/// Artifact content moved through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Layer media type.
    pub media_type: String,
    /// Artifact bytes.
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Creates an artifact with the default media type.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            media_type: DEFAULT_ARTIFACT_MEDIA_TYPE.to_string(),
            bytes,
        }
    }

    /// Returns the content digest of the artifact bytes.
    #[must_use]
    pub fn digest(&self) -> Digest {
        Digest::of_bytes(&self.bytes)
    }
}

/// Layer descriptor within a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Layer media type.
    pub media_type: String,
    /// Layer digest.
    pub digest: Digest,
    /// Layer size in bytes.
    pub size: u64,
}

/// Manifest resolved from a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    /// Manifest digest the tag points at.
    pub digest: Digest,
    /// Manifest media type.
    pub media_type: String,
    /// Annotations stored for the tag.
    pub annotations: BTreeMap<String, String>,
    /// Layers referenced by the manifest.
    pub layers: Vec<LayerDescriptor>,
}

/// Result of a write-once tag reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagReservation {
    /// Tag did not exist and now points at the requested digest.
    Created,
    /// Tag already existed; it was left untouched.
    Existing(Digest),
}

/// Registry transport used for every registry read and write.
///
/// Reads never mutate registry state. Implementations report availability
/// failures as [`RegistryError::Unavailable`] so circuit breaking can count them.
pub trait RegistryTransport: Send + Sync {
    /// Uploads artifact content and tags it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the upload fails.
    fn push(&self, artifact: &Artifact, tag: &TagName) -> Result<Digest, RegistryError>;

    /// Downloads the artifact content referenced by a tag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the tag is missing.
    fn pull(&self, tag: &TagName) -> Result<Artifact, RegistryError>;

    /// Resolves a tag to its manifest and annotations.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the tag is missing.
    fn get_manifest(&self, tag: &TagName) -> Result<ManifestRecord, RegistryError>;

    /// Points a tag at an existing manifest digest, replacing any prior target.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the digest is unknown or the write fails.
    fn tag_artifact(&self, digest: &Digest, tag: &TagName) -> Result<(), RegistryError>;

    /// Reads the annotation map stored for a tag. Missing tags read as empty.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the registry cannot be read.
    fn read_annotations(&self, tag: &TagName) -> Result<BTreeMap<String, String>, RegistryError>;

    /// Replaces the annotation map stored for a tag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the write fails.
    fn write_annotations(
        &self,
        tag: &TagName,
        annotations: &BTreeMap<String, String>,
    ) -> Result<(), RegistryError>;

    /// Creates `tag -> digest` only when `tag` does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the registry cannot be read or written.
    fn reserve_tag(&self, digest: &Digest, tag: &TagName) -> Result<TagReservation, RegistryError>;
}

impl<T: RegistryTransport + ?Sized> RegistryTransport for Arc<T> {
    fn push(&self, artifact: &Artifact, tag: &TagName) -> Result<Digest, RegistryError> {
        (**self).push(artifact, tag)
    }

    fn pull(&self, tag: &TagName) -> Result<Artifact, RegistryError> {
        (**self).pull(tag)
    }

    fn get_manifest(&self, tag: &TagName) -> Result<ManifestRecord, RegistryError> {
        (**self).get_manifest(tag)
    }

    fn tag_artifact(&self, digest: &Digest, tag: &TagName) -> Result<(), RegistryError> {
        (**self).tag_artifact(digest, tag)
    }

    fn read_annotations(&self, tag: &TagName) -> Result<BTreeMap<String, String>, RegistryError> {
        (**self).read_annotations(tag)
    }

    fn write_annotations(
        &self,
        tag: &TagName,
        annotations: &BTreeMap<String, String>,
    ) -> Result<(), RegistryError> {
        (**self).write_annotations(tag, annotations)
    }

    fn reserve_tag(&self, digest: &Digest, tag: &TagName) -> Result<TagReservation, RegistryError> {
        (**self).reserve_tag(digest, tag)
    }
}

// ============================================================================
// SECTION: Signature Verification
// ============================================================================

/// Identity established by a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedSignature {
    /// Signing mode of the verified bundle.
    pub mode: SignatureMode,
    /// Certificate subject, when keyless.
    pub subject: Option<String>,
    /// Identity issuer, when keyless.
    pub issuer: Option<String>,
    /// Transparency log index, when keyless.
    pub log_index: Option<u64>,
    /// Fingerprint of the verifying certificate or key.
    pub fingerprint: String,
}

/// Signature verification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Bundle could not be parsed.
    #[error("malformed signature bundle: {0}")]
    Malformed(String),
    /// Content digest does not match the signed digest.
    #[error("content digest mismatch")]
    DigestMismatch,
    /// Cryptographic signature check failed.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// Signer, certificate, or log is not trusted.
    #[error("untrusted signer: {0}")]
    Untrusted(String),
    /// Transparency log proof failed.
    #[error("transparency log proof invalid: {0}")]
    InvalidProof(String),
}

/// Verifies signature metadata against artifact content.
pub trait SignatureVerifier: Send + Sync {
    /// Verifies the signature carried by `metadata` over `content`.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError`] when the signature does not verify.
    fn verify(
        &self,
        metadata: &SignatureMetadata,
        content: &[u8],
    ) -> Result<VerifiedSignature, VerificationError>;
}

// ============================================================================
// SECTION: Gate Evaluation
// ============================================================================

/// Inputs available to a gate evaluator.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    /// Artifact tag being promoted.
    pub tag: &'a TagName,
    /// Resolved artifact digest.
    pub digest: &'a Digest,
    /// Source environment.
    pub source_environment: &'a EnvironmentName,
    /// Target environment.
    pub target_environment: &'a EnvironmentName,
    /// Annotations stored for the artifact tag.
    pub annotations: &'a BTreeMap<String, String>,
}

/// Gate decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    /// Gate passed.
    Pass,
    /// Gate failed with a reason.
    Fail(String),
}

/// Gate evaluation errors. Treated as gate failures by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// Evaluator could not reach a decision.
    #[error("gate evaluation error: {0}")]
    Evaluation(String),
}

/// Evaluates promotion gates.
pub trait GateEvaluator: Send + Sync {
    /// Evaluates `gate` for the promotion described by `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when no decision can be made.
    fn evaluate(&self, gate: &GateId, ctx: &GateContext<'_>) -> Result<GateVerdict, GateError>;
}

// ============================================================================
// SECTION: Authorization
// ============================================================================

/// Resolves the groups an operator belongs to.
pub trait Authorizer: Send + Sync {
    /// Returns the operator's group memberships.
    fn groups_for(&self, operator: &OperatorId) -> BTreeSet<String>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Time source for record timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

// ============================================================================
// SECTION: Audit Trail
// ============================================================================

/// Audit trail errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    /// Audit I/O error.
    #[error("audit trail io error: {0}")]
    Io(String),
    /// Stored audit data is corrupted.
    #[error("audit trail corruption: {0}")]
    Corrupt(String),
    /// Audit trail reported an error.
    #[error("audit trail error: {0}")]
    Store(String),
}

/// Append-only record of promotions and rollbacks.
pub trait AuditTrail: Send + Sync {
    /// Appends a promotion record.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the record cannot be persisted.
    fn append_promotion(&self, record: &PromotionRecord) -> Result<(), AuditError>;

    /// Appends a rollback record.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the record cannot be persisted.
    fn append_rollback(&self, record: &RollbackRecord) -> Result<(), AuditError>;

    /// Returns every promotion record in append order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the trail cannot be read.
    fn promotions(&self) -> Result<Vec<PromotionRecord>, AuditError>;

    /// Returns every rollback record in append order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the trail cannot be read.
    fn rollbacks(&self) -> Result<Vec<RollbackRecord>, AuditError>;
}

// ============================================================================
// SECTION: Event Notification
// ============================================================================

/// Event enqueue errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// Delivery queue is full; the event was dropped.
    #[error("notification queue is full")]
    QueueFull,
    /// Delivery worker has shut down.
    #[error("notification channel is closed")]
    Closed,
}

/// Fire-and-forget lifecycle event sink.
pub trait EventNotifier: Send + Sync {
    /// Enqueues a lifecycle notification for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when the event cannot be enqueued.
    fn notify(&self, notification: &LifecycleNotification) -> Result<(), NotifyError>;
}

impl<T: EventNotifier + ?Sized> EventNotifier for Arc<T> {
    fn notify(&self, notification: &LifecycleNotification) -> Result<(), NotifyError> {
        (**self).notify(notification)
    }
}
