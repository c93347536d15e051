// crates/release-gate-core/src/runtime/registry.rs
// ============================================================================
// Module: Release Gate In-Memory Registry
// Description: Simple in-memory registry transport for tests and embedding.
// Purpose: Provide a deterministic transport without network dependencies.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! [`InMemoryRegistry`] stores manifests, tags, and per-tag annotation maps in
//! process memory. Clones share state, so a test can keep a handle while the
//! controller owns another. Availability can be toggled to simulate outages
//! and every mutating call is counted. Semantic-version tags are write-once:
//! `push` and `tag_artifact` refuse to move them to a different digest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde_json::json;

use crate::core::error::RegistryError;
use crate::core::identifiers::Digest;
use crate::core::identifiers::TagName;
use crate::core::tags::is_immutable_tag;
use crate::interfaces::Artifact;
use crate::interfaces::LayerDescriptor;
use crate::interfaces::ManifestRecord;
use crate::interfaces::RegistryTransport;
use crate::interfaces::TagReservation;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Manifest media type recorded for pushed artifacts.
pub const OCI_MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";

// ============================================================================
// SECTION: State
// ============================================================================

/// Stored manifest and its single content layer.
#[derive(Debug, Clone)]
struct StoredManifest {
    /// Content layer descriptor.
    layer: LayerDescriptor,
    /// Artifact content.
    artifact: Artifact,
}

/// Registry contents protected by one mutex.
#[derive(Debug, Default)]
struct RegistryState {
    /// Manifests keyed by digest.
    manifests: BTreeMap<String, StoredManifest>,
    /// Tag to manifest digest.
    tags: BTreeMap<String, Digest>,
    /// Annotation maps keyed by tag.
    annotations: BTreeMap<String, BTreeMap<String, String>>,
}

// ============================================================================
// SECTION: In-Memory Registry
// ============================================================================

/// In-memory registry transport.
#[derive(Debug, Clone)]
pub struct InMemoryRegistry {
    /// Registry state shared between clones.
    state: Arc<Mutex<RegistryState>>,
    /// Whether calls succeed.
    available: Arc<AtomicBool>,
    /// Number of successful mutating calls.
    writes: Arc<AtomicU64>,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    /// Creates an empty, available registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            available: Arc::new(AtomicBool::new(true)),
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Simulates an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns the number of successful mutating calls.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns the digest a tag points at without counting as a registry call.
    #[must_use]
    pub fn resolve(&self, tag: &str) -> Option<Digest> {
        self.state.lock().ok().and_then(|state| state.tags.get(tag).cloned())
    }

    /// Returns every tag in lexical order.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.state.lock().map(|state| state.tags.keys().cloned().collect()).unwrap_or_default()
    }

    /// Checks availability and locks the state.
    fn guard(&self) -> Result<MutexGuard<'_, RegistryState>, RegistryError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("registry is offline".to_string()));
        }
        self.state.lock().map_err(|_| RegistryError::Protocol("registry mutex poisoned".to_string()))
    }

    /// Counts a successful write.
    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl RegistryState {
    /// Rejects repointing a write-once tag; returns true when it already
    /// points at `digest`.
    fn check_write_once(&self, tag: &TagName, digest: &Digest) -> Result<bool, RegistryError> {
        match self.tags.get(tag.as_str()) {
            Some(existing) if existing == digest => Ok(true),
            Some(existing) if is_immutable_tag(tag) => Err(RegistryError::ImmutableTag {
                tag: tag.clone(),
                existing_digest: existing.clone(),
            }),
            _ => Ok(false),
        }
    }
}

/// Computes a manifest digest over the canonical manifest body.
fn manifest_digest(layer: &LayerDescriptor) -> Result<Digest, RegistryError> {
    let body = json!({
        "schemaVersion": 2,
        "mediaType": OCI_MANIFEST_MEDIA_TYPE,
        "layers": [{
            "mediaType": layer.media_type,
            "digest": layer.digest.as_str(),
            "size": layer.size,
        }],
    });
    let bytes = serde_json::to_vec(&body).map_err(|err| RegistryError::Protocol(err.to_string()))?;
    Ok(Digest::of_bytes(&bytes))
}

impl RegistryTransport for InMemoryRegistry {
    fn push(&self, artifact: &Artifact, tag: &TagName) -> Result<Digest, RegistryError> {
        let mut state = self.guard()?;
        let layer = LayerDescriptor {
            media_type: artifact.media_type.clone(),
            digest: artifact.digest(),
            size: artifact.bytes.len() as u64,
        };
        let digest = manifest_digest(&layer)?;
        if state.check_write_once(tag, &digest)? {
            return Ok(digest);
        }
        state.manifests.insert(
            digest.as_str().to_string(),
            StoredManifest {
                layer,
                artifact: artifact.clone(),
            },
        );
        state.tags.insert(tag.as_str().to_string(), digest.clone());
        drop(state);
        self.record_write();
        Ok(digest)
    }

    fn pull(&self, tag: &TagName) -> Result<Artifact, RegistryError> {
        let state = self.guard()?;
        let digest =
            state.tags.get(tag.as_str()).ok_or_else(|| RegistryError::NotFound(tag.to_string()))?;
        state
            .manifests
            .get(digest.as_str())
            .map(|manifest| manifest.artifact.clone())
            .ok_or_else(|| RegistryError::NotFound(digest.to_string()))
    }

    fn get_manifest(&self, tag: &TagName) -> Result<ManifestRecord, RegistryError> {
        let state = self.guard()?;
        let digest =
            state.tags.get(tag.as_str()).ok_or_else(|| RegistryError::NotFound(tag.to_string()))?;
        let manifest = state
            .manifests
            .get(digest.as_str())
            .ok_or_else(|| RegistryError::NotFound(digest.to_string()))?;
        Ok(ManifestRecord {
            digest: digest.clone(),
            media_type: OCI_MANIFEST_MEDIA_TYPE.to_string(),
            annotations: state.annotations.get(tag.as_str()).cloned().unwrap_or_default(),
            layers: vec![manifest.layer.clone()],
        })
    }

    fn tag_artifact(&self, digest: &Digest, tag: &TagName) -> Result<(), RegistryError> {
        let mut state = self.guard()?;
        if !state.manifests.contains_key(digest.as_str()) {
            return Err(RegistryError::NotFound(digest.to_string()));
        }
        if state.check_write_once(tag, digest)? {
            return Ok(());
        }
        state.tags.insert(tag.as_str().to_string(), digest.clone());
        drop(state);
        self.record_write();
        Ok(())
    }

    fn read_annotations(&self, tag: &TagName) -> Result<BTreeMap<String, String>, RegistryError> {
        let state = self.guard()?;
        Ok(state.annotations.get(tag.as_str()).cloned().unwrap_or_default())
    }

    fn write_annotations(
        &self,
        tag: &TagName,
        annotations: &BTreeMap<String, String>,
    ) -> Result<(), RegistryError> {
        let mut state = self.guard()?;
        state.annotations.insert(tag.as_str().to_string(), annotations.clone());
        drop(state);
        self.record_write();
        Ok(())
    }

    fn reserve_tag(&self, digest: &Digest, tag: &TagName) -> Result<TagReservation, RegistryError> {
        let mut state = self.guard()?;
        if let Some(existing) = state.tags.get(tag.as_str()) {
            return Ok(TagReservation::Existing(existing.clone()));
        }
        if !state.manifests.contains_key(digest.as_str()) {
            return Err(RegistryError::NotFound(digest.to_string()));
        }
        state.tags.insert(tag.as_str().to_string(), digest.clone());
        drop(state);
        self.record_write();
        Ok(TagReservation::Created)
    }
}
