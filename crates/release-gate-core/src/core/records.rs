// crates/release-gate-core/src/core/records.rs
// ============================================================================
// Module: Release Gate Records
// Description: Gate results, audit records, lock state, and impact reports.
// Purpose: Define the immutable values produced by controller operations.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Promotion and rollback records are created once per attempt and appended to
//! the audit trail; nothing mutates them afterwards. Lock state round-trips
//! through registry annotations so it survives controller restarts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::Digest;
use crate::core::identifiers::EnvironmentName;
use crate::core::identifiers::GateId;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::PromotionId;
use crate::core::identifiers::RollbackId;
use crate::core::identifiers::TagName;
use crate::core::identifiers::TraceId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Gate Results
// ============================================================================

/// Outcome of a single gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    /// Gate passed.
    Passed,
    /// Gate failed.
    Failed,
    /// Gate not evaluated (not required).
    Skipped,
}

/// Gate evaluation result captured in a promotion record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    /// Gate identifier.
    pub gate: GateId,
    /// Gate status.
    pub status: GateStatus,
    /// Optional failure detail.
    pub detail: Option<String>,
    /// Whether the gate was advisory.
    pub advisory: bool,
}

// ============================================================================
// SECTION: Promotion Records
// ============================================================================

/// What a promotion attempt did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionOutcome {
    /// Tags were written.
    Promoted,
    /// Target tag already pointed at the digest; nothing was written.
    NoOp,
    /// Dry run; nothing was written.
    DryRun,
}

/// Immutable audit record of a promotion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionRecord {
    /// Unique promotion identifier.
    pub promotion_id: PromotionId,
    /// Source artifact tag.
    pub artifact_tag: TagName,
    /// Resolved artifact digest.
    pub artifact_digest: Digest,
    /// Environment version tag for the target environment.
    pub environment_tag: TagName,
    /// Source environment.
    pub source_environment: EnvironmentName,
    /// Target environment.
    pub target_environment: EnvironmentName,
    /// Operator who requested the promotion.
    pub operator: OperatorId,
    /// Record creation time.
    pub timestamp: Timestamp,
    /// Dry-run flag.
    pub dry_run: bool,
    /// Effect on the registry.
    pub outcome: PromotionOutcome,
    /// Gate results in evaluation order.
    pub gate_results: Vec<GateResult>,
    /// Whether a signature was cryptographically verified.
    pub signature_verified: bool,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Trace correlation identifier.
    pub trace_id: TraceId,
}

// ============================================================================
// SECTION: Rollback Records
// ============================================================================

/// Immutable audit record of a rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRecord {
    /// Unique rollback identifier.
    pub rollback_id: RollbackId,
    /// Environment rolled back.
    pub environment: EnvironmentName,
    /// Version tag rolled back to.
    pub artifact_tag: TagName,
    /// Rollback tag created for this rollback.
    pub rollback_tag: TagName,
    /// Digest the environment now points at.
    pub target_digest: Digest,
    /// Digest `latest-{env}` pointed at before the rollback.
    pub previous_digest: Option<Digest>,
    /// Operator-supplied reason.
    pub reason: String,
    /// Operator who requested the rollback.
    pub operator: OperatorId,
    /// Record creation time.
    pub timestamp: Timestamp,
    /// Trace correlation identifier.
    pub trace_id: TraceId,
}

// ============================================================================
// SECTION: Lock Status
// ============================================================================

/// Annotation key holding the lock flag.
pub const LOCK_LOCKED_KEY: &str = "lock.locked";
/// Annotation key holding the lock reason.
pub const LOCK_REASON_KEY: &str = "lock.reason";
/// Annotation key holding the locking operator.
pub const LOCK_LOCKED_BY_KEY: &str = "lock.locked-by";
/// Annotation key holding the lock time.
pub const LOCK_LOCKED_AT_KEY: &str = "lock.locked-at";

/// Lock state of an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    /// Environment name.
    pub environment: EnvironmentName,
    /// Whether promotions and rollbacks are frozen.
    pub locked: bool,
    /// Lock reason.
    pub reason: Option<String>,
    /// Operator who set the lock.
    pub locked_by: Option<OperatorId>,
    /// When the lock was set.
    pub locked_at: Option<Timestamp>,
}

impl LockStatus {
    /// Returns an unlocked status.
    #[must_use]
    pub const fn unlocked(environment: EnvironmentName) -> Self {
        Self {
            environment,
            locked: false,
            reason: None,
            locked_by: None,
            locked_at: None,
        }
    }

    /// Reads lock state from an annotation map. Missing keys mean unlocked.
    #[must_use]
    pub fn from_annotations(
        environment: EnvironmentName,
        annotations: &BTreeMap<String, String>,
    ) -> Self {
        let locked = annotations.get(LOCK_LOCKED_KEY).is_some_and(|value| value == "true");
        if !locked {
            return Self::unlocked(environment);
        }
        Self {
            environment,
            locked,
            reason: annotations.get(LOCK_REASON_KEY).cloned(),
            locked_by: annotations.get(LOCK_LOCKED_BY_KEY).map(OperatorId::new),
            locked_at: annotations
                .get(LOCK_LOCKED_AT_KEY)
                .and_then(|value| Timestamp::parse_rfc3339(value)),
        }
    }

    /// Writes this lock state into an annotation map, replacing prior lock keys.
    pub fn write_annotations(&self, annotations: &mut BTreeMap<String, String>) {
        clear_lock_annotations(annotations);
        if !self.locked {
            return;
        }
        annotations.insert(LOCK_LOCKED_KEY.to_string(), "true".to_string());
        if let Some(reason) = &self.reason {
            annotations.insert(LOCK_REASON_KEY.to_string(), reason.clone());
        }
        if let Some(locked_by) = &self.locked_by {
            annotations.insert(LOCK_LOCKED_BY_KEY.to_string(), locked_by.to_string());
        }
        if let Some(locked_at) = &self.locked_at {
            annotations.insert(LOCK_LOCKED_AT_KEY.to_string(), locked_at.to_rfc3339());
        }
    }
}

/// Removes every lock key from an annotation map.
pub fn clear_lock_annotations(annotations: &mut BTreeMap<String, String>) {
    for key in [LOCK_LOCKED_KEY, LOCK_REASON_KEY, LOCK_LOCKED_BY_KEY, LOCK_LOCKED_AT_KEY] {
        annotations.remove(key);
    }
}

// ============================================================================
// SECTION: Rollback Impact
// ============================================================================

/// Annotation key carrying the artifact's schema version.
pub const SCHEMA_VERSION_KEY: &str = "artifact.schema-version";

/// Artifact that would be rolled past.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersededArtifact {
    /// Version tag.
    pub artifact_tag: TagName,
    /// Digest.
    pub artifact_digest: Digest,
    /// When it was promoted.
    pub promoted_at: Timestamp,
    /// Schema version annotation, if any.
    pub schema_version: Option<String>,
}

/// Read-only rollback impact report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackImpact {
    /// Version tag being rolled back to.
    pub artifact_tag: TagName,
    /// Environment under analysis.
    pub environment: EnvironmentName,
    /// Digest the rollback would restore.
    pub target_digest: Digest,
    /// Digest currently served by `latest-{env}`.
    pub current_digest: Option<Digest>,
    /// Artifacts promoted to the environment after the target.
    pub superseded: Vec<SupersededArtifact>,
    /// Breaking-change warnings.
    pub breaking_changes: Vec<String>,
    /// Downstream consumers and environments affected.
    pub affected_consumers: Vec<String>,
    /// Operator guidance.
    pub recommendations: Vec<String>,
    /// Lock state at analysis time.
    pub lock: LockStatus,
}
