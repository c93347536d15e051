// crates/release-gate-core/src/core/events.rs
// ============================================================================
// Module: Release Gate Lifecycle Events
// Description: Event types and the webhook payload schema.
// Purpose: Describe lifecycle notifications independently of delivery.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Every promote, rollback, lock, and unlock produces one
//! [`LifecycleNotification`]. The JSON form is the webhook wire payload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::Digest;
use crate::core::identifiers::EnvironmentName;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::TagName;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Event Types
// ============================================================================

/// Lifecycle event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Artifact promoted.
    Promote,
    /// Environment rolled back.
    Rollback,
    /// Environment locked.
    Lock,
    /// Environment unlocked.
    Unlock,
}

impl LifecycleEvent {
    /// All event types.
    pub const ALL: [Self; 4] = [Self::Promote, Self::Rollback, Self::Lock, Self::Unlock];

    /// Returns the stable label for the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Promote => "promote",
            Self::Rollback => "rollback",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        }
    }

    /// Parses an event label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == value)
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Notification Payload
// ============================================================================

/// Webhook payload for a lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleNotification {
    /// Event type.
    pub event_type: LifecycleEvent,
    /// Artifact tag, when the event concerns an artifact.
    pub artifact_tag: Option<TagName>,
    /// Artifact digest, when known.
    pub artifact_digest: Option<Digest>,
    /// Source environment (promotions only).
    pub source_environment: Option<EnvironmentName>,
    /// Target environment.
    pub target_environment: EnvironmentName,
    /// Operator who triggered the event.
    pub operator: OperatorId,
    /// Event time.
    pub timestamp: Timestamp,
    /// Free-form reason (rollback, lock, unlock).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
