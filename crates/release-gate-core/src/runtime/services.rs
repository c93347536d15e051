// crates/release-gate-core/src/runtime/services.rs
// ============================================================================
// Module: Release Gate Runtime Services
// Description: Default clock, authorizer, and notifier implementations.
// Purpose: Provide ready-made collaborators for embedding and tests.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Small implementations of the controller's secondary seams: wall-clock
//! time, a static group table, and in-process notifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::events::LifecycleNotification;
use crate::core::identifiers::OperatorId;
use crate::core::time::Timestamp;
use crate::interfaces::Authorizer;
use crate::interfaces::Clock;
use crate::interfaces::EventNotifier;
use crate::interfaces::NotifyError;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Wall-clock time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Timestamp::from_unix_millis(i64::try_from(millis).unwrap_or(i64::MAX))
    }
}

// ============================================================================
// SECTION: Authorizer
// ============================================================================

/// Authorizer backed by a fixed operator-to-groups table.
#[derive(Debug, Default, Clone)]
pub struct StaticAuthorizer {
    /// Group memberships keyed by operator.
    memberships: BTreeMap<String, BTreeSet<String>>,
}

impl StaticAuthorizer {
    /// Creates an empty authorizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `operator` to `group`.
    #[must_use]
    pub fn with_member(mut self, group: impl Into<String>, operator: impl Into<String>) -> Self {
        self.memberships.entry(operator.into()).or_default().insert(group.into());
        self
    }
}

impl Authorizer for StaticAuthorizer {
    fn groups_for(&self, operator: &OperatorId) -> BTreeSet<String> {
        self.memberships.get(operator.as_str()).cloned().unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Notifiers
// ============================================================================

/// Notifier that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl EventNotifier for NoopNotifier {
    fn notify(&self, _notification: &LifecycleNotification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Notifier that queues events in memory, optionally bounded.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotifier {
    /// Queued notifications shared between clones.
    events: Arc<Mutex<Vec<LifecycleNotification>>>,
    /// Maximum queued events; `None` is unbounded.
    capacity: Option<usize>,
}

impl InMemoryNotifier {
    /// Creates an unbounded notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier that rejects events once `capacity` are queued.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::default(),
            capacity: Some(capacity),
        }
    }

    /// Returns a snapshot of queued notifications.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleNotification> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl EventNotifier for InMemoryNotifier {
    fn notify(&self, notification: &LifecycleNotification) -> Result<(), NotifyError> {
        let mut events = self.events.lock().map_err(|_| NotifyError::Closed)?;
        if self.capacity.is_some_and(|capacity| events.len() >= capacity) {
            return Err(NotifyError::QueueFull);
        }
        events.push(notification.clone());
        Ok(())
    }
}
