// crates/release-gate-notify/src/dispatcher.rs
// ============================================================================
// Module: Webhook Dispatcher
// Description: Background webhook delivery fed by a bounded queue.
// Purpose: Keep webhook retries off the promotion path.
// Dependencies: release-gate-core, tokio (sync)
// ============================================================================

//! ## Overview
//! [`WebhookDispatcher`] implements [`EventNotifier`] by enqueueing each
//! notification on a bounded channel and returning immediately. A dedicated
//! worker thread drains the channel through a [`WebhookNotifier`] and reports
//! each delivery to the log sink. A full queue drops the event; the controller
//! turns that into a warning. [`WebhookDispatcher::shutdown`] closes the queue
//! and waits for queued events to finish delivering.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;

use release_gate_core::ControllerLogEvent;
use release_gate_core::ControllerLogSink;
use release_gate_core::EventNotifier;
use release_gate_core::LifecycleNotification;
use release_gate_core::NoopLogSink;
use release_gate_core::NotifyError;
use release_gate_core::sanitize_error_summary;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::WebhookError;
use crate::webhook::WebhookNotifier;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Fire-and-forget webhook delivery on a worker thread.
pub struct WebhookDispatcher {
    /// Queue sender; `None` after shutdown.
    sender: Mutex<Option<mpsc::Sender<LifecycleNotification>>>,
    /// Worker handle; `None` after shutdown.
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Log sink shared with the worker.
    log: Arc<dyn ControllerLogSink>,
    /// Events dropped because the queue was full.
    dropped: AtomicU64,
}

impl WebhookDispatcher {
    /// Starts a worker delivering through `notifier` with the default capacity.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Setup`] when the worker thread cannot start.
    pub fn spawn(notifier: WebhookNotifier) -> Result<Self, WebhookError> {
        Self::spawn_with(notifier, DEFAULT_QUEUE_CAPACITY, Arc::new(NoopLogSink))
    }

    /// Starts a worker with an explicit capacity and log sink.
    ///
    /// A capacity of zero is treated as one.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Setup`] when the worker thread cannot start.
    pub fn spawn_with(
        notifier: WebhookNotifier,
        capacity: usize,
        log: Arc<dyn ControllerLogSink>,
    ) -> Result<Self, WebhookError> {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker_log = Arc::clone(&log);
        let worker = thread::Builder::new()
            .name("release-gate-webhooks".to_string())
            .spawn(move || delivery_loop(&notifier, receiver, worker_log.as_ref()))
            .map_err(|err| WebhookError::Setup(format!("failed to spawn webhook worker: {err}")))?;
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            log,
            dropped: AtomicU64::new(0),
        })
    }

    /// Returns the number of events dropped because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stops accepting events and waits until queued events are delivered.
    ///
    /// Calling it again is a no-op.
    pub fn shutdown(&self) {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(worker) = worker
            && worker.join().is_err()
        {
            self.log.record(
                &ControllerLogEvent::new("webhook_worker", "error")
                    .detail("webhook worker panicked"),
            );
        }
    }
}

impl EventNotifier for WebhookDispatcher {
    fn notify(&self, notification: &LifecycleNotification) -> Result<(), NotifyError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return Err(NotifyError::Closed);
        };
        match sender.try_send(notification.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(NotifyError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(NotifyError::Closed),
        }
    }
}

/// Dropping the dispatcher drains the queue like [`WebhookDispatcher::shutdown`].
impl Drop for WebhookDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookDispatcher").field("dropped", &self.dropped()).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Worker
// ============================================================================

/// Delivers queued notifications until every sender is gone.
fn delivery_loop(
    notifier: &WebhookNotifier,
    mut receiver: mpsc::Receiver<LifecycleNotification>,
    log: &dyn ControllerLogSink,
) {
    while let Some(notification) = receiver.blocking_recv() {
        for delivery in notifier.notify(&notification) {
            let outcome = if delivery.success { "delivered" } else { "failed" };
            let mut detail = format!(
                "{} to {} after {} attempt(s)",
                notification.event_type, delivery.url, delivery.attempts
            );
            if let Some(error) = &delivery.error {
                detail.push_str(": ");
                detail.push_str(error);
            }
            let mut event = ControllerLogEvent::new("webhook_delivery", outcome)
                .environment(&notification.target_environment)
                .operator(&notification.operator)
                .detail(sanitize_error_summary(&detail));
            if let Some(tag) = &notification.artifact_tag {
                event = event.tag(tag);
            }
            log.record(&event);
        }
    }
}
