// crates/release-gate-notify/src/lib.rs
// ============================================================================
// Module: Release Gate Notify Library
// Description: Webhook notification of artifact lifecycle events.
// Purpose: Deliver promote, rollback, lock, and unlock events to external systems.
// Dependencies: release-gate-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! [`WebhookNotifier`] posts a [`release_gate_core::LifecycleNotification`]
//! to every webhook subscribed to its event type, retrying with exponential
//! backoff. [`WebhookDispatcher`] wraps a notifier behind a bounded queue and a
//! worker thread so the controller never waits on webhook delivery.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod dispatcher;
pub mod webhook;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::DEFAULT_BACKOFF_BASE;
pub use config::DEFAULT_RETRY_COUNT;
pub use config::DEFAULT_WEBHOOK_TIMEOUT;
pub use config::MAX_RETRY_COUNT;
pub use config::MAX_WEBHOOK_TIMEOUT;
pub use config::WebhookConfig;
pub use config::WebhookError;
pub use dispatcher::DEFAULT_QUEUE_CAPACITY;
pub use dispatcher::WebhookDispatcher;
pub use webhook::Sleeper;
pub use webhook::ThreadSleeper;
pub use webhook::WebhookDelivery;
pub use webhook::WebhookNotifier;
