// crates/release-gate-notify/src/webhook/tests.rs
// ============================================================================
// Module: Webhook Notifier Unit Tests
// Description: Construction, filtering, and unreachable-endpoint behavior.
// Dependencies: release-gate-notify
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Mutex;

use release_gate_core::EnvironmentName;
use release_gate_core::LifecycleEvent;
use release_gate_core::OperatorId;
use release_gate_core::Timestamp;

use super::*;

#[derive(Debug, Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

fn lock_event() -> LifecycleNotification {
    LifecycleNotification {
        event_type: LifecycleEvent::Lock,
        artifact_tag: None,
        artifact_digest: None,
        source_environment: None,
        target_environment: EnvironmentName::parse("prod").unwrap(),
        operator: OperatorId::new("alice"),
        timestamp: Timestamp::from_unix_millis(1_700_000_000_000),
        reason: Some("incident".to_string()),
    }
}

#[test]
fn unsubscribed_webhooks_are_skipped() {
    let notifier = WebhookNotifier::new(vec![
        WebhookConfig::new("https://hooks.example/promotions").with_events([LifecycleEvent::Promote]),
    ])
    .unwrap();

    assert_eq!(notifier.len(), 1);
    assert!(notifier.notify(&lock_event()).is_empty());
}

#[test]
fn invalid_header_is_rejected() {
    let config = WebhookConfig::new("https://hooks.example/release").with_header("bad header", "x");
    assert!(matches!(WebhookNotifier::new(vec![config]), Err(WebhookError::InvalidHeader(_))));
}

#[test]
fn debug_output_omits_header_values() {
    let config = WebhookConfig::new("https://hooks.example/release")
        .with_header("Authorization", "Bearer super-secret");
    let notifier = WebhookNotifier::new(vec![config]).unwrap();

    let rendered = format!("{notifier:?}");
    assert!(rendered.contains("hooks.example"));
    assert!(!rendered.contains("super-secret"));
}

#[test]
fn unreachable_endpoint_exhausts_retries_with_backoff() {
    let sleeper = Arc::new(RecordingSleeper::default());
    let config = WebhookConfig {
        allow_http: true,
        retry_count: 2,
        timeout: Duration::from_secs(2),
        ..WebhookConfig::new("http://127.0.0.1:9/hook")
    };
    let notifier = WebhookNotifier::new(vec![config]).unwrap().with_sleeper(sleeper.clone());

    let deliveries = notifier.notify(&lock_event());

    assert_eq!(deliveries.len(), 1);
    let delivery = &deliveries[0];
    assert!(!delivery.success);
    assert_eq!(delivery.attempts, 3);
    assert_eq!(delivery.status_code, None);
    assert!(delivery.error.as_deref().unwrap().starts_with("webhook"));
    assert_eq!(
        *sleeper.delays.lock().unwrap(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}
