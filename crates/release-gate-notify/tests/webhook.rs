// crates/release-gate-notify/tests/webhook.rs
// ============================================================================
// Module: Webhook Delivery Integration Tests
// Description: Payload shape, retry backoff, headers, and event filtering.
// Purpose: Exercise the notifier against a live HTTP receiver.
// Dependencies: release-gate-notify, tiny_http
// ============================================================================

//! Webhook Delivery Integration Tests for release-gate-notify.

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

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::FakeReceiver;
use common::RecordingSleeper;
use common::lock_event;
use common::promote_event;
use release_gate_core::Digest;
use release_gate_core::LifecycleEvent;
use release_gate_notify::WebhookNotifier;

#[test]
fn payload_carries_every_notification_field() {
    let receiver = FakeReceiver::start();
    let notifier = WebhookNotifier::new(vec![receiver.config("/hooks/release")]).unwrap();

    let deliveries = notifier.notify(&promote_event());

    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].success);
    assert_eq!(deliveries[0].status_code, Some(200));
    assert_eq!(deliveries[0].attempts, 1);
    assert_eq!(deliveries[0].error, None);

    let received = receiver.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path, "/hooks/release");
    assert_eq!(received[0].header("content-type"), Some("application/json"));
    let body = received[0].json();
    assert_eq!(body["event_type"], "promote");
    assert_eq!(body["artifact_tag"], "v1.2.0");
    assert_eq!(body["artifact_digest"], Digest::of_bytes(b"release-payload").as_str());
    assert_eq!(body["source_environment"], "staging");
    assert_eq!(body["target_environment"], "prod");
    assert_eq!(body["operator"], "alice");
    assert_eq!(body["timestamp"], "2023-11-14T22:13:20Z");
    assert!(body.get("reason").is_none());
}

#[test]
fn lock_payload_includes_reason_and_null_artifact() {
    let receiver = FakeReceiver::start();
    let notifier = WebhookNotifier::new(vec![receiver.config("/hooks/lock")]).unwrap();

    let _ = notifier.notify(&lock_event());

    let body = receiver.received()[0].json();
    assert_eq!(body["event_type"], "lock");
    assert_eq!(body["reason"], "incident INC-7");
    assert!(body["artifact_tag"].is_null());
    assert!(body["source_environment"].is_null());
}

#[test]
fn transient_failures_retry_with_doubling_backoff() {
    let receiver = FakeReceiver::scripted(&[503, 503, 503]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let notifier = WebhookNotifier::new(vec![receiver.config("/hooks/release")])
        .unwrap()
        .with_sleeper(sleeper.clone());

    let deliveries = notifier.notify(&promote_event());

    assert!(deliveries[0].success);
    assert_eq!(deliveries[0].attempts, 4);
    assert_eq!(deliveries[0].status_code, Some(200));
    assert_eq!(receiver.received().len(), 4);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[test]
fn exhausted_retries_report_the_last_status() {
    let receiver = FakeReceiver::scripted(&[500, 500, 500, 500, 500]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let notifier = WebhookNotifier::new(vec![receiver.config("/hooks/release")])
        .unwrap()
        .with_sleeper(sleeper.clone());

    let deliveries = notifier.notify(&promote_event());

    let delivery = &deliveries[0];
    assert!(!delivery.success);
    assert_eq!(delivery.attempts, 4);
    assert_eq!(delivery.status_code, Some(500));
    assert_eq!(delivery.error.as_deref(), Some("webhook returned HTTP 500"));
    assert_eq!(receiver.received().len(), 4);
    assert_eq!(sleeper.delays().len(), 3);
}

#[test]
fn zero_retries_makes_a_single_attempt() {
    let receiver = FakeReceiver::scripted(&[502]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let mut config = receiver.config("/hooks/release");
    config.retry_count = 0;
    let notifier = WebhookNotifier::new(vec![config]).unwrap().with_sleeper(sleeper.clone());

    let deliveries = notifier.notify(&promote_event());

    assert!(!deliveries[0].success);
    assert_eq!(deliveries[0].attempts, 1);
    assert!(sleeper.delays().is_empty());
}

#[test]
fn redirects_are_not_followed() {
    let receiver = FakeReceiver::scripted(&[302]);
    let mut config = receiver.config("/hooks/release");
    config.retry_count = 0;
    let notifier = WebhookNotifier::new(vec![config]).unwrap();

    let deliveries = notifier.notify(&promote_event());

    assert!(!deliveries[0].success);
    assert_eq!(deliveries[0].status_code, Some(302));
    assert_eq!(receiver.received().len(), 1);
}

#[test]
fn custom_headers_are_sent() {
    let receiver = FakeReceiver::start();
    let config = receiver
        .config("/hooks/release")
        .with_header("Authorization", "Bearer hook-token")
        .with_header("X-Release-Source", "release-gate");
    let notifier = WebhookNotifier::new(vec![config]).unwrap();

    let _ = notifier.notify(&promote_event());

    let received = receiver.received();
    assert_eq!(received[0].header("authorization"), Some("Bearer hook-token"));
    assert_eq!(received[0].header("x-release-source"), Some("release-gate"));
}

#[test]
fn each_webhook_receives_only_subscribed_events() {
    let receiver = FakeReceiver::start();
    let notifier = WebhookNotifier::new(vec![
        receiver.config("/all"),
        receiver.config("/promotions").with_events([LifecycleEvent::Promote]),
        receiver
            .config("/locks")
            .with_events([LifecycleEvent::Lock, LifecycleEvent::Unlock]),
    ])
    .unwrap();

    let promoted = notifier.notify(&promote_event());
    let locked = notifier.notify(&lock_event());

    assert_eq!(promoted.len(), 2);
    assert_eq!(locked.len(), 2);
    let mut paths = receiver.paths();
    paths.sort();
    assert_eq!(paths, vec!["/all", "/all", "/locks", "/promotions"]);
}

#[test]
fn one_failing_webhook_does_not_affect_others() {
    let failing = FakeReceiver::scripted(&[500]);
    let healthy = FakeReceiver::start();
    let mut broken = failing.config("/hook");
    broken.retry_count = 0;
    let notifier = WebhookNotifier::new(vec![broken, healthy.config("/hook")]).unwrap();

    let deliveries = notifier.notify(&promote_event());

    assert_eq!(deliveries.len(), 2);
    assert!(!deliveries[0].success);
    assert!(deliveries[1].success);
    assert_eq!(healthy.received().len(), 1);
}
