// crates/release-gate-notify/tests/common/mod.rs
// ============================================================================
// Module: Webhook Test Fixtures
// Description: Scripted webhook receiver, recording sleeper, and sample events.
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are used by a subset of test binaries.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures unwrap deterministic values."
)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use release_gate_core::Digest;
use release_gate_core::EnvironmentName;
use release_gate_core::LifecycleEvent;
use release_gate_core::LifecycleNotification;
use release_gate_core::OperatorId;
use release_gate_core::TagName;
use release_gate_core::Timestamp;
use release_gate_notify::Sleeper;
use release_gate_notify::WebhookConfig;
use tiny_http::Response;
use tiny_http::Server;

pub const T0: i64 = 1_700_000_000_000;

/// One request seen by the receiver.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    /// Request path.
    pub path: String,
    /// Lower-cased header names paired with their values.
    pub headers: Vec<(String, String)>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers.iter().find(|(field, _)| *field == name).map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Receiver state shared with the accept loop.
#[derive(Debug, Default)]
struct ReceiverState {
    /// Statuses answered in order; 200 once exhausted.
    script: VecDeque<u16>,
    /// Requests received.
    received: Vec<ReceivedRequest>,
}

/// Webhook endpoint answering from a status script.
pub struct FakeReceiver {
    /// Base URL, e.g. `http://127.0.0.1:PORT`.
    pub url: String,
    state: Arc<Mutex<ReceiverState>>,
    server: Arc<Server>,
}

impl FakeReceiver {
    pub fn start() -> Self {
        Self::scripted(&[])
    }

    /// Starts a receiver answering `statuses` in order, then 200.
    pub fn scripted(statuses: &[u16]) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let state = Arc::new(Mutex::new(ReceiverState {
            script: statuses.iter().copied().collect(),
            received: Vec::new(),
        }));
        let loop_server = Arc::clone(&server);
        let loop_state = Arc::clone(&state);
        thread::spawn(move || {
            for mut request in loop_server.incoming_requests() {
                let mut body = Vec::new();
                request.as_reader().read_to_end(&mut body).unwrap();
                let headers = request
                    .headers()
                    .iter()
                    .map(|header| {
                        (
                            header.field.as_str().as_str().to_ascii_lowercase(),
                            header.value.as_str().to_string(),
                        )
                    })
                    .collect();
                let status = {
                    let mut state = loop_state.lock().unwrap();
                    state.received.push(ReceivedRequest {
                        path: request.url().to_string(),
                        headers,
                        body,
                    });
                    state.script.pop_front().unwrap_or(200)
                };
                let _ = request.respond(Response::from_string("ok").with_status_code(status));
            }
        });
        Self {
            url: format!("http://{addr}"),
            state,
            server,
        }
    }

    /// Webhook configuration for `path` with cleartext HTTP allowed.
    pub fn config(&self, path: &str) -> WebhookConfig {
        WebhookConfig {
            allow_http: true,
            timeout: Duration::from_secs(5),
            ..WebhookConfig::new(format!("{}{path}", self.url))
        }
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.state.lock().unwrap().received.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.received().into_iter().map(|request| request.path).collect()
    }
}

impl Drop for FakeReceiver {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

/// Sleeper that records requested delays without waiting.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// A promote notification for `v1.2.0` from staging to prod.
pub fn promote_event() -> LifecycleNotification {
    LifecycleNotification {
        event_type: LifecycleEvent::Promote,
        artifact_tag: Some(TagName::parse("v1.2.0").unwrap()),
        artifact_digest: Some(Digest::of_bytes(b"release-payload")),
        source_environment: Some(EnvironmentName::parse("staging").unwrap()),
        target_environment: EnvironmentName::parse("prod").unwrap(),
        operator: OperatorId::new("alice"),
        timestamp: Timestamp::from_unix_millis(T0),
        reason: None,
    }
}

/// A lock notification on prod.
pub fn lock_event() -> LifecycleNotification {
    LifecycleNotification {
        event_type: LifecycleEvent::Lock,
        artifact_tag: None,
        artifact_digest: None,
        source_environment: None,
        target_environment: EnvironmentName::parse("prod").unwrap(),
        operator: OperatorId::new("oncall"),
        timestamp: Timestamp::from_unix_millis(T0),
        reason: Some("incident INC-7".to_string()),
    }
}
