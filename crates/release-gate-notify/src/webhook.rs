// crates/release-gate-notify/src/webhook.rs
// ============================================================================
// Module: Webhook Notifier
// Description: Synchronous webhook delivery with retry and exponential backoff.
// Purpose: POST lifecycle notifications to every subscribed endpoint.
// Dependencies: reqwest, serde_json, release-gate-core
// ============================================================================

//! ## Overview
//! [`WebhookNotifier::notify`] never fails: each subscribed endpoint yields a
//! [`WebhookDelivery`] describing the outcome. A non-2xx answer or transport
//! error is retried up to `retry_count` times, sleeping `base × 2^attempt`
//! between attempts. Redirects are not followed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use release_gate_core::LifecycleNotification;
use release_gate_core::sanitize_error_summary;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde::Serialize;
use url::Url;

use crate::config::WebhookConfig;
use crate::config::WebhookError;

// ============================================================================
// SECTION: Delivery Result
// ============================================================================

/// Outcome of delivering one notification to one webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookDelivery {
    /// Webhook URL.
    pub url: String,
    /// True when an attempt received a 2xx answer.
    pub success: bool,
    /// Last HTTP status received, if any.
    pub status_code: Option<u16>,
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Last failure, when unsuccessful.
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Sleeper
// ============================================================================

/// Waits between delivery attempts.
pub trait Sleeper: Send + Sync {
    /// Blocks for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

// ============================================================================
// SECTION: Notifier
// ============================================================================

/// Validated webhook endpoint with its client.
struct Endpoint {
    /// Source configuration.
    config: WebhookConfig,
    /// Parsed target URL.
    url: Url,
    /// Extra request headers.
    headers: HeaderMap,
    /// HTTP client bound to the endpoint timeout.
    client: Client,
}

/// Delivers lifecycle notifications to configured webhooks.
pub struct WebhookNotifier {
    /// Configured endpoints.
    endpoints: Vec<Endpoint>,
    /// Backoff sleeper.
    sleeper: Arc<dyn Sleeper>,
}

impl WebhookNotifier {
    /// Builds a notifier for `configs`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError`] when a configuration is invalid.
    pub fn new(configs: Vec<WebhookConfig>) -> Result<Self, WebhookError> {
        let endpoints =
            configs.into_iter().map(Endpoint::new).collect::<Result<Vec<_>, WebhookError>>()?;
        Ok(Self {
            endpoints,
            sleeper: Arc::new(ThreadSleeper),
        })
    }

    /// Replaces the backoff sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Returns the number of configured webhooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns true when no webhooks are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Delivers `notification` to every webhook subscribed to its event type.
    #[must_use]
    pub fn notify(&self, notification: &LifecycleNotification) -> Vec<WebhookDelivery> {
        let subscribed = self
            .endpoints
            .iter()
            .filter(|endpoint| endpoint.config.should_notify(notification.event_type));
        let payload = match serde_json::to_vec(notification) {
            Ok(payload) => payload,
            Err(err) => {
                let error = format!("payload encoding failed: {err}");
                return subscribed
                    .map(|endpoint| WebhookDelivery {
                        url: endpoint.config.url.clone(),
                        success: false,
                        status_code: None,
                        attempts: 0,
                        error: Some(error.clone()),
                    })
                    .collect();
            }
        };
        subscribed.map(|endpoint| self.deliver(endpoint, &payload)).collect()
    }

    /// Posts `payload` to one endpoint, retrying with backoff.
    fn deliver(&self, endpoint: &Endpoint, payload: &[u8]) -> WebhookDelivery {
        let config = &endpoint.config;
        let mut attempts = 0;
        let (status_code, error) = loop {
            attempts += 1;
            let failure = match endpoint.post(payload) {
                Ok(status) if (200 ..= 299).contains(&status) => {
                    return WebhookDelivery {
                        url: config.url.clone(),
                        success: true,
                        status_code: Some(status),
                        attempts,
                        error: None,
                    };
                }
                Ok(status) => (Some(status), format!("webhook returned HTTP {status}")),
                Err(message) => (None, message),
            };
            let retry = attempts - 1;
            if retry >= config.retry_count {
                break failure;
            }
            self.sleeper.sleep(config.backoff_delay(retry));
        };
        WebhookDelivery {
            url: config.url.clone(),
            success: false,
            status_code,
            attempts,
            error: Some(error),
        }
    }
}

impl fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookNotifier").field("endpoints", &self.endpoints).finish_non_exhaustive()
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.url.host_str())
            .field("events", &self.config.events)
            .field("retry_count", &self.config.retry_count)
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    /// Validates a configuration and builds its client.
    fn new(config: WebhookConfig) -> Result<Self, WebhookError> {
        let url = config.validate()?;
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| WebhookError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| WebhookError::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("release-gate/0.1")
            .redirect(Policy::none())
            .build()
            .map_err(|err| WebhookError::Setup(format!("http client build failed: {err}")))?;
        Ok(Self {
            config,
            url,
            headers,
            client,
        })
    }

    /// Sends one attempt and returns the HTTP status.
    fn post(&self, payload: &[u8]) -> Result<u16, String> {
        let response = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    "webhook request timed out".to_string()
                } else {
                    sanitize_error_summary(&format!(
                        "webhook connection failed: {}",
                        err.without_url()
                    ))
                }
            })?;
        Ok(response.status().as_u16())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
