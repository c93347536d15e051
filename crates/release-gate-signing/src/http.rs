// crates/release-gate-signing/src/http.rs
// ============================================================================
// Module: Signing Service HTTP
// Description: Bounded JSON-over-HTTP client shared by signing services.
// Purpose: Reach the certificate authority, transparency log, and token endpoint.
// Dependencies: reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! Every request has a timeout and a response size cap, redirects are not
//! followed, and URLs with embedded credentials or cleartext schemes (unless
//! allowed) are rejected. Connect errors, timeouts, 429, and 5xx answers map
//! to [`SigningError::Unavailable`]; other failures are attributed to the
//! service that produced them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::SigningError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Connection settings for a signing service endpoint.
///
/// # Invariants
/// - `allow_http = false` rejects cleartext `http://` URLs.
/// - `max_response_bytes` bounds every response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Service base URL.
    pub url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Allow cleartext HTTP.
    pub allow_http: bool,
    /// Maximum response size in bytes.
    pub max_response_bytes: usize,
}

impl ServiceEndpoint {
    /// Creates an endpoint with default limits.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: 10_000,
            allow_http: false,
            max_response_bytes: 1024 * 1024,
        }
    }
}

/// Service a request is addressed to, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ServiceKind {
    /// Certificate authority.
    CertificateAuthority,
    /// Transparency log.
    TransparencyLog,
    /// OIDC token endpoint.
    IdentityProvider,
}

impl ServiceKind {
    /// Returns the human label.
    const fn label(self) -> &'static str {
        match self {
            Self::CertificateAuthority => "certificate authority",
            Self::TransparencyLog => "transparency log",
            Self::IdentityProvider => "identity provider",
        }
    }

    /// Builds the error for a rejected or malformed answer.
    fn rejected(self, message: String) -> SigningError {
        match self {
            Self::CertificateAuthority => SigningError::CertificateAuthority(message),
            Self::TransparencyLog => SigningError::TransparencyLog(message),
            Self::IdentityProvider => SigningError::InvalidToken(message),
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// JSON client bound to one service base URL.
#[derive(Debug, Clone)]
pub(crate) struct ServiceClient {
    /// Service attribution for errors.
    kind: ServiceKind,
    /// Base URL with a trailing slash.
    base: Url,
    /// HTTP client.
    client: Client,
    /// Response size cap.
    max_response_bytes: usize,
}

impl ServiceClient {
    /// Builds a client for `endpoint`.
    pub(crate) fn new(kind: ServiceKind, endpoint: &ServiceEndpoint) -> Result<Self, SigningError> {
        let base = parse_service_url(kind, &endpoint.url, endpoint.allow_http)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(endpoint.timeout_ms))
            .user_agent("release-gate/0.1")
            .redirect(Policy::none())
            .build()
            .map_err(|_| kind.rejected("http client build failed".to_string()))?;
        Ok(Self {
            kind,
            base,
            client,
            max_response_bytes: endpoint.max_response_bytes,
        })
    }

    /// POSTs `body` as JSON to `path` (relative to the base) and decodes the answer.
    pub(crate) fn post_json<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &Req,
    ) -> Result<Resp, SigningError> {
        let url = self
            .base
            .join(path)
            .map_err(|_| self.kind.rejected(format!("invalid {} path {path}", self.kind.label())))?;
        let payload = serde_json::to_vec(body)
            .map_err(|err| SigningError::Encoding(format!("request encoding failed: {err}")))?;
        let request =
            self.client.post(url).header(CONTENT_TYPE, "application/json").body(payload);
        self.exchange(request, bearer)
    }

    /// GETs `url` and decodes the JSON answer.
    pub(crate) fn get_json<Resp: DeserializeOwned>(
        &self,
        url: Url,
        bearer: Option<&str>,
    ) -> Result<Resp, SigningError> {
        self.exchange(self.client.get(url), bearer)
    }

    /// Sends a request and decodes a successful JSON response.
    fn exchange<Resp: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        bearer: Option<&str>,
    ) -> Result<Resp, SigningError> {
        let request = request.header(ACCEPT, "application/json");
        let request = match bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let label = self.kind.label();
        let mut response = request.send().map_err(|err| {
            if err.is_timeout() {
                SigningError::Unavailable(format!("{label} request timed out"))
            } else {
                SigningError::Unavailable(format!("{label} connection failed"))
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.status_error(status));
        }
        let bytes = read_response_limited(&mut response, self.max_response_bytes)
            .map_err(|message| self.kind.rejected(format!("{label} {message}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|err| self.kind.rejected(format!("invalid {label} response: {err}")))
    }

    /// Maps a non-success status.
    fn status_error(&self, status: StatusCode) -> SigningError {
        let label = self.kind.label();
        match status.as_u16() {
            429 | 500 ..= 599 => SigningError::Unavailable(format!("{label} returned HTTP {status}")),
            _ => self.kind.rejected(format!("{label} returned HTTP {status}")),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and validates a service URL, ensuring a trailing slash.
pub(crate) fn parse_service_url(
    kind: ServiceKind,
    value: &str,
    allow_http: bool,
) -> Result<Url, SigningError> {
    let label = kind.label();
    let mut url =
        Url::parse(value).map_err(|_| kind.rejected(format!("invalid {label} url")))?;
    match url.scheme() {
        "https" => {}
        "http" if allow_http => {}
        other => return Err(kind.rejected(format!("{label} url scheme {other} not allowed"))),
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(kind.rejected(format!("{label} url credentials are not allowed")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, String> {
    let max_bytes_u64 =
        u64::try_from(max_bytes).map_err(|_| "size limit exceeds u64".to_string())?;
    if response.content_length().is_some_and(|expected| expected > max_bytes_u64) {
        return Err("response exceeds size limit".to_string());
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|_| "response could not be read".to_string())?;
    if buf.len() > max_bytes {
        return Err("response exceeds size limit".to_string());
    }
    Ok(buf)
}
