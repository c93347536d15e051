// crates/release-gate-signing/tests/common/mod.rs
// ============================================================================
// Module: Signing Test Fixtures
// Description: Identity tokens, fixed clocks, and fake signing services.
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are used by a subset of test binaries.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures unwrap deterministic values."
)]

use std::io::Cursor;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::SigningKey;
use release_gate_core::Clock;
use release_gate_core::Timestamp;
use release_gate_signing::CertificateAuthority;
use release_gate_signing::CertificateRequest;
use release_gate_signing::IdentityToken;
use release_gate_signing::InMemoryTransparencyLog;
use release_gate_signing::LocalCertificateAuthority;
use release_gate_signing::LogEntryRequest;
use release_gate_signing::ServiceEndpoint;
use release_gate_signing::StaticTokenSource;
use release_gate_signing::TransparencyLog;
use release_gate_signing::TrustRoot;
use serde::Deserialize;
use tiny_http::Header;
use tiny_http::Method;
use tiny_http::Request;
use tiny_http::Response;
use tiny_http::Server;

pub const ISSUER: &str = "https://token.actions.githubusercontent.com";
pub const SUBJECT: &str = "release-bot@acme.dev";
pub const T0: i64 = 1_700_000_000_000;
/// Bearer credential the fake token endpoint expects.
pub const REQUEST_TOKEN: &str = "gha-request-token";

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_millis(self.0)
    }
}

/// Builds an unsigned compact JWT carrying `iss` and `email`.
pub fn jwt(issuer: &str, email: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD
        .encode(format!(r#"{{"iss":"{issuer}","sub":"repo:acme/app","email":"{email}"}}"#));
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

pub fn token_source() -> StaticTokenSource {
    StaticTokenSource::new(jwt(ISSUER, SUBJECT)).unwrap()
}

pub fn authority_key() -> SigningKey {
    SigningKey::from_bytes(&[11; 32])
}

pub fn log_key() -> SigningKey {
    SigningKey::from_bytes(&[12; 32])
}

pub fn local_authority() -> LocalCertificateAuthority {
    LocalCertificateAuthority::new(authority_key()).with_clock(FixedClock(T0))
}

pub fn local_log() -> InMemoryTransparencyLog {
    InMemoryTransparencyLog::new(log_key(), "log.release-gate.test").with_clock(FixedClock(T0))
}

/// Trust root for [`local_authority`] and [`local_log`].
pub fn keyless_trust() -> TrustRoot {
    TrustRoot::new()
        .with_certificate_authority(authority_key().verifying_key())
        .with_transparency_log(log_key().verifying_key())
}

// ============================================================================
// SECTION: Fake Signing Services
// ============================================================================

/// Certificate request body as sent over HTTP.
#[derive(Debug, Deserialize)]
struct CertificateBody {
    public_key: String,
    proof_of_possession: String,
}

/// Request log and failure injection.
#[derive(Debug, Default)]
pub struct ServiceState {
    /// `METHOD url` for every request received.
    pub requests: Vec<String>,
    /// Authorization header values received.
    pub authorizations: Vec<String>,
    /// Status returned for every request when set.
    pub forced_status: Option<u16>,
}

/// Certificate authority, transparency log, and CI token endpoint on one port.
pub struct FakeSigningServices {
    /// Base URL, e.g. `http://127.0.0.1:PORT`.
    pub url: String,
    /// Shared state inspected by tests.
    pub state: Arc<Mutex<ServiceState>>,
    /// Server handle used to stop the accept loop.
    server: Arc<Server>,
}

impl FakeSigningServices {
    pub fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let state = Arc::new(Mutex::new(ServiceState::default()));
        let loop_server = Arc::clone(&server);
        let loop_state = Arc::clone(&state);
        thread::spawn(move || {
            let authority = local_authority();
            let log = local_log();
            for mut request in loop_server.incoming_requests() {
                let response = handle(&loop_state, &authority, &log, &mut request);
                let _ = request.respond(response);
            }
        });
        Self {
            url: format!("http://{addr}"),
            state,
            server,
        }
    }

    /// Endpoint for `path` with cleartext HTTP allowed.
    pub fn endpoint(&self, path: &str) -> ServiceEndpoint {
        ServiceEndpoint {
            allow_http: true,
            timeout_ms: 5_000,
            ..ServiceEndpoint::new(format!("{}{path}", self.url))
        }
    }

    pub fn set_forced_status(&self, status: Option<u16>) {
        self.state.lock().unwrap().forced_status = status;
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn authorizations(&self) -> Vec<String> {
        self.state.lock().unwrap().authorizations.clone()
    }
}

impl Drop for FakeSigningServices {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

fn reply(status: u16, body: impl Into<Vec<u8>>) -> Response<Cursor<Vec<u8>>> {
    let content_type = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
    Response::from_data(body.into()).with_status_code(status).with_header(content_type)
}

fn handle(
    state: &Mutex<ServiceState>,
    authority: &LocalCertificateAuthority,
    log: &InMemoryTransparencyLog,
    request: &mut Request,
) -> Response<Cursor<Vec<u8>>> {
    let url = request.url().to_string();
    let authorization = request
        .headers()
        .iter()
        .find(|header| header.field.equiv("Authorization"))
        .map(|header| header.value.as_str().to_string());
    let forced = {
        let mut state = state.lock().unwrap();
        state.requests.push(format!("{} {url}", request.method()));
        if let Some(value) = &authorization {
            state.authorizations.push(value.clone());
        }
        state.forced_status
    };
    if let Some(status) = forced {
        return reply(status, "{}");
    }
    let mut body = Vec::new();
    request.as_reader().read_to_end(&mut body).unwrap();
    let bearer = authorization.as_deref().and_then(|value| value.strip_prefix("Bearer "));

    match (request.method(), url.split_once('?').map_or(url.as_str(), |(path, _)| path)) {
        (Method::Post, "/ca/api/v1/certificates") => {
            let Some(token) = bearer.and_then(|raw| IdentityToken::parse(raw).ok()) else {
                return reply(401, r#"{"error":"missing identity token"}"#);
            };
            let Ok(body) = serde_json::from_slice::<CertificateBody>(&body) else {
                return reply(400, r#"{"error":"bad request"}"#);
            };
            let issued = authority.issue(&CertificateRequest {
                identity_token: token,
                public_key: body.public_key,
                proof_of_possession: body.proof_of_possession,
            });
            match issued {
                Ok(certificate) => reply(201, serde_json::to_vec(&certificate).unwrap()),
                Err(_) => reply(403, r#"{"error":"rejected"}"#),
            }
        }
        (Method::Post, "/tlog/api/v1/log/entries") => {
            let Ok(entry) = serde_json::from_slice::<LogEntryRequest>(&body) else {
                return reply(400, r#"{"error":"bad request"}"#);
            };
            match log.submit(&entry) {
                Ok(entry) => reply(201, serde_json::to_vec(&entry).unwrap()),
                Err(_) => reply(500, r#"{"error":"log failure"}"#),
            }
        }
        (Method::Get, "/oidc/token") => {
            if bearer != Some(REQUEST_TOKEN) || !url.contains("audience=sigstore") {
                return reply(403, r#"{"error":"forbidden"}"#);
            }
            reply(200, serde_json::json!({ "value": jwt(ISSUER, SUBJECT) }).to_string())
        }
        _ => reply(404, r#"{"error":"not found"}"#),
    }
}
