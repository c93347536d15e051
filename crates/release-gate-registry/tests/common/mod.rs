// crates/release-gate-registry/tests/common/mod.rs
// ============================================================================
// Module: Fake OCI Registry
// Description: Minimal in-process OCI distribution server for client tests.
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are used by a subset of test binaries.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures unwrap deterministic values."
)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use release_gate_core::Digest;
use release_gate_registry::OciRegistryClient;
use release_gate_registry::OciRegistryConfig;
use tiny_http::Header;
use tiny_http::Method;
use tiny_http::Request;
use tiny_http::Response;
use tiny_http::Server;

/// Repository served by the fake registry.
pub const REPOSITORY: &str = "team/app";

/// Stored registry contents and request log.
#[derive(Debug, Default)]
pub struct FakeState {
    /// Blobs keyed by digest.
    pub blobs: HashMap<String, Vec<u8>>,
    /// Manifests keyed by digest: (media type, body).
    pub manifests: HashMap<String, (String, Vec<u8>)>,
    /// Tag to manifest digest.
    pub tags: HashMap<String, String>,
    /// `METHOD path` for every request received.
    pub requests: Vec<String>,
    /// Status returned for every request when set.
    pub forced_status: Option<u16>,
    /// Next upload session id.
    next_upload: u64,
}

/// Fake registry bound to an ephemeral local port.
pub struct FakeRegistry {
    /// Base URL, e.g. `http://127.0.0.1:PORT`.
    pub url: String,
    /// Shared state inspected by tests.
    pub state: Arc<Mutex<FakeState>>,
    /// Server handle used to stop the accept loop.
    server: Arc<Server>,
}

impl FakeRegistry {
    pub fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let state = Arc::new(Mutex::new(FakeState::default()));
        let loop_server = Arc::clone(&server);
        let loop_state = Arc::clone(&state);
        thread::spawn(move || {
            for mut request in loop_server.incoming_requests() {
                let response = handle(&loop_state, &mut request);
                let _ = request.respond(response);
            }
        });
        Self {
            url: format!("http://{addr}"),
            state,
            server,
        }
    }

    pub fn client(&self) -> OciRegistryClient {
        OciRegistryClient::new(self.config()).unwrap()
    }

    pub fn config(&self) -> OciRegistryConfig {
        OciRegistryConfig {
            allow_http: true,
            timeout_ms: 5_000,
            ..OciRegistryConfig::new(self.url.clone(), REPOSITORY)
        }
    }

    pub fn set_forced_status(&self, status: Option<u16>) {
        self.state.lock().unwrap().forced_status = status;
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, request: &str) -> usize {
        self.requests().iter().filter(|seen| seen.as_str() == request).count()
    }

    pub fn tag_digest(&self, tag: &str) -> Option<String> {
        self.state.lock().unwrap().tags.get(tag).cloned()
    }

    /// Returns the parsed manifest stored under a tag.
    pub fn manifest_json(&self, tag: &str) -> Option<serde_json::Value> {
        let state = self.state.lock().unwrap();
        let digest = state.tags.get(tag)?;
        let (_, body) = state.manifests.get(digest)?;
        serde_json::from_slice(body).ok()
    }
}

impl Drop for FakeRegistry {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

fn header(name: &str, value: &str) -> Header {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap()
}

fn reply(status: u16, body: Vec<u8>) -> Response<Cursor<Vec<u8>>> {
    Response::from_data(body).with_status_code(status)
}

fn handle(state: &Mutex<FakeState>, request: &mut Request) -> Response<Cursor<Vec<u8>>> {
    let method = request.method().clone();
    let url = request.url().to_string();
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path.to_string(), query.to_string()),
        None => (url.clone(), String::new()),
    };
    let content_type = request
        .headers()
        .iter()
        .find(|header| header.field.equiv("Content-Type"))
        .map(|header| header.value.as_str().to_string())
        .unwrap_or_default();
    let mut body = Vec::new();
    let _ = request.as_reader().read_to_end(&mut body);

    let mut state = state.lock().unwrap();
    state.requests.push(format!("{} {path}", method.as_str()));
    if let Some(status) = state.forced_status {
        return reply(status, Vec::new());
    }
    let Some(rest) = path.strip_prefix(&format!("/v2/{REPOSITORY}/")) else {
        return reply(404, Vec::new());
    };

    if rest == "blobs/uploads/" && method == Method::Post {
        state.next_upload += 1;
        let location = format!("/v2/{REPOSITORY}/blobs/uploads/{}", state.next_upload);
        return reply(202, Vec::new()).with_header(header("Location", &location));
    }
    if rest.starts_with("blobs/uploads/") && method == Method::Put {
        let digest = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("digest="))
            .map(|value| value.replace("%3A", ":").replace("%3a", ":"))
            .unwrap_or_default();
        if Digest::of_bytes(&body).as_str() != digest {
            return reply(400, b"digest mismatch".to_vec());
        }
        state.blobs.insert(digest.clone(), body);
        return reply(201, Vec::new()).with_header(header("Docker-Content-Digest", &digest));
    }
    if let Some(digest) = rest.strip_prefix("blobs/") {
        return match state.blobs.get(digest) {
            Some(blob) if method == Method::Get => reply(200, blob.clone()),
            Some(_) => reply(200, Vec::new()),
            None => reply(404, Vec::new()),
        };
    }
    if let Some(reference) = rest.strip_prefix("manifests/") {
        if method == Method::Put {
            let digest = Digest::of_bytes(&body).as_str().to_string();
            state.manifests.insert(digest.clone(), (content_type, body));
            if !reference.starts_with("sha256:") {
                state.tags.insert(reference.to_string(), digest.clone());
            }
            return reply(201, Vec::new()).with_header(header("Docker-Content-Digest", &digest));
        }
        let digest = if reference.starts_with("sha256:") {
            Some(reference.to_string())
        } else {
            state.tags.get(reference).cloned()
        };
        let Some((media_type, manifest)) =
            digest.as_ref().and_then(|digest| state.manifests.get(digest)).cloned()
        else {
            return reply(404, Vec::new());
        };
        let payload = if method == Method::Get { manifest } else { Vec::new() };
        return reply(200, payload)
            .with_header(header("Content-Type", &media_type))
            .with_header(header("Docker-Content-Digest", digest.as_deref().unwrap_or_default()));
    }
    reply(404, Vec::new())
}
