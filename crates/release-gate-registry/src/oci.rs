// crates/release-gate-registry/src/oci.rs
// ============================================================================
// Module: OCI Registry Client
// Description: Blocking OCI distribution API client implementing the transport.
// Purpose: Push, pull, tag, and annotate artifacts in an OCI registry.
// Dependencies: release-gate-core, reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! Artifacts are stored as single-layer OCI artifact manifests with the empty
//! config blob `{}` and `artifactType` [`ARTIFACT_TYPE`]. Annotation maps live
//! in a sidecar manifest tagged `<tag>.annotations` whose `annotations` field
//! holds the map, so writing annotations never changes the digest a tag
//! points at.
//!
//! Status mapping:
//! - 404 -> [`RegistryError::NotFound`]
//! - 401/403 -> [`RegistryError::Unauthorized`]
//! - 429/5xx, connect errors, timeouts -> [`RegistryError::Unavailable`]
//! - anything else -> [`RegistryError::Protocol`]
//!
//! [`RegistryTransport::reserve_tag`] is a HEAD followed by a PUT; the
//! distribution API has no conditional tag create, so two processes racing
//! on the same tag may both observe it as absent. `push` and `tag_artifact`
//! run the same check before writing a semantic-version tag and fail with
//! [`RegistryError::ImmutableTag`] instead of moving it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::time::Duration;

use release_gate_core::Artifact;
use release_gate_core::Digest;
use release_gate_core::LayerDescriptor;
use release_gate_core::ManifestRecord;
use release_gate_core::RegistryError;
use release_gate_core::RegistryTransport;
use release_gate_core::TagName;
use release_gate_core::TagReservation;
use release_gate_core::is_immutable_tag;
use release_gate_core::runtime::registry::OCI_MANIFEST_MEDIA_TYPE;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `artifactType` of pushed release artifacts.
pub const ARTIFACT_TYPE: &str = "application/vnd.release-gate.artifact.v1";
/// `artifactType` of annotation sidecar manifests.
pub const ANNOTATIONS_ARTIFACT_TYPE: &str = "application/vnd.release-gate.annotations.v1";
/// Suffix appended to a tag to name its annotation sidecar.
pub const ANNOTATION_SIDECAR_SUFFIX: &str = ".annotations";
/// Media type of the empty config blob.
pub const EMPTY_MEDIA_TYPE: &str = "application/vnd.oci.empty.v1+json";
/// Content of the empty config blob.
const EMPTY_BLOB: &[u8] = b"{}";
/// Header carrying the registry-computed manifest digest.
const DIGEST_HEADER: &str = "Docker-Content-Digest";
/// Redirects followed for blob downloads served from external storage.
const MAX_REDIRECTS: usize = 5;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for [`OciRegistryClient`].
///
/// # Invariants
/// - `allow_http = false` rejects cleartext `http://` base URLs.
/// - Credentials are read from the named environment variables at
///   construction; both names must be set together.
/// - `max_response_bytes` bounds every manifest and blob download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OciRegistryConfig {
    /// Registry base URL, e.g. `https://registry.example.com`.
    pub base_url: String,
    /// Repository path, e.g. `team/service`.
    pub repository: String,
    /// Allow cleartext HTTP.
    pub allow_http: bool,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size in bytes.
    pub max_response_bytes: usize,
    /// User agent for outbound requests.
    pub user_agent: String,
    /// Environment variable holding the basic-auth username.
    pub username_env: Option<String>,
    /// Environment variable holding the basic-auth password.
    pub password_env: Option<String>,
}

impl OciRegistryConfig {
    /// Creates a configuration with default limits for `repository` at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            repository: repository.into(),
            allow_http: false,
            timeout_ms: 10_000,
            max_response_bytes: 64 * 1024 * 1024,
            user_agent: "release-gate/0.1".to_string(),
            username_env: None,
            password_env: None,
        }
    }
}

/// Basic-auth credentials resolved from the environment.
struct Credentials {
    /// Username.
    username: String,
    /// Password.
    password: String,
}

// ============================================================================
// SECTION: Wire Model
// ============================================================================

/// OCI image manifest as exchanged with the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OciManifest {
    /// Always 2.
    schema_version: u32,
    /// Manifest media type.
    #[serde(default)]
    media_type: String,
    /// Artifact type for OCI 1.1 artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    artifact_type: Option<String>,
    /// Config descriptor.
    config: OciDescriptor,
    /// Layer descriptors.
    #[serde(default)]
    layers: Vec<OciDescriptor>,
    /// Manifest annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    annotations: BTreeMap<String, String>,
}

/// OCI content descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OciDescriptor {
    /// Content media type.
    media_type: String,
    /// Content digest.
    digest: String,
    /// Content size in bytes.
    size: u64,
}

impl OciDescriptor {
    /// Descriptor of the empty `{}` blob.
    fn empty() -> Self {
        Self {
            media_type: EMPTY_MEDIA_TYPE.to_string(),
            digest: Digest::of_bytes(EMPTY_BLOB).to_string(),
            size: 2,
        }
    }
}

/// Manifest body plus its verified digest.
struct FetchedManifest {
    /// Digest of `body`.
    digest: Digest,
    /// Raw manifest bytes.
    body: Vec<u8>,
    /// Parsed manifest.
    manifest: OciManifest,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// OCI distribution API client.
pub struct OciRegistryClient {
    /// Base URL with a trailing slash.
    base: Url,
    /// Client configuration.
    config: OciRegistryConfig,
    /// HTTP client.
    client: Client,
    /// Optional basic-auth credentials.
    credentials: Option<Credentials>,
}

impl fmt::Debug for OciRegistryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OciRegistryClient")
            .field("base", &self.base.as_str())
            .field("repository", &self.config.repository)
            .field("authenticated", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl OciRegistryClient {
    /// Builds a client.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Protocol`] for an unusable URL, repository, or
    /// HTTP client and [`RegistryError::Unauthorized`] when a named credential
    /// variable is not set.
    pub fn new(config: OciRegistryConfig) -> Result<Self, RegistryError> {
        let base = parse_base_url(&config)?;
        validate_repository(&config.repository)?;
        let credentials = resolve_credentials(&config)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|_| RegistryError::Protocol("registry http client build failed".to_string()))?;
        Ok(Self {
            base,
            config,
            client,
            credentials,
        })
    }

    /// Returns the repository this client addresses.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.config.repository
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    /// Builds a repository-scoped endpoint URL.
    fn endpoint(&self, suffix: &str) -> Result<Url, RegistryError> {
        self.base
            .join(&format!("v2/{}/{suffix}", self.config.repository))
            .map_err(|_| RegistryError::Protocol(format!("invalid registry endpoint {suffix}")))
    }

    /// Returns the manifest URL for a tag or digest.
    fn manifest_url(&self, reference: &str) -> Result<Url, RegistryError> {
        self.endpoint(&format!("manifests/{reference}"))
    }

    /// Returns the blob URL for a digest.
    fn blob_url(&self, digest: &Digest) -> Result<Url, RegistryError> {
        self.endpoint(&format!("blobs/{digest}"))
    }

    /// Attaches credentials and sends a request.
    fn send(&self, request: RequestBuilder) -> Result<Response, RegistryError> {
        let request = match &self.credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => request,
        };
        request.send().map_err(|err| {
            if err.is_builder() {
                RegistryError::Protocol("invalid registry request".to_string())
            } else if err.is_timeout() {
                RegistryError::Unavailable("registry request timed out".to_string())
            } else {
                RegistryError::Unavailable("registry connection failed".to_string())
            }
        })
    }

    // ------------------------------------------------------------------------
    // Blobs
    // ------------------------------------------------------------------------

    /// Returns true when the blob already exists.
    fn blob_exists(&self, digest: &Digest) -> Result<bool, RegistryError> {
        let response = self.send(self.client.head(self.blob_url(digest)?))?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(status_error(status, digest.as_str())),
        }
    }

    /// Uploads a blob with a monolithic POST-then-PUT unless it already exists.
    fn upload_blob(&self, bytes: &[u8], digest: &Digest) -> Result<(), RegistryError> {
        if self.blob_exists(digest)? {
            return Ok(());
        }
        let started = self.send(self.client.post(self.endpoint("blobs/uploads/")?))?;
        if started.status() != StatusCode::ACCEPTED {
            return Err(status_error(started.status(), "blob upload"));
        }
        let location = started
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                RegistryError::Protocol("blob upload response has no Location header".to_string())
            })?;
        let mut target = self
            .base
            .join(location)
            .map_err(|_| RegistryError::Protocol("invalid blob upload location".to_string()))?;
        target.query_pairs_mut().append_pair("digest", digest.as_str());
        let finished = self.send(
            self.client
                .put(target)
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(bytes.to_vec()),
        )?;
        if !finished.status().is_success() {
            return Err(status_error(finished.status(), "blob upload"));
        }
        Ok(())
    }

    /// Downloads and verifies a blob.
    fn download_blob(&self, digest: &Digest) -> Result<Vec<u8>, RegistryError> {
        let response = self.send(self.client.get(self.blob_url(digest)?))?;
        let mut response = expect_success(response, digest.as_str())?;
        let bytes = read_response_limited(&mut response, self.config.max_response_bytes)?;
        if Digest::of_bytes(&bytes) != *digest {
            return Err(RegistryError::Protocol(format!("blob content does not match {digest}")));
        }
        Ok(bytes)
    }

    // ------------------------------------------------------------------------
    // Manifests
    // ------------------------------------------------------------------------

    /// Fetches and parses a manifest by tag or digest.
    fn fetch_manifest(&self, reference: &str) -> Result<FetchedManifest, RegistryError> {
        let response = self.send(
            self.client.get(self.manifest_url(reference)?).header(ACCEPT, OCI_MANIFEST_MEDIA_TYPE),
        )?;
        let mut response = expect_success(response, reference)?;
        let announced = digest_header(&response);
        let body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        let digest = Digest::of_bytes(&body);
        if announced.is_some_and(|announced| announced != digest) {
            return Err(RegistryError::Protocol(format!(
                "manifest digest for {reference} does not match its content"
            )));
        }
        let manifest: OciManifest = serde_json::from_slice(&body).map_err(|err| {
            RegistryError::Protocol(format!("invalid manifest for {reference}: {err}"))
        })?;
        Ok(FetchedManifest {
            digest,
            body,
            manifest,
        })
    }

    /// Uploads a manifest under `reference` and returns its digest.
    fn put_manifest(
        &self,
        reference: &str,
        body: Vec<u8>,
        media_type: &str,
    ) -> Result<Digest, RegistryError> {
        let computed = Digest::of_bytes(&body);
        let response = self.send(
            self.client.put(self.manifest_url(reference)?).header(CONTENT_TYPE, media_type).body(body),
        )?;
        let response = expect_success(response, reference)?;
        Ok(digest_header(&response).unwrap_or(computed))
    }

    /// Serializes and uploads a manifest.
    fn put_oci_manifest(
        &self,
        reference: &str,
        manifest: &OciManifest,
    ) -> Result<Digest, RegistryError> {
        let body = serde_json::to_vec(manifest)
            .map_err(|err| RegistryError::Protocol(format!("manifest encoding failed: {err}")))?;
        self.put_manifest(reference, body, OCI_MANIFEST_MEDIA_TYPE)
    }

    // ------------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------------

    /// Returns the digest a tag resolves to, or `None` when it is absent.
    fn existing_tag(&self, tag: &TagName) -> Result<Option<Digest>, RegistryError> {
        let response = self.send(
            self.client.head(self.manifest_url(tag.as_str())?).header(ACCEPT, OCI_MANIFEST_MEDIA_TYPE),
        )?;
        match response.status() {
            status if status.is_success() => match digest_header(&response) {
                Some(existing) => Ok(Some(existing)),
                None => Ok(Some(self.fetch_manifest(tag.as_str())?.digest)),
            },
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(status_error(status, tag.as_str())),
        }
    }

    /// Rejects moving a write-once tag; returns true when it already points
    /// at `digest`. Mutable tags are not checked.
    fn check_write_once(&self, tag: &TagName, digest: &Digest) -> Result<bool, RegistryError> {
        if !is_immutable_tag(tag) {
            return Ok(false);
        }
        match self.existing_tag(tag)? {
            Some(existing) if existing == *digest => Ok(true),
            Some(existing) => Err(RegistryError::ImmutableTag {
                tag: tag.clone(),
                existing_digest: existing,
            }),
            None => Ok(false),
        }
    }

    /// Copies the manifest stored under `digest` to `tag`.
    fn write_tag(&self, digest: &Digest, tag: &TagName) -> Result<(), RegistryError> {
        let fetched = self.fetch_manifest(digest.as_str())?;
        if fetched.digest != *digest {
            return Err(RegistryError::Protocol(format!("registry served wrong manifest for {digest}")));
        }
        let media_type = if fetched.manifest.media_type.is_empty() {
            OCI_MANIFEST_MEDIA_TYPE.to_string()
        } else {
            fetched.manifest.media_type
        };
        self.put_manifest(tag.as_str(), fetched.body, &media_type)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

impl RegistryTransport for OciRegistryClient {
    fn push(&self, artifact: &Artifact, tag: &TagName) -> Result<Digest, RegistryError> {
        let layer_digest = artifact.digest();
        let size = u64::try_from(artifact.bytes.len())
            .map_err(|_| RegistryError::Protocol("artifact size exceeds u64".to_string()))?;
        let manifest = OciManifest {
            schema_version: 2,
            media_type: OCI_MANIFEST_MEDIA_TYPE.to_string(),
            artifact_type: Some(ARTIFACT_TYPE.to_string()),
            config: OciDescriptor::empty(),
            layers: vec![OciDescriptor {
                media_type: artifact.media_type.clone(),
                digest: layer_digest.to_string(),
                size,
            }],
            annotations: BTreeMap::new(),
        };
        let body = serde_json::to_vec(&manifest)
            .map_err(|err| RegistryError::Protocol(format!("manifest encoding failed: {err}")))?;
        let digest = Digest::of_bytes(&body);
        if self.check_write_once(tag, &digest)? {
            return Ok(digest);
        }
        self.upload_blob(EMPTY_BLOB, &Digest::of_bytes(EMPTY_BLOB))?;
        self.upload_blob(&artifact.bytes, &layer_digest)?;
        self.put_manifest(tag.as_str(), body, OCI_MANIFEST_MEDIA_TYPE)
    }

    fn pull(&self, tag: &TagName) -> Result<Artifact, RegistryError> {
        let fetched = self.fetch_manifest(tag.as_str())?;
        let layer = fetched.manifest.layers.first().ok_or_else(|| {
            RegistryError::Protocol(format!("manifest for {tag} has no layers"))
        })?;
        let digest = parse_digest(&layer.digest)?;
        let bytes = self.download_blob(&digest)?;
        Ok(Artifact {
            media_type: layer.media_type.clone(),
            bytes,
        })
    }

    fn get_manifest(&self, tag: &TagName) -> Result<ManifestRecord, RegistryError> {
        let fetched = self.fetch_manifest(tag.as_str())?;
        let layers = fetched
            .manifest
            .layers
            .iter()
            .map(|layer| {
                Ok(LayerDescriptor {
                    media_type: layer.media_type.clone(),
                    digest: parse_digest(&layer.digest)?,
                    size: layer.size,
                })
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;
        let annotations = self.read_annotations(tag)?;
        let media_type = if fetched.manifest.media_type.is_empty() {
            OCI_MANIFEST_MEDIA_TYPE.to_string()
        } else {
            fetched.manifest.media_type
        };
        Ok(ManifestRecord {
            digest: fetched.digest,
            media_type,
            annotations,
            layers,
        })
    }

    fn tag_artifact(&self, digest: &Digest, tag: &TagName) -> Result<(), RegistryError> {
        if self.check_write_once(tag, digest)? {
            return Ok(());
        }
        self.write_tag(digest, tag)
    }

    fn read_annotations(&self, tag: &TagName) -> Result<BTreeMap<String, String>, RegistryError> {
        let sidecar = sidecar_tag(tag)?;
        match self.fetch_manifest(sidecar.as_str()) {
            Ok(fetched) => Ok(fetched.manifest.annotations),
            Err(RegistryError::NotFound(_)) => Ok(BTreeMap::new()),
            Err(err) => Err(err),
        }
    }

    fn write_annotations(
        &self,
        tag: &TagName,
        annotations: &BTreeMap<String, String>,
    ) -> Result<(), RegistryError> {
        let sidecar = sidecar_tag(tag)?;
        self.upload_blob(EMPTY_BLOB, &Digest::of_bytes(EMPTY_BLOB))?;
        let manifest = OciManifest {
            schema_version: 2,
            media_type: OCI_MANIFEST_MEDIA_TYPE.to_string(),
            artifact_type: Some(ANNOTATIONS_ARTIFACT_TYPE.to_string()),
            config: OciDescriptor::empty(),
            layers: vec![OciDescriptor::empty()],
            annotations: annotations.clone(),
        };
        self.put_oci_manifest(sidecar.as_str(), &manifest)?;
        Ok(())
    }

    fn reserve_tag(&self, digest: &Digest, tag: &TagName) -> Result<TagReservation, RegistryError> {
        if let Some(existing) = self.existing_tag(tag)? {
            return Ok(TagReservation::Existing(existing));
        }
        self.write_tag(digest, tag)?;
        Ok(TagReservation::Created)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and validates the base URL, ensuring a trailing slash.
fn parse_base_url(config: &OciRegistryConfig) -> Result<Url, RegistryError> {
    let mut url = Url::parse(&config.base_url)
        .map_err(|_| RegistryError::Protocol("invalid registry url".to_string()))?;
    match url.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        other => {
            return Err(RegistryError::Protocol(format!("registry url scheme {other} not allowed")));
        }
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(RegistryError::Protocol("registry url credentials are not allowed".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Validates an OCI repository path (`[a-z0-9]+([._-][a-z0-9]+)*` per component).
fn validate_repository(repository: &str) -> Result<(), RegistryError> {
    let valid_component = |component: &str| {
        let bytes = component.as_bytes();
        !bytes.is_empty()
            && bytes.first().is_some_and(u8::is_ascii_alphanumeric)
            && bytes.last().is_some_and(u8::is_ascii_alphanumeric)
            && bytes.iter().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b"._-".contains(b))
    };
    if repository.is_empty() || !repository.split('/').all(valid_component) {
        return Err(RegistryError::Protocol(format!("invalid repository name {repository}")));
    }
    Ok(())
}

/// Reads basic-auth credentials from the configured environment variables.
fn resolve_credentials(config: &OciRegistryConfig) -> Result<Option<Credentials>, RegistryError> {
    let (username_env, password_env) = match (&config.username_env, &config.password_env) {
        (None, None) => return Ok(None),
        (Some(user), Some(pass)) => (user, pass),
        _ => {
            return Err(RegistryError::Protocol(
                "registry credentials need both username and password variables".to_string(),
            ));
        }
    };
    let read = |name: &str| {
        std::env::var(name).map_err(|_| {
            RegistryError::Unauthorized(format!("credential variable {name} is not set"))
        })
    };
    Ok(Some(Credentials {
        username: read(username_env)?,
        password: read(password_env)?,
    }))
}

/// Returns the annotation sidecar tag for `tag`.
fn sidecar_tag(tag: &TagName) -> Result<TagName, RegistryError> {
    TagName::parse(format!("{tag}{ANNOTATION_SIDECAR_SUFFIX}")).map_err(|_| {
        RegistryError::Protocol(format!("tag {tag} is too long for an annotation sidecar"))
    })
}

/// Parses a digest from a manifest descriptor.
fn parse_digest(value: &str) -> Result<Digest, RegistryError> {
    Digest::parse(value)
        .map_err(|_| RegistryError::Protocol(format!("manifest references invalid digest {value}")))
}

/// Reads the `Docker-Content-Digest` header, ignoring malformed values.
fn digest_header(response: &Response) -> Option<Digest> {
    response
        .headers()
        .get(DIGEST_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Digest::parse(value).ok())
}

/// Passes successful responses through and maps the rest to errors.
fn expect_success(response: Response, reference: &str) -> Result<Response, RegistryError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response.status(), reference))
    }
}

/// Maps an unexpected HTTP status to a registry error.
fn status_error(status: StatusCode, reference: &str) -> RegistryError {
    match status.as_u16() {
        404 => RegistryError::NotFound(reference.to_string()),
        401 | 403 => RegistryError::Unauthorized(format!("HTTP {status} for {reference}")),
        429 | 500 ..= 599 => RegistryError::Unavailable(format!("HTTP {status} for {reference}")),
        _ => RegistryError::Protocol(format!("unexpected HTTP {status} for {reference}")),
    }
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, RegistryError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| RegistryError::Protocol("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(RegistryError::Protocol("registry response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    let mut handle = response.take(max_bytes_u64.saturating_add(1));
    handle
        .read_to_end(&mut buf)
        .map_err(|_| RegistryError::Unavailable("failed to read registry response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(RegistryError::Protocol("registry response exceeds size limit".to_string()));
    }
    if let Some(expected) = expected_len {
        let expected = usize::try_from(expected)
            .map_err(|_| RegistryError::Protocol("invalid response length".to_string()))?;
        if buf.len() < expected {
            return Err(RegistryError::Unavailable("registry response truncated".to_string()));
        }
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
