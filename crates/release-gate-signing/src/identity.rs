// crates/release-gate-signing/src/identity.rs
// ============================================================================
// Module: Identity Tokens
// Description: OIDC identity token parsing and ambient token sources.
// Purpose: Obtain the identity a keyless signing certificate is bound to.
// Dependencies: base64, serde_json, reqwest
// ============================================================================

//! ## Overview
//! Keyless signing needs an OIDC identity token. Sources are tried in order:
//! an explicit `SIGSTORE_ID_TOKEN`, the GitHub Actions token request endpoint,
//! then an optional fallback such as [`InteractiveTokenSource`]. Token claims
//! are decoded without verifying the JWT signature; the certificate authority
//! is the party that authenticates the token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use url::Url;

use crate::error::SigningError;
use crate::http::ServiceClient;
use crate::http::ServiceEndpoint;
use crate::http::ServiceKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding an explicit identity token.
pub const SIGSTORE_ID_TOKEN_ENV: &str = "SIGSTORE_ID_TOKEN";
/// GitHub Actions OIDC request URL variable.
pub const GITHUB_TOKEN_URL_ENV: &str = "ACTIONS_ID_TOKEN_REQUEST_URL";
/// GitHub Actions OIDC request bearer token variable.
pub const GITHUB_TOKEN_REQUEST_ENV: &str = "ACTIONS_ID_TOKEN_REQUEST_TOKEN";
/// Audience requested from CI token endpoints.
pub const DEFAULT_AUDIENCE: &str = "sigstore";

// ============================================================================
// SECTION: Identity Token
// ============================================================================

/// Claims read from the JWT payload.
#[derive(Debug, Deserialize)]
struct TokenClaims {
    /// Issuer claim.
    iss: Option<String>,
    /// Subject claim.
    sub: Option<String>,
    /// Email claim, preferred as the certificate subject.
    email: Option<String>,
}

/// Parsed OIDC identity token.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityToken {
    /// Raw JWT.
    raw: String,
    /// Issuer claim.
    issuer: String,
    /// Email claim, else subject claim.
    subject: String,
}

impl IdentityToken {
    /// Parses a compact JWT and extracts issuer and subject.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidToken`] when the token is not a JWT or
    /// lacks an issuer or subject.
    pub fn parse(raw: impl Into<String>) -> Result<Self, SigningError> {
        let raw = raw.into().trim().to_string();
        let mut parts = raw.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SigningError::InvalidToken("token is not a compact JWT".to_string()));
        };
        let payload = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| SigningError::InvalidToken("token payload is not base64url".to_string()))?;
        let claims: TokenClaims = serde_json::from_slice(&payload)
            .map_err(|_| SigningError::InvalidToken("token payload is not json".to_string()))?;
        let issuer = claims
            .iss
            .filter(|iss| !iss.is_empty())
            .ok_or_else(|| SigningError::InvalidToken("token has no issuer".to_string()))?;
        let subject = claims
            .email
            .or(claims.sub)
            .filter(|subject| !subject.is_empty())
            .ok_or_else(|| SigningError::InvalidToken("token has no subject".to_string()))?;
        Ok(Self {
            raw,
            issuer,
            subject,
        })
    }

    /// Returns the raw JWT.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the issuer claim.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the certificate subject (email or `sub`).
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityToken")
            .field("issuer", &self.issuer)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Sources
// ============================================================================

/// Produces identity tokens for keyless signing.
pub trait IdentityTokenSource: Send + Sync {
    /// Returns a short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Returns a token, or `None` when this source has nothing to offer.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError`] when a token exists but cannot be obtained or parsed.
    fn fetch(&self) -> Result<Option<IdentityToken>, SigningError>;

    /// Returns a token or [`SigningError::NoIdentityToken`].
    ///
    /// # Errors
    ///
    /// Propagates [`IdentityTokenSource::fetch`] errors.
    fn require(&self) -> Result<IdentityToken, SigningError> {
        self.fetch()?.ok_or(SigningError::NoIdentityToken)
    }
}

/// Reads a token from an environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvTokenSource {
    /// Variable name.
    variable: String,
}

impl EnvTokenSource {
    /// Reads from `variable`.
    #[must_use]
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

impl Default for EnvTokenSource {
    fn default() -> Self {
        Self::new(SIGSTORE_ID_TOKEN_ENV)
    }
}

impl IdentityTokenSource for EnvTokenSource {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn fetch(&self) -> Result<Option<IdentityToken>, SigningError> {
        match env::var(&self.variable) {
            Ok(value) if !value.trim().is_empty() => IdentityToken::parse(value).map(Some),
            _ => Ok(None),
        }
    }
}

/// Token response from the GitHub Actions OIDC endpoint.
#[derive(Debug, Deserialize)]
struct GithubTokenResponse {
    /// Issued JWT.
    value: String,
}

/// Requests a token from the GitHub Actions OIDC endpoint.
///
/// Built with [`GithubActionsTokenSource::ambient`], the request URL and
/// bearer token are read from the runner environment at fetch time.
#[derive(Clone, PartialEq, Eq)]
pub struct GithubActionsTokenSource {
    /// Explicit request URL and bearer token; `None` reads the environment.
    request: Option<(String, String)>,
    /// Requested audience.
    audience: String,
    /// Request timeout in milliseconds.
    timeout_ms: u64,
    /// Allow cleartext HTTP endpoints.
    allow_http: bool,
}

impl GithubActionsTokenSource {
    /// Source reading `ACTIONS_ID_TOKEN_REQUEST_*` when fetched.
    #[must_use]
    pub fn ambient() -> Self {
        Self {
            request: None,
            audience: DEFAULT_AUDIENCE.to_string(),
            timeout_ms: 10_000,
            allow_http: false,
        }
    }

    /// Source using an explicit request URL and bearer token.
    #[must_use]
    pub fn new(request_url: impl Into<String>, request_token: impl Into<String>) -> Self {
        Self {
            request: Some((request_url.into(), request_token.into())),
            ..Self::ambient()
        }
    }

    /// Overrides the requested audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    /// Allows a cleartext HTTP request URL.
    #[must_use]
    pub const fn with_allow_http(mut self, allow_http: bool) -> Self {
        self.allow_http = allow_http;
        self
    }

    /// Resolves the request URL and bearer token.
    fn request(&self) -> Option<(String, String)> {
        if let Some(request) = &self.request {
            return Some(request.clone());
        }
        let url = env::var(GITHUB_TOKEN_URL_ENV).ok().filter(|value| !value.is_empty())?;
        let token = env::var(GITHUB_TOKEN_REQUEST_ENV).ok().filter(|value| !value.is_empty())?;
        Some((url, token))
    }
}

impl fmt::Debug for GithubActionsTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubActionsTokenSource")
            .field("explicit", &self.request.is_some())
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl IdentityTokenSource for GithubActionsTokenSource {
    fn name(&self) -> &'static str {
        "github-actions"
    }

    fn fetch(&self) -> Result<Option<IdentityToken>, SigningError> {
        let Some((request_url, request_token)) = self.request() else {
            return Ok(None);
        };
        let endpoint = ServiceEndpoint {
            timeout_ms: self.timeout_ms,
            allow_http: self.allow_http,
            ..ServiceEndpoint::new(request_url.clone())
        };
        let client = ServiceClient::new(ServiceKind::IdentityProvider, &endpoint)?;
        let mut url = Url::parse(&request_url)
            .map_err(|_| SigningError::InvalidToken("invalid token request url".to_string()))?;
        url.query_pairs_mut().append_pair("audience", &self.audience);
        let response: GithubTokenResponse = client.get_json(url, Some(&request_token))?;
        IdentityToken::parse(response.value).map(Some)
    }
}

/// Fixed token supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTokenSource {
    /// Parsed token.
    token: IdentityToken,
}

impl StaticTokenSource {
    /// Wraps a raw JWT.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidToken`] when the JWT cannot be parsed.
    pub fn new(raw: impl Into<String>) -> Result<Self, SigningError> {
        Ok(Self {
            token: IdentityToken::parse(raw)?,
        })
    }
}

impl IdentityTokenSource for StaticTokenSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn fetch(&self) -> Result<Option<IdentityToken>, SigningError> {
        Ok(Some(self.token.clone()))
    }
}

/// Prompts for a token and reads one line.
pub struct InteractiveTokenSource {
    /// Token input.
    input: Mutex<Box<dyn BufRead + Send>>,
    /// Prompt output.
    output: Mutex<Box<dyn Write + Send>>,
}

impl InteractiveTokenSource {
    /// Reads from `input` after writing a prompt to `output`.
    #[must_use]
    pub fn new(input: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// Prompts on stderr and reads stdin.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(Box::new(BufReader::new(io::stdin())), Box::new(io::stderr()))
    }
}

impl fmt::Debug for InteractiveTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractiveTokenSource").finish_non_exhaustive()
    }
}

impl IdentityTokenSource for InteractiveTokenSource {
    fn name(&self) -> &'static str {
        "interactive"
    }

    fn fetch(&self) -> Result<Option<IdentityToken>, SigningError> {
        let io_error = |_: io::Error| SigningError::InvalidToken("token prompt failed".to_string());
        {
            let mut output = self.output.lock().map_err(|_| {
                SigningError::InvalidToken("token prompt mutex poisoned".to_string())
            })?;
            output.write_all(b"Paste an OIDC identity token for signing: ").map_err(io_error)?;
            output.flush().map_err(io_error)?;
        }
        let mut line = String::new();
        self.input
            .lock()
            .map_err(|_| SigningError::InvalidToken("token input mutex poisoned".to_string()))?
            .read_line(&mut line)
            .map_err(io_error)?;
        if line.trim().is_empty() {
            return Ok(None);
        }
        IdentityToken::parse(line).map(Some)
    }
}

/// Ordered chain of token sources; the first source with a token wins.
pub struct AmbientTokenSource {
    /// Sources in priority order.
    sources: Vec<Box<dyn IdentityTokenSource>>,
}

impl AmbientTokenSource {
    /// Chains `sources` in order.
    #[must_use]
    pub fn new(sources: Vec<Box<dyn IdentityTokenSource>>) -> Self {
        Self {
            sources,
        }
    }

    /// `SIGSTORE_ID_TOKEN`, then GitHub Actions.
    #[must_use]
    pub fn ci() -> Self {
        Self::new(vec![
            Box::new(EnvTokenSource::default()),
            Box::new(GithubActionsTokenSource::ambient()),
        ])
    }

    /// Appends a lower-priority source.
    #[must_use]
    pub fn with_fallback(mut self, source: impl IdentityTokenSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Returns the source names in priority order.
    #[must_use]
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }
}

impl fmt::Debug for AmbientTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientTokenSource").field("sources", &self.source_names()).finish()
    }
}

impl IdentityTokenSource for AmbientTokenSource {
    fn name(&self) -> &'static str {
        "ambient"
    }

    fn fetch(&self) -> Result<Option<IdentityToken>, SigningError> {
        for source in &self.sources {
            if let Some(token) = source.fetch()? {
                return Ok(Some(token));
            }
        }
        Ok(None)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
