// crates/release-gate-config/src/config.rs
// ============================================================================
// Module: Release Gate Configuration
// Description: Configuration loading and validation for the release controller.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: release-gate-core, release-gate-notify, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys are rejected and every section is validated before the
//! configuration is returned, so a loaded [`ReleaseGateConfig`] always converts
//! into runtime components without further checks on shape or bounds.
//! Conversions that touch the filesystem (key files, audit and log files) live
//! in [`crate::runtime`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use release_gate_core::LifecycleEvent;
use release_gate_core::SignaturePolicy;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "release-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "RELEASE_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of environments in the chain.
pub const MAX_ENVIRONMENTS: usize = 64;
/// Maximum number of gates per environment.
pub const MAX_GATES_PER_ENVIRONMENT: usize = 64;
/// Maximum number of webhooks.
pub const MAX_WEBHOOKS: usize = 32;
/// Minimum outbound request timeout in milliseconds.
pub const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum outbound request timeout in milliseconds.
pub const MAX_TIMEOUT_MS: u64 = 300_000;
/// Maximum webhook retry count.
pub const MAX_RETRY_COUNT: u32 = release_gate_notify::MAX_RETRY_COUNT;
/// Maximum webhook backoff base in milliseconds.
pub const MAX_BACKOFF_BASE_MS: u64 = 60_000;
/// Maximum breaker reset timeout in milliseconds.
pub const MAX_RESET_TIMEOUT_MS: u64 = 3_600_000;
/// Maximum rollback index tried by the controller.
pub const MAX_ROLLBACK_INDEX: u32 = 100_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration or referenced files.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// A signing component could not be built.
    #[error("signing config error: {0}")]
    Signing(#[from] release_gate_signing::SigningError),
    /// A registry component could not be built.
    #[error("registry config error: {0}")]
    Registry(#[from] release_gate_core::RegistryError),
    /// A webhook component could not be built.
    #[error("webhook config error: {0}")]
    Webhook(#[from] release_gate_notify::WebhookError),
}

/// Shorthand for [`ConfigError::Invalid`].
fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Release gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseGateConfig {
    /// Chain-wide settings.
    #[serde(default)]
    pub chain: ChainSettings,
    /// Environments in promotion order.
    #[serde(default)]
    pub environments: Vec<EnvironmentSection>,
    /// Registry connection.
    #[serde(default)]
    pub registry: Option<RegistrySection>,
    /// Signing and verification.
    #[serde(default)]
    pub signing: Option<SigningConfig>,
    /// Webhook endpoints.
    #[serde(default)]
    pub webhooks: Vec<WebhookSection>,
    /// Rollback authorization.
    #[serde(default)]
    pub authorization: AuthorizationSection,
    /// Audit trail storage.
    #[serde(default)]
    pub audit: AuditSection,
    /// Structured log output.
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Chain-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainSettings {
    /// Permit forward promotions that skip intermediate environments.
    #[serde(default)]
    pub allow_skip: bool,
}

/// One environment in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentSection {
    /// Environment name.
    pub name: String,
    /// Gates in evaluation order.
    #[serde(default)]
    pub gates: Vec<GateSection>,
    /// Signature policy for inbound promotions.
    #[serde(default)]
    pub signature: SignaturePolicy,
    /// Downstream consumers.
    #[serde(default)]
    pub consumers: Vec<String>,
}

/// How a gate participates in promotion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Failure blocks the promotion.
    #[default]
    Required,
    /// Failure is recorded as a warning.
    Advisory,
    /// Configured but skipped.
    Optional,
}

/// One gate requirement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateSection {
    /// Gate identifier.
    pub id: String,
    /// Gate mode.
    #[serde(default)]
    pub mode: GateMode,
}

/// Registry connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySection {
    /// Registry base URL.
    pub base_url: String,
    /// Repository path.
    pub repository: String,
    /// Allow cleartext HTTP.
    #[serde(default)]
    pub allow_http: bool,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_registry_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Environment variable holding the basic-auth username.
    #[serde(default)]
    pub username_env: Option<String>,
    /// Environment variable holding the basic-auth password.
    #[serde(default)]
    pub password_env: Option<String>,
    /// Circuit breaker tuning.
    #[serde(default)]
    pub breaker: BreakerSection,
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakerSection {
    /// Consecutive failures that open the breaker.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Time spent open before a trial call, in milliseconds.
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,
}

impl Default for BreakerSection {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_ms: default_reset_timeout_ms(),
        }
    }
}

/// Signing mode used by the signing client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningModeSection {
    /// Identity token, short-lived certificate, transparency log.
    Keyless,
    /// Long-lived ed25519 key.
    Key,
}

/// Signing client and verification trust.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigningConfig {
    /// Mode used when signing; verification-only when absent.
    #[serde(default)]
    pub mode: Option<SigningModeSection>,
    /// Signing key file for key mode.
    #[serde(default)]
    pub key_path: Option<String>,
    /// Certificate authority base URL for keyless mode.
    #[serde(default)]
    pub certificate_authority_url: Option<String>,
    /// Transparency log base URL for keyless mode.
    #[serde(default)]
    pub transparency_log_url: Option<String>,
    /// Allow cleartext HTTP to signing services.
    #[serde(default)]
    pub allow_http: bool,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_signing_timeout_ms")]
    pub timeout_ms: u64,
    /// Prompt on the terminal when no ambient identity token is found.
    #[serde(default)]
    pub interactive: bool,
    /// Verification trust roots.
    #[serde(default)]
    pub trust: TrustSection,
}

/// Verification trust roots, as public key files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustSection {
    /// Certificate authority public keys.
    #[serde(default)]
    pub certificate_authorities: Vec<String>,
    /// Transparency log public keys.
    #[serde(default)]
    pub transparency_logs: Vec<String>,
    /// Trusted long-lived signing public keys.
    #[serde(default)]
    pub signing_keys: Vec<String>,
    /// Accepted certificate subjects; empty accepts any.
    #[serde(default)]
    pub allowed_subjects: Vec<String>,
    /// Accepted token issuers; empty accepts any.
    #[serde(default)]
    pub allowed_issuers: Vec<String>,
}

impl TrustSection {
    /// Returns true when keyless bundles can be verified.
    #[must_use]
    pub fn supports_keyless(&self) -> bool {
        !self.certificate_authorities.is_empty() && !self.transparency_logs.is_empty()
    }

    /// Returns true when key bundles can be verified.
    #[must_use]
    pub fn supports_key(&self) -> bool {
        !self.signing_keys.is_empty()
    }
}

/// One webhook endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookSection {
    /// Target URL.
    pub url: String,
    /// Subscribed events; all events when absent.
    #[serde(default)]
    pub events: Option<BTreeSet<LifecycleEvent>>,
    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries after the first failed attempt.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// First backoff delay in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Allow cleartext HTTP.
    #[serde(default)]
    pub allow_http: bool,
}

/// Rollback authorization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorizationSection {
    /// Enforce group membership for rollbacks.
    #[serde(default)]
    pub enabled: bool,
    /// Groups allowed to roll back.
    #[serde(default)]
    pub rollback_groups: Vec<String>,
    /// Group members keyed by group name.
    #[serde(default)]
    pub members: BTreeMap<String, Vec<String>>,
    /// Highest rollback index tried before giving up.
    #[serde(default = "default_max_rollback_index")]
    pub max_rollback_index: u32,
}

impl Default for AuthorizationSection {
    fn default() -> Self {
        Self {
            enabled: false,
            rollback_groups: Vec::new(),
            members: BTreeMap::new(),
            max_rollback_index: default_max_rollback_index(),
        }
    }
}

/// Audit trail storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditSection {
    /// JSON-lines audit file; in-memory when absent.
    #[serde(default)]
    pub path: Option<String>,
}

/// Structured log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutput {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `path`.
    File,
    /// Discard.
    Disabled,
}

/// Structured log output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Destination.
    #[serde(default)]
    pub output: LogOutput,
    /// Log file for [`LogOutput::File`].
    #[serde(default)]
    pub path: Option<String>,
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default registry timeout.
const fn default_registry_timeout_ms() -> u64 {
    10_000
}

/// Default maximum registry response size.
const fn default_max_response_bytes() -> usize {
    64 * 1024 * 1024
}

/// Default breaker failure threshold.
const fn default_failure_threshold() -> u32 {
    5
}

/// Default breaker reset timeout.
const fn default_reset_timeout_ms() -> u64 {
    30_000
}

/// Default signing service timeout.
const fn default_signing_timeout_ms() -> u64 {
    10_000
}

/// Default webhook timeout.
const fn default_webhook_timeout_ms() -> u64 {
    10_000
}

/// Default webhook retry count.
const fn default_retry_count() -> u32 {
    3
}

/// Default webhook backoff base.
const fn default_backoff_base_ms() -> u64 {
    1_000
}

/// Default rollback index limit.
const fn default_max_rollback_index() -> u32 {
    1_000
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl ReleaseGateConfig {
    /// Loads configuration from disk.
    ///
    /// The path is `path` when given, else `RELEASE_GATE_CONFIG`, else
    /// `release-gate.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let file = File::open(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        let limit = u64::try_from(MAX_CONFIG_FILE_SIZE).unwrap_or(u64::MAX).saturating_add(1);
        let mut bytes = Vec::new();
        file.take(limit).read_to_end(&mut bytes).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(invalid("config file exceeds size limit"));
        }
        let content =
            std::str::from_utf8(&bytes).map_err(|_| invalid("config file must be utf-8"))?;
        Self::parse(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_environments()?;
        if let Some(registry) = &self.registry {
            registry.validate()?;
        }
        self.validate_signing()?;
        if self.webhooks.len() > MAX_WEBHOOKS {
            return Err(invalid(format!("at most {MAX_WEBHOOKS} webhooks are allowed")));
        }
        for (index, webhook) in self.webhooks.iter().enumerate() {
            webhook.validate(index)?;
        }
        self.authorization.validate()?;
        if let Some(path) = &self.audit.path {
            validate_path_string("audit.path", path)?;
        }
        self.logging.validate()?;
        Ok(())
    }

    /// Validates the environment chain; conversion repeats the identifier checks.
    fn validate_environments(&self) -> Result<(), ConfigError> {
        if self.environments.is_empty() {
            return Err(invalid("at least one environment must be configured"));
        }
        if self.environments.len() > MAX_ENVIRONMENTS {
            return Err(invalid(format!("at most {MAX_ENVIRONMENTS} environments are allowed")));
        }
        if let Some(env) =
            self.environments.iter().find(|env| env.gates.len() > MAX_GATES_PER_ENVIRONMENT)
        {
            return Err(invalid(format!(
                "environment {} has more than {MAX_GATES_PER_ENVIRONMENT} gates",
                env.name
            )));
        }
        self.environment_chain().map(|_| ())
    }

    /// Checks signing mode consistency and that signature policies have trust.
    fn validate_signing(&self) -> Result<(), ConfigError> {
        let needs_trust = self
            .environments
            .iter()
            .filter(|env| env.signature != SignaturePolicy::Disabled)
            .map(|env| env.name.as_str())
            .collect::<Vec<_>>();
        match &self.signing {
            Some(signing) => {
                signing.validate()?;
                if !needs_trust.is_empty()
                    && !signing.trust.supports_keyless()
                    && !signing.trust.supports_key()
                {
                    return Err(invalid(format!(
                        "environments {} verify signatures but signing.trust is empty",
                        needs_trust.join(", ")
                    )));
                }
                Ok(())
            }
            None if needs_trust.is_empty() => Ok(()),
            None => Err(invalid(format!(
                "environments {} verify signatures but no [signing] section is configured",
                needs_trust.join(", ")
            ))),
        }
    }
}

// ============================================================================
// SECTION: Section Validation
// ============================================================================

impl RegistrySection {
    /// Validates the registry connection.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_url("registry.base_url", &self.base_url, self.allow_http)?;
        if self.repository.trim().is_empty() {
            return Err(invalid("registry.repository must be non-empty"));
        }
        validate_timeout("registry.timeout_ms", self.timeout_ms)?;
        if self.max_response_bytes == 0 {
            return Err(invalid("registry.max_response_bytes must be greater than zero"));
        }
        if self.username_env.is_some() != self.password_env.is_some() {
            return Err(invalid("registry.username_env and registry.password_env must be set together"));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(invalid("registry.breaker.failure_threshold must be at least 1"));
        }
        if self.breaker.reset_timeout_ms == 0 || self.breaker.reset_timeout_ms > MAX_RESET_TIMEOUT_MS
        {
            return Err(invalid(format!(
                "registry.breaker.reset_timeout_ms must be between 1 and {MAX_RESET_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

impl SigningConfig {
    /// Validates mode requirements, service URLs, and key paths.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout("signing.timeout_ms", self.timeout_ms)?;
        match self.mode {
            Some(SigningModeSection::Keyless) => {
                let Some(authority) = &self.certificate_authority_url else {
                    return Err(invalid("keyless signing requires signing.certificate_authority_url"));
                };
                let Some(log) = &self.transparency_log_url else {
                    return Err(invalid("keyless signing requires signing.transparency_log_url"));
                };
                validate_url("signing.certificate_authority_url", authority, self.allow_http)?;
                validate_url("signing.transparency_log_url", log, self.allow_http)?;
                if !self.trust.supports_keyless() {
                    return Err(invalid(
                        "keyless signing requires signing.trust.certificate_authorities and \
                         signing.trust.transparency_logs",
                    ));
                }
            }
            Some(SigningModeSection::Key) => {
                let Some(path) = &self.key_path else {
                    return Err(invalid("key signing requires signing.key_path"));
                };
                validate_path_string("signing.key_path", path)?;
            }
            None => {
                if self.key_path.is_some() {
                    return Err(invalid("signing.key_path requires signing.mode = \"key\""));
                }
            }
        }
        if self.interactive && self.mode != Some(SigningModeSection::Keyless) {
            return Err(invalid("signing.interactive requires signing.mode = \"keyless\""));
        }
        let trust = &self.trust;
        for (field, paths) in [
            ("signing.trust.certificate_authorities", &trust.certificate_authorities),
            ("signing.trust.transparency_logs", &trust.transparency_logs),
            ("signing.trust.signing_keys", &trust.signing_keys),
        ] {
            for path in paths {
                validate_path_string(field, path)?;
            }
        }
        Ok(())
    }
}

impl WebhookSection {
    /// Validates one webhook; `index` locates it in error messages.
    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let field = format!("webhooks[{index}]");
        if self.events.as_ref().is_some_and(BTreeSet::is_empty) {
            return Err(invalid(format!("{field}.events must name at least one event")));
        }
        validate_timeout(&format!("{field}.timeout_ms"), self.timeout_ms)?;
        if self.retry_count > MAX_RETRY_COUNT {
            return Err(invalid(format!("{field}.retry_count must be at most {MAX_RETRY_COUNT}")));
        }
        if self.backoff_base_ms > MAX_BACKOFF_BASE_MS {
            return Err(invalid(format!(
                "{field}.backoff_base_ms must be at most {MAX_BACKOFF_BASE_MS}"
            )));
        }
        self.to_webhook_config()
            .validate()
            .map(|_| ())
            .map_err(|err| invalid(format!("{field}: {err}")))
    }
}

impl AuthorizationSection {
    /// Validates rollback authorization.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.rollback_groups.iter().all(|group| group.trim().is_empty()) {
            return Err(invalid("authorization.rollback_groups must be non-empty when enabled"));
        }
        if self.max_rollback_index == 0 || self.max_rollback_index > MAX_ROLLBACK_INDEX {
            return Err(invalid(format!(
                "authorization.max_rollback_index must be between 1 and {MAX_ROLLBACK_INDEX}"
            )));
        }
        for (group, members) in &self.members {
            if members.iter().any(|member| member.trim().is_empty()) {
                return Err(invalid(format!("authorization.members.{group} has an empty member")));
            }
        }
        Ok(())
    }
}

impl LoggingSection {
    /// Validates the log destination.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.output, &self.path) {
            (LogOutput::File, Some(path)) => validate_path_string("logging.path", path),
            (LogOutput::File, None) => Err(invalid("logging.output = \"file\" requires logging.path")),
            (_, Some(_)) => Err(invalid("logging.path is only valid with logging.output = \"file\"")),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(invalid("config path exceeds max length"));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(invalid("config path exceeds max length"));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(invalid("config path component too long"));
        }
    }
    if fs::metadata(path).is_ok_and(|meta| meta.is_dir()) {
        return Err(invalid("config path is a directory"));
    }
    Ok(())
}

/// Validates a configured file path string.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an outbound service URL.
fn validate_url(field: &str, value: &str, allow_http: bool) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.starts_with("https://") {
        return Ok(());
    }
    if trimmed.starts_with("http://") {
        if allow_http {
            return Ok(());
        }
        return Err(invalid(format!("{field} uses http:// without allow_http")));
    }
    Err(invalid(format!("{field} must include http:// or https://")))
}

/// Validates an outbound timeout.
fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if !(MIN_TIMEOUT_MS ..= MAX_TIMEOUT_MS).contains(&value) {
        return Err(invalid(format!(
            "{field} must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
