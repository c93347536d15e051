// crates/release-gate-config/src/runtime.rs
// ============================================================================
// Module: Runtime Conversion
// Description: Builds controller components from validated configuration.
// Purpose: Keep the mapping from release-gate.toml to runtime types in one place.
// Dependencies: release-gate-core, release-gate-registry, release-gate-signing, release-gate-notify
// ============================================================================

//! ## Overview
//! Pure conversions (chain, settings, webhook and registry configs) never
//! touch the filesystem. Builders that open files or construct HTTP clients
//! (trust roots, signing clients, audit trail, log sink, registry transport)
//! return [`ConfigError`] when the referenced resource is unusable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use release_gate_core::ControllerLogSink;
use release_gate_core::ControllerSettings;
use release_gate_core::EnvironmentChain;
use release_gate_core::EnvironmentConfig;
use release_gate_core::EnvironmentName;
use release_gate_core::FileLogSink;
use release_gate_core::GateId;
use release_gate_core::GateRequirement;
use release_gate_core::JsonlAuditTrail;
use release_gate_core::NoopLogSink;
use release_gate_core::StaticAuthorizer;
use release_gate_core::StderrLogSink;
use release_gate_notify::WebhookConfig;
use release_gate_notify::WebhookNotifier;
use release_gate_registry::BreakerTransport;
use release_gate_registry::CircuitBreaker;
use release_gate_registry::CircuitBreakerConfig;
use release_gate_registry::OciRegistryClient;
use release_gate_registry::OciRegistryConfig;
use release_gate_signing::AmbientTokenSource;
use release_gate_signing::BundleVerifier;
use release_gate_signing::HttpCertificateAuthority;
use release_gate_signing::HttpTransparencyLog;
use release_gate_signing::InteractiveTokenSource;
use release_gate_signing::ServiceEndpoint;
use release_gate_signing::SigningClient;
use release_gate_signing::TrustRoot;
use release_gate_signing::load_verifying_key;

use crate::config::ConfigError;
use crate::config::GateMode;
use crate::config::LogOutput;
use crate::config::RegistrySection;
use crate::config::ReleaseGateConfig;
use crate::config::SigningConfig;
use crate::config::SigningModeSection;
use crate::config::WebhookSection;

// ============================================================================
// SECTION: Controller Inputs
// ============================================================================

impl ReleaseGateConfig {
    /// Builds the ordered environment chain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for malformed names, gate ids, or
    /// duplicates.
    pub fn environment_chain(&self) -> Result<EnvironmentChain, ConfigError> {
        let mut environments = Vec::with_capacity(self.environments.len());
        for section in &self.environments {
            let name = EnvironmentName::parse(section.name.as_str())
                .map_err(|err| ConfigError::Invalid(format!("environments: {err}")))?;
            let mut env = EnvironmentConfig::new(name).with_signature(section.signature);
            for gate in &section.gates {
                let id = GateId::parse(gate.id.as_str()).map_err(|err| {
                    ConfigError::Invalid(format!("environment {}: {err}", section.name))
                })?;
                env = env.with_gate(match gate.mode {
                    GateMode::Required => GateRequirement::required(id),
                    GateMode::Advisory => GateRequirement::advisory(id),
                    GateMode::Optional => GateRequirement::optional(id),
                });
            }
            for consumer in &section.consumers {
                env = env.with_consumer(consumer.as_str());
            }
            environments.push(env);
        }
        EnvironmentChain::new(environments, self.chain.allow_skip)
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Returns controller behavior settings.
    ///
    /// Rollback groups are only enforced when authorization is enabled.
    #[must_use]
    pub fn controller_settings(&self) -> ControllerSettings {
        let authorization = &self.authorization;
        let rollback_groups = if authorization.enabled {
            authorization
                .rollback_groups
                .iter()
                .filter(|group| !group.trim().is_empty())
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        ControllerSettings {
            rollback_groups,
            max_rollback_index: authorization.max_rollback_index,
        }
    }

    /// Returns the group membership table.
    #[must_use]
    pub fn authorizer(&self) -> StaticAuthorizer {
        let mut authorizer = StaticAuthorizer::new();
        for (group, members) in &self.authorization.members {
            for member in members {
                authorizer = authorizer.with_member(group.as_str(), member.trim());
            }
        }
        authorizer
    }

    /// Returns webhook configurations in file order.
    #[must_use]
    pub fn webhook_configs(&self) -> Vec<WebhookConfig> {
        self.webhooks.iter().map(WebhookSection::to_webhook_config).collect()
    }

    /// Builds the webhook notifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Webhook`] when an HTTP client cannot be built.
    pub fn webhook_notifier(&self) -> Result<WebhookNotifier, ConfigError> {
        Ok(WebhookNotifier::new(self.webhook_configs())?)
    }

    /// Opens the configured JSON-lines audit trail, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be opened or replayed.
    pub fn open_audit_trail(&self) -> Result<Option<JsonlAuditTrail>, ConfigError> {
        self.audit
            .path
            .as_deref()
            .map(|path| {
                JsonlAuditTrail::open(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(format!("audit trail: {err}")))
            })
            .transpose()
    }

    /// Builds the structured log sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the log file cannot be opened.
    pub fn log_sink(&self) -> Result<Arc<dyn ControllerLogSink>, ConfigError> {
        match (self.logging.output, self.logging.path.as_deref()) {
            (LogOutput::File, Some(path)) => {
                let sink = FileLogSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(format!("log file: {err}")))?;
                Ok(Arc::new(sink))
            }
            (LogOutput::File, None) => {
                Err(ConfigError::Invalid("logging.output = \"file\" requires logging.path".to_string()))
            }
            (LogOutput::Stderr, _) => Ok(Arc::new(StderrLogSink)),
            (LogOutput::Disabled, _) => Ok(Arc::new(NoopLogSink)),
        }
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

impl RegistrySection {
    /// Returns the OCI client configuration.
    #[must_use]
    pub fn oci_config(&self) -> OciRegistryConfig {
        OciRegistryConfig {
            allow_http: self.allow_http,
            timeout_ms: self.timeout_ms,
            max_response_bytes: self.max_response_bytes,
            username_env: self.username_env.clone(),
            password_env: self.password_env.clone(),
            ..OciRegistryConfig::new(self.base_url.trim(), self.repository.trim())
        }
    }

    /// Returns the circuit breaker tuning.
    #[must_use]
    pub const fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.breaker.failure_threshold,
            reset_timeout: Duration::from_millis(self.breaker.reset_timeout_ms),
        }
    }

    /// Builds the registry client behind its circuit breaker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Registry`] when the client cannot be built,
    /// e.g. when a credential variable is unset.
    pub fn connect(
        &self,
        log: Arc<dyn ControllerLogSink>,
    ) -> Result<BreakerTransport<OciRegistryClient>, ConfigError> {
        let client = OciRegistryClient::new(self.oci_config())?;
        let breaker =
            CircuitBreaker::new(self.base_url.trim(), self.breaker_config()).with_log_sink(log);
        Ok(BreakerTransport::new(client, Arc::new(breaker)))
    }
}

// ============================================================================
// SECTION: Signing
// ============================================================================

impl SigningConfig {
    /// Loads the verification trust root from the configured key files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Signing`] when a key file is missing or malformed.
    pub fn trust_root(&self) -> Result<TrustRoot, ConfigError> {
        let trust = &self.trust;
        let mut root = TrustRoot::new();
        for path in &trust.certificate_authorities {
            root = root.with_certificate_authority(load_verifying_key(Path::new(path.trim()))?);
        }
        for path in &trust.transparency_logs {
            root = root.with_transparency_log(load_verifying_key(Path::new(path.trim()))?);
        }
        for path in &trust.signing_keys {
            root = root.with_signing_key(load_verifying_key(Path::new(path.trim()))?);
        }
        Ok(root)
    }

    /// Builds the bundle verifier with identity allow-lists applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Signing`] when the trust root cannot be loaded.
    pub fn verifier(&self) -> Result<BundleVerifier, ConfigError> {
        let trust = &self.trust;
        let mut verifier = BundleVerifier::new(self.trust_root()?);
        for subject in &trust.allowed_subjects {
            verifier = verifier.with_allowed_subject(subject.as_str());
        }
        for issuer in &trust.allowed_issuers {
            verifier = verifier.with_allowed_issuer(issuer.as_str());
        }
        Ok(verifier)
    }

    /// Builds the signing client, or `None` when no signing mode is set.
    ///
    /// Keyless clients take identity tokens from `SIGSTORE_ID_TOKEN`, then the
    /// GitHub Actions token endpoint, then the terminal when `interactive`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a service URL or key file is unusable.
    pub fn client(&self) -> Result<Option<SigningClient>, ConfigError> {
        match self.mode {
            None => Ok(None),
            Some(SigningModeSection::Key) => {
                let path = self.key_path.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("key signing requires signing.key_path".to_string())
                })?;
                Ok(Some(SigningClient::from_key_file(Path::new(path.trim()))?))
            }
            Some(SigningModeSection::Keyless) => {
                let (Some(authority), Some(log)) =
                    (&self.certificate_authority_url, &self.transparency_log_url)
                else {
                    return Err(ConfigError::Invalid(
                        "keyless signing requires certificate authority and transparency log urls"
                            .to_string(),
                    ));
                };
                let mut tokens = AmbientTokenSource::ci();
                if self.interactive {
                    tokens = tokens.with_fallback(InteractiveTokenSource::stdio());
                }
                let authority = HttpCertificateAuthority::new(&self.endpoint(authority))?;
                let log = HttpTransparencyLog::new(&self.endpoint(log))?;
                Ok(Some(SigningClient::keyless(tokens, authority, log)))
            }
        }
    }

    /// Connection settings for one signing service.
    fn endpoint(&self, url: &str) -> ServiceEndpoint {
        ServiceEndpoint {
            timeout_ms: self.timeout_ms,
            allow_http: self.allow_http,
            ..ServiceEndpoint::new(url.trim())
        }
    }
}

// ============================================================================
// SECTION: Webhooks
// ============================================================================

impl WebhookSection {
    /// Returns the notifier configuration for this webhook.
    #[must_use]
    pub fn to_webhook_config(&self) -> WebhookConfig {
        let mut config = WebhookConfig {
            headers: self.headers.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            retry_count: self.retry_count,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            allow_http: self.allow_http,
            ..WebhookConfig::new(self.url.trim())
        };
        if let Some(events) = &self.events {
            config.events = events.clone();
        }
        config
    }
}
