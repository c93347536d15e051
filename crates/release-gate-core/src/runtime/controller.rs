// crates/release-gate-core/src/runtime/controller.rs
// ============================================================================
// Module: Release Gate Promotion Controller
// Description: Promotion pipeline and environment lock management.
// Purpose: Move artifacts between environments under gates, signatures, and locks.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! [`PromotionController`] is the single execution path for promotions,
//! locks, and rollbacks. A promotion runs its stages in a fixed order
//! (chain check, lock check, tag resolution, idempotency, gates, signature,
//! tag write, record, notify) and any stage before the notification may abort
//! it. Registry errors are surfaced, never retried. An audit failure after the
//! tag write surfaces as [`PromotionError::UnrecordedWrite`] and suppresses the
//! notification.
//!
//! Invariants:
//! - Semantic-version tags are created through [`RegistryTransport::reserve_tag`]
//!   and never repointed.
//! - Every completed attempt (promoted, no-op, or dry run) is appended to the
//!   audit trail before any notification is sent. A dropped notification is
//!   reported as a warning on the returned record only.
//! - Lock state is read fresh from the registry before every promotion and rollback.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::environment::EnvironmentChain;
use crate::core::environment::EnvironmentConfig;
use crate::core::environment::SignaturePolicy;
use crate::core::error::PromotionError;
use crate::core::error::RegistryError;
use crate::core::events::LifecycleEvent;
use crate::core::events::LifecycleNotification;
use crate::core::identifiers::Digest;
use crate::core::identifiers::EnvironmentName;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::PromotionId;
use crate::core::identifiers::TagName;
use crate::core::identifiers::TraceId;
use crate::core::records::LockStatus;
use crate::core::records::PromotionOutcome;
use crate::core::records::PromotionRecord;
use crate::core::records::clear_lock_annotations;
use crate::core::signature::SignatureMetadata;
use crate::core::tags::SemVer;
use crate::core::tags::environment_tag;
use crate::core::tags::is_immutable_tag;
use crate::core::tags::latest_tag;
use crate::core::time::Timestamp;
use crate::interfaces::AuditTrail;
use crate::interfaces::Authorizer;
use crate::interfaces::Clock;
use crate::interfaces::EventNotifier;
use crate::interfaces::GateContext;
use crate::interfaces::GateEvaluator;
use crate::interfaces::ManifestRecord;
use crate::interfaces::RegistryTransport;
use crate::interfaces::SignatureVerifier;
use crate::interfaces::TagReservation;
use crate::runtime::gates::AnnotationGateEvaluator;
use crate::runtime::gates::evaluate_gates;
use crate::runtime::log::ControllerLogEvent;
use crate::runtime::log::ControllerLogSink;
use crate::runtime::log::NoopLogSink;
use crate::runtime::services::StaticAuthorizer;
use crate::runtime::services::SystemClock;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default upper bound on rollback tag indices tried per version and environment.
pub const DEFAULT_MAX_ROLLBACK_INDEX: u32 = 1000;

/// Warning prefix recorded when an optional signature is missing.
pub const UNSIGNED_WARNING_PREFIX: &str = "unsigned";

/// Controller behavior settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Groups allowed to roll back; empty disables the authorization check.
    pub rollback_groups: Vec<String>,
    /// Highest rollback index tried before giving up.
    pub max_rollback_index: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            rollback_groups: Vec::new(),
            max_rollback_index: DEFAULT_MAX_ROLLBACK_INDEX,
        }
    }
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Promotion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionRequest {
    /// Semantic-version tag to promote.
    pub tag: TagName,
    /// Environment the artifact is leaving.
    pub from_env: EnvironmentName,
    /// Environment the artifact is entering.
    pub to_env: EnvironmentName,
    /// Requesting operator.
    pub operator: OperatorId,
    /// Evaluate everything but write nothing to the registry.
    pub dry_run: bool,
    /// Treat an existing same-digest environment tag as a no-op.
    pub force: bool,
    /// Caller-supplied trace identifier.
    pub trace_id: Option<TraceId>,
}

impl PromotionRequest {
    /// Creates a non-dry-run, non-forced promotion request.
    #[must_use]
    pub const fn new(
        tag: TagName,
        from_env: EnvironmentName,
        to_env: EnvironmentName,
        operator: OperatorId,
    ) -> Self {
        Self {
            tag,
            from_env,
            to_env,
            operator,
            dry_run: false,
            force: false,
            trace_id: None,
        }
    }

    /// Sets the dry-run flag.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the force flag.
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sets the trace identifier.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Artifact promotion and lifecycle controller.
pub struct PromotionController<R, V, N, A> {
    /// Ordered environment chain.
    pub(super) chain: EnvironmentChain,
    /// Behavior settings.
    pub(super) settings: ControllerSettings,
    /// Registry transport.
    pub(super) registry: R,
    /// Signature verifier.
    pub(super) verifier: V,
    /// Lifecycle event notifier.
    pub(super) notifier: N,
    /// Audit trail.
    pub(super) audit: A,
    /// Gate evaluator.
    pub(super) gates: Box<dyn GateEvaluator>,
    /// Rollback authorizer.
    pub(super) authorizer: Box<dyn Authorizer>,
    /// Record time source.
    pub(super) clock: Box<dyn Clock>,
    /// Structured log sink.
    pub(super) log: Arc<dyn ControllerLogSink>,
    /// Per-target mutexes serializing same-target writes in process.
    pub(super) target_locks: Mutex<BTreeMap<String, Arc<Mutex<()>>>>,
}

impl<R, V, N, A> PromotionController<R, V, N, A>
where
    R: RegistryTransport,
    V: SignatureVerifier,
    N: EventNotifier,
    A: AuditTrail,
{
    /// Creates a controller with annotation gates, no authorization groups,
    /// wall-clock time, and a no-op log sink.
    #[must_use]
    pub fn new(
        chain: EnvironmentChain,
        settings: ControllerSettings,
        registry: R,
        verifier: V,
        notifier: N,
        audit: A,
    ) -> Self {
        Self {
            chain,
            settings,
            registry,
            verifier,
            notifier,
            audit,
            gates: Box::new(AnnotationGateEvaluator),
            authorizer: Box::new(StaticAuthorizer::new()),
            clock: Box::new(SystemClock),
            log: Arc::new(NoopLogSink),
            target_locks: Mutex::new(BTreeMap::new()),
        }
    }

    /// Replaces the gate evaluator.
    #[must_use]
    pub fn with_gate_evaluator(mut self, gates: impl GateEvaluator + 'static) -> Self {
        self.gates = Box::new(gates);
        self
    }

    /// Replaces the rollback authorizer.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Box::new(authorizer);
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replaces the log sink.
    #[must_use]
    pub fn with_log_sink(mut self, log: Arc<dyn ControllerLogSink>) -> Self {
        self.log = log;
        self
    }

    /// Returns the environment chain.
    #[must_use]
    pub const fn chain(&self) -> &EnvironmentChain {
        &self.chain
    }

    /// Returns the controller settings.
    #[must_use]
    pub const fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Returns the registry transport.
    #[must_use]
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Returns the notifier.
    #[must_use]
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Returns the audit trail.
    #[must_use]
    pub const fn audit_trail(&self) -> &A {
        &self.audit
    }

    // ------------------------------------------------------------------------
    // Promotion
    // ------------------------------------------------------------------------

    /// Promotes a tagged artifact from one environment to the next.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError`] when any stage rejects the promotion; nothing
    /// is written to the registry in that case.
    pub fn promote(&self, request: &PromotionRequest) -> Result<PromotionRecord, PromotionError> {
        let trace_id = request.trace_id.clone().unwrap_or_else(TraceId::generate);
        let result = self.promote_inner(request, &trace_id);
        let mut event = ControllerLogEvent::new(
            "promotion",
            match &result {
                Ok(record) => outcome_label(record.outcome),
                Err(err) => err.kind(),
            },
        )
        .environment(&request.to_env)
        .tag(&request.tag)
        .operator(&request.operator)
        .trace_id(&trace_id);
        if let Err(err) = &result {
            event = event.detail(err.to_string());
        }
        self.log.record(&event);
        result
    }

    /// Runs the promotion stages.
    fn promote_inner(
        &self,
        request: &PromotionRequest,
        trace_id: &TraceId,
    ) -> Result<PromotionRecord, PromotionError> {
        require_semver(&request.tag)?;
        let target = self.resolve_transition(&request.from_env, &request.to_env)?;

        let guard_key = format!("{}@{}", request.tag, request.to_env);
        let target_mutex = self.target_mutex(guard_key)?;
        let _guard = target_mutex
            .lock()
            .map_err(|_| PromotionError::internal("promotion target mutex poisoned"))?;

        self.ensure_unlocked(&request.to_env)?;

        let manifest = self.resolve_source(&request.tag)?;
        let digest = manifest.digest.clone();

        let env_tag = environment_tag(&request.tag, &request.to_env)?;
        let mut no_op = false;
        if let Some(existing) = self.resolve_optional(&env_tag)? {
            if existing == digest && request.force {
                no_op = true;
            } else {
                return Err(PromotionError::TagExists {
                    tag: env_tag,
                    existing_digest: existing,
                });
            }
        }

        let ctx = GateContext {
            tag: &request.tag,
            digest: &digest,
            source_environment: &request.from_env,
            target_environment: &request.to_env,
            annotations: &manifest.annotations,
        };
        let gate_outcome = evaluate_gates(&target.gates, self.gates.as_ref(), &ctx);
        if let Some(failure) = gate_outcome.blocking_failure {
            return Err(PromotionError::GateValidation {
                gate: failure.gate,
                detail: failure.detail,
            });
        }
        let mut warnings = gate_outcome.warnings;

        let signature_verified =
            self.check_signature(target.signature, &request.tag, &manifest, &mut warnings)?;

        let outcome = if no_op {
            PromotionOutcome::NoOp
        } else if request.dry_run {
            PromotionOutcome::DryRun
        } else {
            self.write_promotion(&digest, &env_tag, &request.to_env, request.force)?
        };

        let timestamp = self.clock.now();
        let mut record = PromotionRecord {
            promotion_id: PromotionId::generate(),
            artifact_tag: request.tag.clone(),
            artifact_digest: digest,
            environment_tag: env_tag,
            source_environment: request.from_env.clone(),
            target_environment: request.to_env.clone(),
            operator: request.operator.clone(),
            timestamp,
            dry_run: request.dry_run,
            outcome,
            gate_results: gate_outcome.results,
            signature_verified,
            warnings,
            trace_id: trace_id.clone(),
        };
        if let Err(err) = self.audit.append_promotion(&record) {
            return Err(if outcome == PromotionOutcome::Promoted {
                PromotionError::UnrecordedWrite {
                    written: vec![record.environment_tag, latest_tag(&request.to_env)?],
                    detail: err.to_string(),
                }
            } else {
                PromotionError::Audit(err.to_string())
            });
        }

        if outcome == PromotionOutcome::Promoted {
            let notification = LifecycleNotification {
                event_type: LifecycleEvent::Promote,
                artifact_tag: Some(record.artifact_tag.clone()),
                artifact_digest: Some(record.artifact_digest.clone()),
                source_environment: Some(request.from_env.clone()),
                target_environment: request.to_env.clone(),
                operator: request.operator.clone(),
                timestamp,
                reason: None,
            };
            if let Some(warning) = self.emit(&notification, trace_id) {
                record.warnings.push(warning);
            }
        }
        Ok(record)
    }

    /// Validates the transition and returns the target environment.
    fn resolve_transition(
        &self,
        from: &EnvironmentName,
        to: &EnvironmentName,
    ) -> Result<&EnvironmentConfig, PromotionError> {
        let invalid = || PromotionError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        };
        if !self.chain.is_valid_transition(from, to) {
            return Err(invalid());
        }
        self.chain.get(to).ok_or_else(invalid)
    }

    /// Resolves the source tag, mapping a missing tag to bad input.
    fn resolve_source(&self, tag: &TagName) -> Result<ManifestRecord, PromotionError> {
        self.registry.get_manifest(tag).map_err(|err| match err {
            RegistryError::NotFound(_) => PromotionError::TagNotFound(tag.clone()),
            other => other.into(),
        })
    }

    /// Applies the target environment's signature policy.
    fn check_signature(
        &self,
        policy: SignaturePolicy,
        tag: &TagName,
        manifest: &ManifestRecord,
        warnings: &mut Vec<String>,
    ) -> Result<bool, PromotionError> {
        if policy == SignaturePolicy::Disabled {
            return Ok(false);
        }
        let Some(metadata) = SignatureMetadata::from_annotations(&manifest.annotations) else {
            if SignatureMetadata::is_present(&manifest.annotations) {
                return Err(PromotionError::SignatureVerification(format!(
                    "signature annotations on {tag} are incomplete or malformed"
                )));
            }
            if policy == SignaturePolicy::Required {
                return Err(PromotionError::SignatureVerification(format!(
                    "artifact {tag} is not signed"
                )));
            }
            warnings.push(format!("{UNSIGNED_WARNING_PREFIX}: artifact {tag} has no signature"));
            return Ok(false);
        };
        let artifact = self.registry.pull(tag).map_err(PromotionError::from)?;
        self.verifier
            .verify(&metadata, &artifact.bytes)
            .map_err(|err| PromotionError::SignatureVerification(err.to_string()))?;
        Ok(true)
    }

    /// Reserves the environment tag and repoints `latest-{env}`.
    fn write_promotion(
        &self,
        digest: &Digest,
        env_tag: &TagName,
        env: &EnvironmentName,
        force: bool,
    ) -> Result<PromotionOutcome, PromotionError> {
        match self.registry.reserve_tag(digest, env_tag)? {
            TagReservation::Created => {}
            TagReservation::Existing(existing) if existing == *digest && force => {
                return Ok(PromotionOutcome::NoOp);
            }
            TagReservation::Existing(existing) => {
                return Err(PromotionError::TagExists {
                    tag: env_tag.clone(),
                    existing_digest: existing,
                });
            }
        }
        self.repoint(digest, &latest_tag(env)?)?;
        Ok(PromotionOutcome::Promoted)
    }

    // ------------------------------------------------------------------------
    // Locks
    // ------------------------------------------------------------------------

    /// Locks an environment, replacing any existing lock.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError`] when the environment is unknown, the reason
    /// is empty, or the registry write fails.
    pub fn lock(
        &self,
        env: &EnvironmentName,
        reason: &str,
        operator: &OperatorId,
    ) -> Result<LockStatus, PromotionError> {
        self.require_environment(env)?;
        if reason.trim().is_empty() {
            return Err(PromotionError::InvalidInput("lock reason must not be empty".to_string()));
        }
        let latest = latest_tag(env)?;
        let mut annotations = self.registry.read_annotations(&latest)?;
        let status = LockStatus {
            environment: env.clone(),
            locked: true,
            reason: Some(reason.to_string()),
            locked_by: Some(operator.clone()),
            locked_at: Some(self.clock.now()),
        };
        status.write_annotations(&mut annotations);
        self.registry.write_annotations(&latest, &annotations)?;

        let trace_id = TraceId::generate();
        self.log.record(
            &ControllerLogEvent::new("lock", "locked")
                .environment(env)
                .operator(operator)
                .detail(reason)
                .trace_id(&trace_id),
        );
        let notification =
            lock_notification(LifecycleEvent::Lock, env, operator, reason, self.clock.now());
        self.emit(&notification, &trace_id);
        Ok(status)
    }

    /// Unlocks an environment. Unlocking an unlocked environment writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError`] when the environment is unknown or the
    /// registry cannot be read or written.
    pub fn unlock(
        &self,
        env: &EnvironmentName,
        reason: &str,
        operator: &OperatorId,
    ) -> Result<LockStatus, PromotionError> {
        self.require_environment(env)?;
        let latest = latest_tag(env)?;
        let mut annotations = self.registry.read_annotations(&latest)?;
        let current = LockStatus::from_annotations(env.clone(), &annotations);
        let trace_id = TraceId::generate();
        if !current.locked {
            self.log.record(
                &ControllerLogEvent::new("unlock", "noop")
                    .environment(env)
                    .operator(operator)
                    .trace_id(&trace_id),
            );
            return Ok(current);
        }
        clear_lock_annotations(&mut annotations);
        self.registry.write_annotations(&latest, &annotations)?;
        let status = LockStatus::unlocked(env.clone());

        self.log.record(
            &ControllerLogEvent::new("unlock", "unlocked")
                .environment(env)
                .operator(operator)
                .detail(reason)
                .trace_id(&trace_id),
        );
        let notification =
            lock_notification(LifecycleEvent::Unlock, env, operator, reason, self.clock.now());
        self.emit(&notification, &trace_id);
        Ok(status)
    }

    /// Reads the current lock state of an environment from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError`] when the environment is unknown or the
    /// registry cannot be read.
    pub fn get_lock_status(&self, env: &EnvironmentName) -> Result<LockStatus, PromotionError> {
        self.require_environment(env)?;
        let annotations = self.registry.read_annotations(&latest_tag(env)?)?;
        Ok(LockStatus::from_annotations(env.clone(), &annotations))
    }

    // ------------------------------------------------------------------------
    // Shared Helpers
    // ------------------------------------------------------------------------

    /// Fails when the environment is not part of the chain.
    pub(super) fn require_environment(
        &self,
        env: &EnvironmentName,
    ) -> Result<&EnvironmentConfig, PromotionError> {
        self.chain
            .get(env)
            .ok_or_else(|| PromotionError::InvalidInput(format!("unknown environment: {env}")))
    }

    /// Fails with [`PromotionError::EnvironmentLocked`] when `env` is locked.
    pub(super) fn ensure_unlocked(&self, env: &EnvironmentName) -> Result<(), PromotionError> {
        let status = self.get_lock_status(env)?;
        if status.locked {
            return Err(PromotionError::EnvironmentLocked {
                environment: status.environment,
                locked_by: status.locked_by,
                reason: status.reason,
            });
        }
        Ok(())
    }

    /// Returns the per-target mutex for `key`.
    pub(super) fn target_mutex(&self, key: String) -> Result<Arc<Mutex<()>>, PromotionError> {
        let mut locks = self
            .target_locks
            .lock()
            .map_err(|_| PromotionError::internal("target mutex map poisoned"))?;
        Ok(Arc::clone(locks.entry(key).or_default()))
    }

    /// Resolves a tag to its digest, treating a missing tag as `None`.
    pub(super) fn resolve_optional(&self, tag: &TagName) -> Result<Option<Digest>, PromotionError> {
        match self.registry.get_manifest(tag) {
            Ok(manifest) => Ok(Some(manifest.digest)),
            Err(RegistryError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Points a mutable tag at `digest`. Semantic-version tags are refused.
    pub(super) fn repoint(&self, digest: &Digest, tag: &TagName) -> Result<(), PromotionError> {
        if is_immutable_tag(tag) {
            return Err(PromotionError::internal(format!("refusing to repoint immutable tag {tag}")));
        }
        self.registry.tag_artifact(digest, tag)?;
        Ok(())
    }

    /// Enqueues a notification; returns a warning when it was dropped.
    pub(super) fn emit(
        &self,
        notification: &LifecycleNotification,
        trace_id: &TraceId,
    ) -> Option<String> {
        let err = self.notifier.notify(notification).err()?;
        let warning = format!("{} notification dropped: {err}", notification.event_type);
        self.log.record(
            &ControllerLogEvent::new("notification_dropped", "error")
                .environment(&notification.target_environment)
                .detail(warning.clone())
                .trace_id(trace_id),
        );
        Some(warning)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fails unless `tag` is a semantic-version tag.
pub(super) fn require_semver(tag: &TagName) -> Result<SemVer, PromotionError> {
    SemVer::parse(tag.as_str()).ok_or_else(|| {
        PromotionError::InvalidInput(format!("tag {tag} is not a semantic version"))
    })
}

/// Returns the log outcome label for a promotion outcome.
const fn outcome_label(outcome: PromotionOutcome) -> &'static str {
    match outcome {
        PromotionOutcome::Promoted => "promoted",
        PromotionOutcome::NoOp => "no_op",
        PromotionOutcome::DryRun => "dry_run",
    }
}

/// Builds a lock or unlock notification.
fn lock_notification(
    event_type: LifecycleEvent,
    env: &EnvironmentName,
    operator: &OperatorId,
    reason: &str,
    timestamp: Timestamp,
) -> LifecycleNotification {
    LifecycleNotification {
        event_type,
        artifact_tag: None,
        artifact_digest: None,
        source_environment: None,
        target_environment: env.clone(),
        operator: operator.clone(),
        timestamp,
        reason: Some(reason.to_string()).filter(|reason| !reason.is_empty()),
    }
}
