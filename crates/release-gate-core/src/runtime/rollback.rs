// crates/release-gate-core/src/runtime/rollback.rs
// ============================================================================
// Module: Release Gate Rollback
// Description: Rollback execution and read-only rollback impact analysis.
// Purpose: Revert an environment to a previously promoted version safely.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! A rollback never moves an existing semantic-version tag. It creates a new
//! write-once tag `v{X.Y.Z}-{env}-rollback-{N}` at the target digest and then
//! repoints the mutable `latest-{env}` pointer. The rollback index is searched
//! through the registry so concurrent or repeated rollbacks never collide.
//!
//! Impact analysis reads the audit trail and registry only; it is safe to
//! call while the environment is locked.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::error::PromotionError;
use crate::core::events::LifecycleEvent;
use crate::core::events::LifecycleNotification;
use crate::core::identifiers::Digest;
use crate::core::identifiers::EnvironmentName;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::RollbackId;
use crate::core::identifiers::TagName;
use crate::core::identifiers::TraceId;
use crate::core::records::PromotionOutcome;
use crate::core::records::PromotionRecord;
use crate::core::records::RollbackImpact;
use crate::core::records::RollbackRecord;
use crate::core::records::SCHEMA_VERSION_KEY;
use crate::core::records::SupersededArtifact;
use crate::core::tags::SemVer;
use crate::core::tags::environment_tag;
use crate::core::tags::latest_tag;
use crate::core::tags::rollback_tag;
use crate::interfaces::AuditTrail;
use crate::interfaces::EventNotifier;
use crate::interfaces::RegistryTransport;
use crate::interfaces::SignatureVerifier;
use crate::interfaces::TagReservation;
use crate::runtime::controller::PromotionController;
use crate::runtime::controller::require_semver;
use crate::runtime::log::ControllerLogEvent;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Rollback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackRequest {
    /// Previously promoted semantic-version tag to restore.
    pub tag: TagName,
    /// Environment to roll back.
    pub environment: EnvironmentName,
    /// Operator-supplied reason.
    pub reason: String,
    /// Requesting operator.
    pub operator: OperatorId,
    /// Caller-supplied trace identifier.
    pub trace_id: Option<TraceId>,
}

impl RollbackRequest {
    /// Creates a rollback request.
    #[must_use]
    pub fn new(
        tag: TagName,
        environment: EnvironmentName,
        reason: impl Into<String>,
        operator: OperatorId,
    ) -> Self {
        Self {
            tag,
            environment,
            reason: reason.into(),
            operator,
            trace_id: None,
        }
    }

    /// Sets the trace identifier.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

// ============================================================================
// SECTION: Rollback
// ============================================================================

impl<R, V, N, A> PromotionController<R, V, N, A>
where
    R: RegistryTransport,
    V: SignatureVerifier,
    N: EventNotifier,
    A: AuditTrail,
{
    /// Rolls an environment back to a previously promoted version.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError::VersionNotPromoted`] when the version never
    /// reached the environment, [`PromotionError::Authorization`] when the
    /// operator lacks a required group, and [`PromotionError::EnvironmentLocked`]
    /// when the environment is frozen. No registry writes happen in those cases.
    pub fn rollback(&self, request: &RollbackRequest) -> Result<RollbackRecord, PromotionError> {
        let trace_id = request.trace_id.clone().unwrap_or_else(TraceId::generate);
        let result = self.rollback_inner(request, &trace_id);
        let mut event = ControllerLogEvent::new(
            "rollback",
            match &result {
                Ok(_) => "rolled_back",
                Err(err) => err.kind(),
            },
        )
        .environment(&request.environment)
        .tag(&request.tag)
        .operator(&request.operator)
        .trace_id(&trace_id);
        match &result {
            Ok(record) => event = event.detail(format!("created {}", record.rollback_tag)),
            Err(err) => event = event.detail(err.to_string()),
        }
        self.log.record(&event);
        result
    }

    /// Runs the rollback stages.
    fn rollback_inner(
        &self,
        request: &RollbackRequest,
        trace_id: &TraceId,
    ) -> Result<RollbackRecord, PromotionError> {
        let version = require_semver(&request.tag)?;
        self.require_environment(&request.environment)?;
        if request.reason.trim().is_empty() {
            return Err(PromotionError::InvalidInput(
                "rollback reason must not be empty".to_string(),
            ));
        }

        let guard_key = format!("rollback@{}", request.environment);
        let env_mutex = self.target_mutex(guard_key)?;
        let _guard = env_mutex
            .lock()
            .map_err(|_| PromotionError::internal("rollback mutex poisoned"))?;

        let promotions = self.audit_promotions()?;
        let target_digest = self
            .promoted_digest(&promotions, &request.tag, &request.environment)?
            .ok_or_else(|| PromotionError::VersionNotPromoted {
                tag: request.tag.clone(),
                environment: request.environment.clone(),
            })?;

        self.authorize_rollback(&request.operator)?;
        self.ensure_unlocked(&request.environment)?;

        let latest = latest_tag(&request.environment)?;
        let previous_digest = self.resolve_optional(&latest)?;
        let rollback_tag =
            self.reserve_rollback_tag(&version, &request.tag, &request.environment, &target_digest)?;
        self.repoint(&target_digest, &latest)?;

        let record = RollbackRecord {
            rollback_id: RollbackId::generate(),
            environment: request.environment.clone(),
            artifact_tag: request.tag.clone(),
            rollback_tag,
            target_digest: target_digest.clone(),
            previous_digest,
            reason: request.reason.clone(),
            operator: request.operator.clone(),
            timestamp: self.clock.now(),
            trace_id: trace_id.clone(),
        };
        self.audit.append_rollback(&record).map_err(|err| PromotionError::UnrecordedWrite {
            written: vec![record.rollback_tag.clone(), latest],
            detail: err.to_string(),
        })?;

        let notification = LifecycleNotification {
            event_type: LifecycleEvent::Rollback,
            artifact_tag: Some(request.tag.clone()),
            artifact_digest: Some(target_digest),
            source_environment: None,
            target_environment: request.environment.clone(),
            operator: request.operator.clone(),
            timestamp: record.timestamp,
            reason: Some(request.reason.clone()),
        };
        self.emit(&notification, trace_id);
        Ok(record)
    }

    /// Fails unless the operator belongs to one of the configured groups.
    fn authorize_rollback(&self, operator: &OperatorId) -> Result<(), PromotionError> {
        let required = &self.settings.rollback_groups;
        if required.is_empty() {
            return Ok(());
        }
        let groups = self.authorizer.groups_for(operator);
        if required.iter().any(|group| groups.contains(group)) {
            return Ok(());
        }
        Err(PromotionError::Authorization {
            operator: operator.clone(),
            required_groups: required.clone(),
        })
    }

    /// Creates the next free rollback tag for the version and environment.
    fn reserve_rollback_tag(
        &self,
        version: &SemVer,
        tag: &TagName,
        env: &EnvironmentName,
        digest: &Digest,
    ) -> Result<TagName, PromotionError> {
        let prior = self
            .audit
            .rollbacks()
            .map_err(|err| PromotionError::Audit(err.to_string()))?
            .into_iter()
            .filter(|record| {
                record.environment == *env
                    && SemVer::parse(record.artifact_tag.as_str())
                        .is_some_and(|prior| prior.core_tag() == version.core_tag())
            })
            .count();
        let start = u32::try_from(prior).unwrap_or(u32::MAX).saturating_add(1);
        for index in start ..= self.settings.max_rollback_index {
            let candidate = rollback_tag(tag, env, index)?;
            match self.registry.reserve_tag(digest, &candidate)? {
                TagReservation::Created => return Ok(candidate),
                TagReservation::Existing(_) => {}
            }
        }
        Err(PromotionError::internal(format!(
            "no free rollback tag for {} in {env} up to index {}",
            version.core_tag(),
            self.settings.max_rollback_index
        )))
    }

    /// Reads promotion records from the audit trail.
    fn audit_promotions(&self) -> Result<Vec<PromotionRecord>, PromotionError> {
        self.audit.promotions().map_err(|err| PromotionError::Audit(err.to_string()))
    }

    /// Returns the digest `tag` was promoted to `env` with, if it ever was.
    ///
    /// The audit trail is consulted first; the environment tag in the registry
    /// covers promotions recorded by another controller.
    fn promoted_digest(
        &self,
        promotions: &[PromotionRecord],
        tag: &TagName,
        env: &EnvironmentName,
    ) -> Result<Option<Digest>, PromotionError> {
        let recorded = promotions
            .iter()
            .rev()
            .find(|record| is_effective_promotion(record, tag, env))
            .map(|record| record.artifact_digest.clone());
        if recorded.is_some() {
            return Ok(recorded);
        }
        self.resolve_optional(&environment_tag(tag, env)?)
    }

    // ------------------------------------------------------------------------
    // Impact Analysis
    // ------------------------------------------------------------------------

    /// Reports what rolling `env` back to `tag` would affect. Writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError::VersionNotPromoted`] when the version never
    /// reached the environment, or registry and audit errors.
    pub fn analyze_rollback_impact(
        &self,
        tag: &TagName,
        env: &EnvironmentName,
    ) -> Result<RollbackImpact, PromotionError> {
        require_semver(tag)?;
        let config = self.require_environment(env)?;
        let promotions = self.audit_promotions()?;
        let target_digest = self.promoted_digest(&promotions, tag, env)?.ok_or_else(|| {
            PromotionError::VersionNotPromoted {
                tag: tag.clone(),
                environment: env.clone(),
            }
        })?;

        let last_target = promotions.iter().rposition(|record| is_effective_promotion(record, tag, env));
        let mut superseded: Vec<SupersededArtifact> = Vec::new();
        let after = last_target.map_or(0, |index| index + 1);
        for record in promotions.iter().skip(after) {
            if record.target_environment != *env
                || record.outcome != PromotionOutcome::Promoted
                || record.artifact_tag == *tag
            {
                continue;
            }
            superseded.retain(|existing| existing.artifact_tag != record.artifact_tag);
            superseded.push(SupersededArtifact {
                artifact_tag: record.artifact_tag.clone(),
                artifact_digest: record.artifact_digest.clone(),
                promoted_at: record.timestamp,
                schema_version: self.schema_version(&record.artifact_tag)?,
            });
        }

        let target_schema = self.schema_version(tag)?;
        let breaking_changes = breaking_changes(tag, target_schema.as_deref(), &superseded);

        let superseded_tags: BTreeSet<&str> =
            superseded.iter().map(|artifact| artifact.artifact_tag.as_str()).collect();
        let mut affected_consumers: Vec<String> = Vec::new();
        let mut affected_environments: Vec<String> = Vec::new();
        for consumer in &config.consumers {
            push_unique(&mut affected_consumers, consumer.clone());
        }
        for downstream in self.chain.downstream_of(env) {
            let received = promotions.iter().any(|record| {
                record.target_environment == downstream.name
                    && record.outcome == PromotionOutcome::Promoted
                    && superseded_tags.contains(record.artifact_tag.as_str())
            });
            if received {
                affected_environments.push(downstream.name.to_string());
                push_unique(&mut affected_consumers, format!("environment:{}", downstream.name));
                for consumer in &downstream.consumers {
                    push_unique(&mut affected_consumers, consumer.clone());
                }
            }
        }

        let current_digest = self.resolve_optional(&latest_tag(env)?)?;
        let lock = self.get_lock_status(env)?;

        let mut recommendations = Vec::new();
        if lock.locked {
            recommendations.push(format!(
                "environment {env} is locked by {}; unlock it before rolling back",
                lock.locked_by.as_ref().map_or("unknown", OperatorId::as_str)
            ));
        }
        if current_digest.as_ref() == Some(&target_digest) {
            recommendations.push(format!("{env} already serves {tag}; no rollback is needed"));
        }
        if !superseded.is_empty() {
            let tags: Vec<&str> = superseded.iter().map(|a| a.artifact_tag.as_str()).collect();
            recommendations.push(format!(
                "{} newer version(s) will be rolled past: {}",
                superseded.len(),
                tags.join(", ")
            ));
        }
        if !breaking_changes.is_empty() {
            recommendations
                .push("confirm schema compatibility with consumers before rolling back".to_string());
        }
        for downstream in &affected_environments {
            recommendations.push(format!(
                "downstream environment {downstream} received rolled-past versions; consider rolling it back too"
            ));
        }
        if recommendations.is_empty() {
            recommendations.push(format!("low risk: no newer versions were promoted to {env}"));
        }

        self.log.record(
            &ControllerLogEvent::new("rollback_impact", "analyzed")
                .environment(env)
                .tag(tag)
                .detail(format!(
                    "superseded={} breaking={}",
                    superseded.len(),
                    breaking_changes.len()
                )),
        );

        Ok(RollbackImpact {
            artifact_tag: tag.clone(),
            environment: env.clone(),
            target_digest,
            current_digest,
            superseded,
            breaking_changes,
            affected_consumers,
            recommendations,
            lock,
        })
    }

    /// Reads the schema version annotation of a tag.
    fn schema_version(&self, tag: &TagName) -> Result<Option<String>, PromotionError> {
        Ok(self.registry.read_annotations(tag)?.get(SCHEMA_VERSION_KEY).cloned())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true for a promotion of `tag` into `env` that changed the registry.
fn is_effective_promotion(record: &PromotionRecord, tag: &TagName, env: &EnvironmentName) -> bool {
    record.artifact_tag == *tag
        && record.target_environment == *env
        && record.outcome != PromotionOutcome::DryRun
}

/// Lists superseded artifacts whose schema major differs from the target's.
fn breaking_changes(
    tag: &TagName,
    target_schema: Option<&str>,
    superseded: &[SupersededArtifact],
) -> Vec<String> {
    let Some(target_schema) = target_schema else {
        return Vec::new();
    };
    let Some(target_major) = schema_major(target_schema) else {
        return Vec::new();
    };
    superseded
        .iter()
        .filter_map(|artifact| {
            let schema = artifact.schema_version.as_deref()?;
            let major = schema_major(schema)?;
            (major != target_major).then(|| {
                format!(
                    "{} uses schema {schema} but {tag} uses schema {target_schema} (major {major} -> {target_major})",
                    artifact.artifact_tag
                )
            })
        })
        .collect()
}

/// Extracts the major component of a schema version such as `2.1` or `v3`.
fn schema_major(version: &str) -> Option<u64> {
    let trimmed = version.trim().trim_start_matches(['v', 'V']);
    trimmed.split('.').next().and_then(|major| major.parse().ok())
}

/// Appends `value` when not already present.
fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}
