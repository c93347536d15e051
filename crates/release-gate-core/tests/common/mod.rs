// crates/release-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Controller Test Fixtures
// Description: Shared chain, registry, and verifier fixtures for controller tests.
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are used by a subset of test binaries.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures unwrap deterministic values."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use release_gate_core::Artifact;
use release_gate_core::AuditError;
use release_gate_core::AuditTrail;
use release_gate_core::Clock;
use release_gate_core::ControllerSettings;
use release_gate_core::Digest;
use release_gate_core::EnvironmentChain;
use release_gate_core::EnvironmentConfig;
use release_gate_core::EnvironmentName;
use release_gate_core::GateId;
use release_gate_core::GateRequirement;
use release_gate_core::InMemoryAuditTrail;
use release_gate_core::InMemoryNotifier;
use release_gate_core::InMemoryRegistry;
use release_gate_core::MemoryLogSink;
use release_gate_core::OperatorId;
use release_gate_core::PromotionController;
use release_gate_core::PromotionRecord;
use release_gate_core::PromotionRequest;
use release_gate_core::RegistryTransport;
use release_gate_core::RollbackRecord;
use release_gate_core::SignatureMetadata;
use release_gate_core::SignatureMode;
use release_gate_core::SignaturePolicy;
use release_gate_core::SignatureVerifier;
use release_gate_core::TagName;
use release_gate_core::Timestamp;
use release_gate_core::VerificationError;
use release_gate_core::VerifiedSignature;

/// Controller type used across controller tests.
pub type TestController =
    PromotionController<InMemoryRegistry, DigestVerifier, InMemoryNotifier, SwitchableAuditTrail>;

pub fn env(name: &str) -> EnvironmentName {
    EnvironmentName::parse(name).unwrap()
}

pub fn tag(name: &str) -> TagName {
    TagName::parse(name).unwrap()
}

pub fn gate(name: &str) -> GateId {
    GateId::parse(name).unwrap()
}

pub fn operator(name: &str) -> OperatorId {
    OperatorId::new(name)
}

/// dev -> staging -> prod.
///
/// staging: `tests` required, signatures optional.
/// prod: `tests` and `security_scan` required, `policy_compliance` advisory,
/// signatures required.
pub fn standard_chain() -> EnvironmentChain {
    let dev = EnvironmentConfig::new(env("dev")).with_consumer("dev-dashboard");
    let staging = EnvironmentConfig::new(env("staging"))
        .with_gate(GateRequirement::required(gate("tests")))
        .with_gate(GateRequirement::optional(gate("load_test")))
        .with_signature(SignaturePolicy::Optional)
        .with_consumer("billing-api");
    let prod = EnvironmentConfig::new(env("prod"))
        .with_gate(GateRequirement::required(gate("tests")))
        .with_gate(GateRequirement::required(gate("security_scan")))
        .with_gate(GateRequirement::advisory(gate("policy_compliance")))
        .with_signature(SignaturePolicy::Required)
        .with_consumer("edge-cache");
    EnvironmentChain::new(vec![dev, staging, prod], false).unwrap()
}

/// Deterministic clock advancing one second per reading.
#[derive(Debug, Clone)]
pub struct SteppingClock {
    next: Arc<Mutex<i64>>,
}

impl SteppingClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            next: Arc::new(Mutex::new(start_ms)),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Timestamp {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next += 1_000;
        Timestamp::from_unix_millis(now)
    }
}

/// Verifier that accepts a bundle equal to the content digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestVerifier;

impl SignatureVerifier for DigestVerifier {
    fn verify(
        &self,
        metadata: &SignatureMetadata,
        content: &[u8],
    ) -> Result<VerifiedSignature, VerificationError> {
        let digest = Digest::of_bytes(content);
        if metadata.bundle != digest.as_str() {
            return Err(VerificationError::InvalidSignature("bundle does not match".to_string()));
        }
        Ok(VerifiedSignature {
            mode: metadata.mode,
            subject: metadata.subject.clone(),
            issuer: metadata.issuer.clone(),
            log_index: metadata.log_index,
            fingerprint: "test-key".to_string(),
        })
    }
}

/// In-memory audit trail whose appends can be switched to fail.
#[derive(Debug, Clone, Default)]
pub struct SwitchableAuditTrail {
    inner: InMemoryAuditTrail,
    failing: Arc<AtomicBool>,
}

impl SwitchableAuditTrail {
    /// Makes every later append fail with a disk-full I/O error.
    pub fn fail_appends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AuditError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuditError::Io("disk full".to_string()));
        }
        Ok(())
    }
}

impl AuditTrail for SwitchableAuditTrail {
    fn append_promotion(&self, record: &PromotionRecord) -> Result<(), AuditError> {
        self.check()?;
        self.inner.append_promotion(record)
    }

    fn append_rollback(&self, record: &RollbackRecord) -> Result<(), AuditError> {
        self.check()?;
        self.inner.append_rollback(record)
    }

    fn promotions(&self) -> Result<Vec<PromotionRecord>, AuditError> {
        self.inner.promotions()
    }

    fn rollbacks(&self) -> Result<Vec<RollbackRecord>, AuditError> {
        self.inner.rollbacks()
    }
}

/// Controller plus shared handles to its collaborators.
pub struct Harness {
    pub controller: TestController,
    pub registry: InMemoryRegistry,
    pub notifier: InMemoryNotifier,
    pub audit: SwitchableAuditTrail,
    pub log: Arc<MemoryLogSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(standard_chain(), ControllerSettings::default(), InMemoryNotifier::new())
    }

    pub fn with(
        chain: EnvironmentChain,
        settings: ControllerSettings,
        notifier: InMemoryNotifier,
    ) -> Self {
        let registry = InMemoryRegistry::new();
        let audit = SwitchableAuditTrail::default();
        let log = Arc::new(MemoryLogSink::new());
        let controller = PromotionController::new(
            chain,
            settings,
            registry.clone(),
            DigestVerifier,
            notifier.clone(),
            audit.clone(),
        )
        .with_clock(SteppingClock::new(1_700_000_000_000))
        .with_log_sink(log.clone());
        Self {
            controller,
            registry,
            notifier,
            audit,
            log,
        }
    }

    /// Pushes `content` under `name` with the given annotations.
    pub fn publish(&self, name: &str, content: &[u8], annotations: BTreeMap<String, String>) -> Digest {
        let tag = tag(name);
        let digest = self.registry.push(&Artifact::new(content.to_vec()), &tag).unwrap();
        self.registry.write_annotations(&tag, &annotations).unwrap();
        digest
    }
}

/// Annotations marking every standard gate as passed.
pub fn passing_gates() -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    for gate in ["tests", "security_scan", "policy_compliance"] {
        annotations.insert(format!("gate.{gate}"), "passed".to_string());
    }
    annotations
}

/// Adds signature annotations that [`DigestVerifier`] accepts for `content`.
pub fn sign(mut annotations: BTreeMap<String, String>, content: &[u8]) -> BTreeMap<String, String> {
    let metadata = SignatureMetadata {
        bundle: Digest::of_bytes(content).as_str().to_string(),
        mode: SignatureMode::Key,
        issuer: None,
        subject: None,
        signed_at: Timestamp::from_unix_millis(1_699_999_999_000),
        log_index: None,
        cert_fingerprint: Some("test-key".to_string()),
    };
    metadata.write_annotations(&mut annotations);
    annotations
}

pub fn request(name: &str, from: &str, to: &str) -> PromotionRequest {
    PromotionRequest::new(tag(name), env(from), env(to), operator("alice"))
}
