// crates/release-gate-core/tests/chain_gates.rs
// ============================================================================
// Module: Environment Chain and Gate Tests
// Description: Chain validation, transition rules, and ordered gate evaluation.
// ============================================================================

//! Environment Chain and Gate Tests for release-gate-core.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use release_gate_core::AnnotationGateEvaluator;
use release_gate_core::ChainError;
use release_gate_core::Digest;
use release_gate_core::EnvironmentChain;
use release_gate_core::EnvironmentConfig;
use release_gate_core::EnvironmentName;
use release_gate_core::GateContext;
use release_gate_core::GateError;
use release_gate_core::GateEvaluator;
use release_gate_core::GateId;
use release_gate_core::GateRequirement;
use release_gate_core::GateStatus;
use release_gate_core::GateVerdict;
use release_gate_core::TagName;
use release_gate_core::evaluate_gates;

fn env(name: &str) -> EnvironmentName {
    EnvironmentName::parse(name).unwrap()
}

fn gate(name: &str) -> GateId {
    GateId::parse(name).unwrap()
}

fn chain(allow_skip: bool) -> EnvironmentChain {
    EnvironmentChain::new(
        vec![
            EnvironmentConfig::new(env("dev")),
            EnvironmentConfig::new(env("staging")),
            EnvironmentConfig::new(env("prod")),
        ],
        allow_skip,
    )
    .unwrap()
}

// ============================================================================
// SECTION: Chain
// ============================================================================

#[test]
fn chain_rejects_empty_and_duplicates() {
    assert_eq!(EnvironmentChain::new(Vec::new(), false).unwrap_err(), ChainError::Empty);

    let duplicate_env = EnvironmentChain::new(
        vec![EnvironmentConfig::new(env("dev")), EnvironmentConfig::new(env("dev"))],
        false,
    );
    assert_eq!(duplicate_env.unwrap_err(), ChainError::DuplicateEnvironment("dev".to_string()));

    let duplicate_gate = EnvironmentChain::new(
        vec![
            EnvironmentConfig::new(env("prod"))
                .with_gate(GateRequirement::required(gate("tests")))
                .with_gate(GateRequirement::advisory(gate("tests"))),
        ],
        false,
    );
    assert_eq!(
        duplicate_gate.unwrap_err(),
        ChainError::DuplicateGate {
            environment: "prod".to_string(),
            gate: "tests".to_string(),
        }
    );
}

#[test]
fn strict_chain_allows_only_adjacent_forward_steps() {
    let chain = chain(false);

    assert!(chain.is_valid_transition(&env("dev"), &env("staging")));
    assert!(chain.is_valid_transition(&env("staging"), &env("prod")));
    assert!(!chain.is_valid_transition(&env("dev"), &env("prod")));
    assert!(!chain.is_valid_transition(&env("prod"), &env("staging")));
    assert!(!chain.is_valid_transition(&env("dev"), &env("dev")));
    assert!(!chain.is_valid_transition(&env("dev"), &env("qa")));
}

#[test]
fn skip_chain_allows_any_forward_step() {
    let chain = chain(true);

    assert!(chain.allows_skip());
    assert!(chain.is_valid_transition(&env("dev"), &env("prod")));
    assert!(!chain.is_valid_transition(&env("prod"), &env("dev")));
}

#[test]
fn chain_navigation_helpers() {
    let chain = chain(false);

    assert_eq!(chain.position(&env("staging")), Some(1));
    assert_eq!(chain.predecessor(&env("staging")).map(|c| c.name.as_str()), Some("dev"));
    assert!(chain.predecessor(&env("dev")).is_none());
    let downstream: Vec<&str> =
        chain.downstream_of(&env("dev")).iter().map(|c| c.name.as_str()).collect();
    assert_eq!(downstream, vec!["staging", "prod"]);
    assert!(chain.downstream_of(&env("prod")).is_empty());
    assert!(chain.downstream_of(&env("qa")).is_empty());
}

// ============================================================================
// SECTION: Gates
// ============================================================================

/// Evaluator returning scripted verdicts and recording evaluation order.
struct ScriptedEvaluator {
    verdicts: BTreeMap<String, Result<GateVerdict, GateError>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedEvaluator {
    fn new(verdicts: Vec<(&str, Result<GateVerdict, GateError>)>) -> Self {
        Self {
            verdicts: verdicts.into_iter().map(|(id, v)| (id.to_string(), v)).collect(),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl GateEvaluator for ScriptedEvaluator {
    fn evaluate(&self, gate: &GateId, _ctx: &GateContext<'_>) -> Result<GateVerdict, GateError> {
        self.seen.lock().unwrap().push(gate.to_string());
        self.verdicts.get(gate.as_str()).cloned().unwrap_or(Ok(GateVerdict::Pass))
    }
}

struct Fixture {
    tag: TagName,
    digest: Digest,
    source: EnvironmentName,
    target: EnvironmentName,
    annotations: BTreeMap<String, String>,
}

impl Fixture {
    fn new(annotations: BTreeMap<String, String>) -> Self {
        Self {
            tag: TagName::parse("v1.0.0").unwrap(),
            digest: Digest::of_bytes(b"build"),
            source: env("staging"),
            target: env("prod"),
            annotations,
        }
    }

    fn ctx(&self) -> GateContext<'_> {
        GateContext {
            tag: &self.tag,
            digest: &self.digest,
            source_environment: &self.source,
            target_environment: &self.target,
            annotations: &self.annotations,
        }
    }
}

#[test]
fn unrequired_gates_are_skipped_without_evaluation() {
    let fixture = Fixture::new(BTreeMap::new());
    let evaluator = ScriptedEvaluator::new(Vec::new());
    let requirements =
        vec![GateRequirement::optional(gate("load_test")), GateRequirement::required(gate("tests"))];

    let outcome = evaluate_gates(&requirements, &evaluator, &fixture.ctx());

    assert_eq!(outcome.results[0].status, GateStatus::Skipped);
    assert_eq!(outcome.results[1].status, GateStatus::Passed);
    assert_eq!(evaluator.seen(), vec!["tests".to_string()]);
    assert!(outcome.blocking_failure.is_none());
}

#[test]
fn advisory_failures_become_warnings() {
    let fixture = Fixture::new(BTreeMap::new());
    let evaluator = ScriptedEvaluator::new(vec![(
        "policy_compliance",
        Ok(GateVerdict::Fail("policy drift".to_string())),
    )]);
    let requirements = vec![
        GateRequirement::advisory(gate("policy_compliance")),
        GateRequirement::required(gate("tests")),
    ];

    let outcome = evaluate_gates(&requirements, &evaluator, &fixture.ctx());

    assert!(outcome.blocking_failure.is_none());
    assert_eq!(outcome.warnings, vec!["advisory gate policy_compliance failed: policy drift"]);
    assert_eq!(outcome.results[0].status, GateStatus::Failed);
    assert!(outcome.results[0].advisory);
}

#[test]
fn first_blocking_failure_stops_evaluation() {
    let fixture = Fixture::new(BTreeMap::new());
    let evaluator = ScriptedEvaluator::new(vec![(
        "tests",
        Err(GateError::Evaluation("runner offline".to_string())),
    )]);
    let requirements = vec![
        GateRequirement::required(gate("tests")),
        GateRequirement::required(gate("security_scan")),
    ];

    let outcome = evaluate_gates(&requirements, &evaluator, &fixture.ctx());

    let failure = outcome.blocking_failure.unwrap();
    assert_eq!(failure.gate.as_str(), "tests");
    assert!(failure.detail.unwrap().contains("runner offline"));
    assert_eq!(evaluator.seen(), vec!["tests".to_string()]);
    assert_eq!(outcome.results.len(), 1);
}

#[test]
fn annotation_evaluator_fails_closed() {
    let mut annotations = BTreeMap::new();
    annotations.insert("gate.tests".to_string(), "passed".to_string());
    annotations.insert("gate.security_scan".to_string(), "failed".to_string());
    annotations.insert("gate.policy_compliance".to_string(), "pending".to_string());
    let fixture = Fixture::new(annotations);
    let evaluator = AnnotationGateEvaluator;

    let verdict = |id: &str| evaluator.evaluate(&gate(id), &fixture.ctx()).unwrap();

    assert_eq!(verdict("tests"), GateVerdict::Pass);
    assert!(matches!(verdict("security_scan"), GateVerdict::Fail(_)));
    assert!(matches!(verdict("policy_compliance"), GateVerdict::Fail(_)));
    assert!(matches!(verdict("license_check"), GateVerdict::Fail(_)));
}
