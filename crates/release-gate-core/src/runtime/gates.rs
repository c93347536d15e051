// crates/release-gate-core/src/runtime/gates.rs
// ============================================================================
// Module: Release Gate Gate Evaluation
// Description: Ordered gate evaluation and the annotation-backed evaluator.
// Purpose: Turn environment gate requirements into recorded gate results.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Gates run in configured order. Unrequired gates are recorded as skipped,
//! advisory failures become warnings, and the first blocking failure stops
//! evaluation. Evaluator errors count as failures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::environment::GateRequirement;
use crate::core::identifiers::GateId;
use crate::core::records::GateResult;
use crate::core::records::GateStatus;
use crate::interfaces::GateContext;
use crate::interfaces::GateError;
use crate::interfaces::GateEvaluator;
use crate::interfaces::GateVerdict;

// ============================================================================
// SECTION: Annotation Evaluator
// ============================================================================

/// Annotation key prefix holding gate verdicts.
pub const GATE_ANNOTATION_PREFIX: &str = "gate.";

/// Reads gate verdicts from `gate.<id>` artifact annotations.
///
/// `passed` passes, `failed` fails, and a missing or unrecognized value fails
/// closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotationGateEvaluator;

impl GateEvaluator for AnnotationGateEvaluator {
    fn evaluate(&self, gate: &GateId, ctx: &GateContext<'_>) -> Result<GateVerdict, GateError> {
        let key = format!("{GATE_ANNOTATION_PREFIX}{gate}");
        match ctx.annotations.get(&key).map(String::as_str) {
            Some("passed") => Ok(GateVerdict::Pass),
            Some("failed") => Ok(GateVerdict::Fail(format!("{key} is failed"))),
            Some(other) => Ok(GateVerdict::Fail(format!("{key} has unrecognized value {other}"))),
            None => Ok(GateVerdict::Fail(format!("{key} is not recorded"))),
        }
    }
}

// ============================================================================
// SECTION: Ordered Evaluation
// ============================================================================

/// Result of evaluating an environment's gates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GateOutcome {
    /// Results in evaluation order.
    pub results: Vec<GateResult>,
    /// Advisory failure warnings.
    pub warnings: Vec<String>,
    /// First blocking failure, if any.
    pub blocking_failure: Option<GateResult>,
}

/// Evaluates gate requirements in order, stopping at the first blocking failure.
pub fn evaluate_gates(
    requirements: &[GateRequirement],
    evaluator: &dyn GateEvaluator,
    ctx: &GateContext<'_>,
) -> GateOutcome {
    let mut outcome = GateOutcome::default();
    for requirement in requirements {
        if !requirement.required {
            outcome.results.push(GateResult {
                gate: requirement.gate.clone(),
                status: GateStatus::Skipped,
                detail: None,
                advisory: requirement.advisory,
            });
            continue;
        }
        let failure = match evaluator.evaluate(&requirement.gate, ctx) {
            Ok(GateVerdict::Pass) => None,
            Ok(GateVerdict::Fail(detail)) => Some(detail),
            Err(err) => Some(err.to_string()),
        };
        let result = GateResult {
            gate: requirement.gate.clone(),
            status: if failure.is_some() { GateStatus::Failed } else { GateStatus::Passed },
            detail: failure.clone(),
            advisory: requirement.advisory,
        };
        outcome.results.push(result.clone());
        if let Some(detail) = failure {
            if requirement.advisory {
                outcome.warnings.push(format!("advisory gate {} failed: {detail}", requirement.gate));
            } else {
                outcome.blocking_failure = Some(result);
                break;
            }
        }
    }
    outcome
}
