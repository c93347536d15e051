// crates/release-gate-core/src/core/environment.rs
// ============================================================================
// Module: Release Gate Environment Chain
// Description: Ordered environment definitions and their promotion gates.
// Purpose: Decide which transitions are legal and what each target requires.
// Dependencies: crate::core::identifiers, serde, thiserror
// ============================================================================

//! ## Overview
//! An [`EnvironmentChain`] is the fixed, ordered list of environments an
//! artifact moves through. Each [`EnvironmentConfig`] lists its gates in the
//! order they are evaluated and the signature policy applied to artifacts
//! entering it.
//!
//! Invariants:
//! - Environment names are unique within a chain.
//! - Without `allow_skip`, only `chain[i] -> chain[i + 1]` is a valid transition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::EnvironmentName;
use crate::core::identifiers::GateId;

// ============================================================================
// SECTION: Gates
// ============================================================================

/// Gate requirement attached to an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRequirement {
    /// Gate identifier.
    pub gate: GateId,
    /// Whether the gate is evaluated at all. Unrequired gates are recorded as skipped.
    pub required: bool,
    /// Advisory gates record failures as warnings instead of aborting.
    pub advisory: bool,
}

impl GateRequirement {
    /// Creates a required, blocking gate.
    #[must_use]
    pub const fn required(gate: GateId) -> Self {
        Self {
            gate,
            required: true,
            advisory: false,
        }
    }

    /// Creates a required, advisory gate.
    #[must_use]
    pub const fn advisory(gate: GateId) -> Self {
        Self {
            gate,
            required: true,
            advisory: true,
        }
    }

    /// Creates a gate that is configured but not required.
    #[must_use]
    pub const fn optional(gate: GateId) -> Self {
        Self {
            gate,
            required: false,
            advisory: false,
        }
    }
}

// ============================================================================
// SECTION: Signature Policy
// ============================================================================

/// Signature requirement for artifacts entering an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignaturePolicy {
    /// Signatures are not checked.
    #[default]
    Disabled,
    /// Signatures are verified when present; missing signatures warn.
    Optional,
    /// A valid signature is mandatory.
    Required,
}

// ============================================================================
// SECTION: Environments
// ============================================================================

/// Configuration for one environment in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Environment name.
    pub name: EnvironmentName,
    /// Gates in evaluation order.
    pub gates: Vec<GateRequirement>,
    /// Signature policy for inbound promotions.
    pub signature: SignaturePolicy,
    /// Downstream consumers affected by changes in this environment.
    pub consumers: Vec<String>,
}

impl EnvironmentConfig {
    /// Creates an environment with no gates and signatures disabled.
    #[must_use]
    pub const fn new(name: EnvironmentName) -> Self {
        Self {
            name,
            gates: Vec::new(),
            signature: SignaturePolicy::Disabled,
            consumers: Vec::new(),
        }
    }

    /// Appends a gate requirement.
    #[must_use]
    pub fn with_gate(mut self, gate: GateRequirement) -> Self {
        self.gates.push(gate);
        self
    }

    /// Sets the signature policy.
    #[must_use]
    pub const fn with_signature(mut self, policy: SignaturePolicy) -> Self {
        self.signature = policy;
        self
    }

    /// Appends a downstream consumer label.
    #[must_use]
    pub fn with_consumer(mut self, consumer: impl Into<String>) -> Self {
        self.consumers.push(consumer.into());
        self
    }
}

// ============================================================================
// SECTION: Chain Errors
// ============================================================================

/// Errors raised while building or walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Chain has no environments.
    #[error("environment chain is empty")]
    Empty,
    /// Environment appears more than once.
    #[error("duplicate environment: {0}")]
    DuplicateEnvironment(String),
    /// Gate appears more than once within an environment.
    #[error("duplicate gate {gate} in environment {environment}")]
    DuplicateGate {
        /// Environment name.
        environment: String,
        /// Gate identifier.
        gate: String,
    },
}

// ============================================================================
// SECTION: Chain
// ============================================================================

/// Ordered promotion chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentChain {
    /// Environments in promotion order.
    environments: Vec<EnvironmentConfig>,
    /// Permit forward jumps that skip intermediate environments.
    allow_skip: bool,
}

impl EnvironmentChain {
    /// Builds a chain from ordered environments.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] when the chain is empty or has duplicate names or gates.
    pub fn new(environments: Vec<EnvironmentConfig>, allow_skip: bool) -> Result<Self, ChainError> {
        if environments.is_empty() {
            return Err(ChainError::Empty);
        }
        let mut names = BTreeSet::new();
        for env in &environments {
            if !names.insert(env.name.as_str()) {
                return Err(ChainError::DuplicateEnvironment(env.name.to_string()));
            }
            let mut gates = BTreeSet::new();
            for requirement in &env.gates {
                if !gates.insert(requirement.gate.as_str()) {
                    return Err(ChainError::DuplicateGate {
                        environment: env.name.to_string(),
                        gate: requirement.gate.to_string(),
                    });
                }
            }
        }
        Ok(Self {
            environments,
            allow_skip,
        })
    }

    /// Returns the environments in order.
    #[must_use]
    pub fn environments(&self) -> &[EnvironmentConfig] {
        &self.environments
    }

    /// Returns whether forward skips are allowed.
    #[must_use]
    pub const fn allows_skip(&self) -> bool {
        self.allow_skip
    }

    /// Returns the position of an environment in the chain.
    #[must_use]
    pub fn position(&self, name: &EnvironmentName) -> Option<usize> {
        self.environments.iter().position(|env| env.name == *name)
    }

    /// Returns the environment configuration by name.
    #[must_use]
    pub fn get(&self, name: &EnvironmentName) -> Option<&EnvironmentConfig> {
        self.environments.iter().find(|env| env.name == *name)
    }

    /// Returns the environment that precedes `name`, if any.
    #[must_use]
    pub fn predecessor(&self, name: &EnvironmentName) -> Option<&EnvironmentConfig> {
        let index = self.position(name)?;
        index.checked_sub(1).and_then(|prev| self.environments.get(prev))
    }

    /// Returns environments strictly after `name` in chain order.
    #[must_use]
    pub fn downstream_of(&self, name: &EnvironmentName) -> &[EnvironmentConfig] {
        match self.position(name) {
            Some(index) => self.environments.get(index + 1 ..).unwrap_or(&[]),
            None => &[],
        }
    }

    /// Returns true when `from -> to` is a permitted promotion.
    #[must_use]
    pub fn is_valid_transition(&self, from: &EnvironmentName, to: &EnvironmentName) -> bool {
        let (Some(from_index), Some(to_index)) = (self.position(from), self.position(to)) else {
            return false;
        };
        if self.allow_skip { to_index > from_index } else { to_index == from_index + 1 }
    }
}
