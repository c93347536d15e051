// crates/release-gate-core/src/core/error.rs
// ============================================================================
// Module: Release Gate Error Taxonomy
// Description: Promotion, rollback, and lock failures with exit-code mapping.
// Purpose: Give callers a tagged failure type with structured payloads.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! [`PromotionError`] is the single failure type returned by controller
//! operations. Each variant carries what an operator needs to act (gate name,
//! existing digest, lock holder) and maps to a deterministic CLI exit code.
//! Unexpected failures are reduced to a bounded, sanitized summary before
//! they leave the controller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;

use crate::core::identifiers::Digest;
use crate::core::identifiers::EnvironmentName;
use crate::core::identifiers::GateId;
use crate::core::identifiers::IdentifierError;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::TagName;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Exit code for success.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code for unexpected internal failures.
pub const EXIT_INTERNAL: u8 = 1;
/// Exit code for bad input or tag format.
pub const EXIT_BAD_INPUT: u8 = 2;
/// Exit code when the registry is unavailable or the breaker is open.
pub const EXIT_REGISTRY_UNAVAILABLE: u8 = 5;
/// Exit code for signature verification failures.
pub const EXIT_SIGNATURE_FAILED: u8 = 6;
/// Exit code for gate validation failures.
pub const EXIT_GATE_FAILED: u8 = 8;
/// Exit code for invalid environment transitions.
pub const EXIT_INVALID_TRANSITION: u8 = 9;
/// Exit code when a tag exists with a different digest.
pub const EXIT_TAG_EXISTS: u8 = 10;
/// Exit code when a version was never promoted to the environment.
pub const EXIT_VERSION_NOT_PROMOTED: u8 = 11;
/// Exit code for authorization failures.
pub const EXIT_AUTHORIZATION_FAILED: u8 = 12;
/// Exit code when the environment is locked.
pub const EXIT_ENVIRONMENT_LOCKED: u8 = 13;

/// Maximum length of a sanitized error summary.
pub const MAX_ERROR_SUMMARY_CHARS: usize = 256;

// ============================================================================
// SECTION: Registry Errors
// ============================================================================

/// Errors reported by a registry transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Registry could not be reached or answered with a server error.
    #[error("registry unavailable: {0}")]
    Unavailable(String),
    /// Circuit breaker is open; the call was not attempted.
    #[error("registry circuit breaker is open")]
    CircuitOpen,
    /// Reference does not exist.
    #[error("registry reference not found: {0}")]
    NotFound(String),
    /// Registry rejected the credentials.
    #[error("registry rejected credentials: {0}")]
    Unauthorized(String),
    /// Registry response violated the protocol or limits.
    #[error("registry protocol error: {0}")]
    Protocol(String),
    /// Semantic-version tag already points at a different digest.
    #[error("immutable tag {tag} already points at {existing_digest}")]
    ImmutableTag {
        /// Write-once tag.
        tag: TagName,
        /// Digest the tag already resolves to.
        existing_digest: Digest,
    },
}

impl RegistryError {
    /// Returns true when the failure should count against the circuit breaker.
    #[must_use]
    pub const fn is_availability_failure(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

// ============================================================================
// SECTION: Promotion Errors
// ============================================================================

/// Failure of a controller operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromotionError {
    /// Caller input was malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Source tag does not exist in the registry.
    #[error("tag not found: {0}")]
    TagNotFound(TagName),
    /// Transition is not allowed by the environment chain.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Source environment.
        from: String,
        /// Target environment.
        to: String,
    },
    /// Target environment is locked.
    #[error("environment {environment} is locked by {} ({})", display_opt(.locked_by), display_opt(.reason))]
    EnvironmentLocked {
        /// Locked environment.
        environment: EnvironmentName,
        /// Operator holding the lock.
        locked_by: Option<OperatorId>,
        /// Lock reason.
        reason: Option<String>,
    },
    /// Registry is unreachable.
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),
    /// Registry circuit breaker is open.
    #[error("registry circuit breaker is open")]
    CircuitBreakerOpen,
    /// Registry answered with an unexpected error.
    #[error("registry error: {0}")]
    Registry(String),
    /// Target tag already exists with a conflicting state.
    #[error("tag {tag} already exists at {existing_digest}")]
    TagExists {
        /// Existing tag.
        tag: TagName,
        /// Digest the tag currently resolves to.
        existing_digest: Digest,
    },
    /// A required gate failed.
    #[error("gate validation failed: {gate}{}", detail_suffix(.detail))]
    GateValidation {
        /// Failing gate.
        gate: GateId,
        /// Failure detail.
        detail: Option<String>,
    },
    /// Signature missing or invalid where required.
    #[error("signature verification failed: {0}")]
    SignatureVerification(String),
    /// Version was never promoted to the environment.
    #[error("version {tag} was never promoted to {environment}")]
    VersionNotPromoted {
        /// Version tag.
        tag: TagName,
        /// Environment.
        environment: EnvironmentName,
    },
    /// Operator is not in any required group.
    #[error("operator {operator} is not authorized (requires one of: {})", .required_groups.join(", "))]
    Authorization {
        /// Operator identity.
        operator: OperatorId,
        /// Groups that would authorize the operator.
        required_groups: Vec<String>,
    },
    /// Audit trail could not be written.
    #[error("audit trail failure: {0}")]
    Audit(String),
    /// Registry tags were written but the audit record could not be appended.
    #[error("registry updated ({}) but not recorded: audit trail failure: {detail}", join_tags(.written))]
    UnrecordedWrite {
        /// Tags the operation wrote before the audit append failed.
        written: Vec<TagName>,
        /// Audit failure detail.
        detail: String,
    },
    /// Unexpected failure with a sanitized summary.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PromotionError {
    /// Builds an internal error from any displayable failure, sanitizing it.
    #[must_use]
    pub fn internal(err: impl fmt::Display) -> Self {
        Self::Internal(sanitize_error_summary(&err.to_string()))
    }

    /// Returns the deterministic CLI exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidInput(_) | Self::TagNotFound(_) => EXIT_BAD_INPUT,
            Self::RegistryUnavailable(_) | Self::CircuitBreakerOpen => EXIT_REGISTRY_UNAVAILABLE,
            Self::SignatureVerification(_) => EXIT_SIGNATURE_FAILED,
            Self::GateValidation {
                ..
            } => EXIT_GATE_FAILED,
            Self::InvalidTransition {
                ..
            } => EXIT_INVALID_TRANSITION,
            Self::TagExists {
                ..
            } => EXIT_TAG_EXISTS,
            Self::VersionNotPromoted {
                ..
            } => EXIT_VERSION_NOT_PROMOTED,
            Self::Authorization {
                ..
            } => EXIT_AUTHORIZATION_FAILED,
            Self::EnvironmentLocked {
                ..
            } => EXIT_ENVIRONMENT_LOCKED,
            Self::Registry(_)
            | Self::Audit(_)
            | Self::UnrecordedWrite {
                ..
            }
            | Self::Internal(_) => EXIT_INTERNAL,
        }
    }

    /// Returns a stable label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::TagNotFound(_) => "tag_not_found",
            Self::InvalidTransition {
                ..
            } => "invalid_transition",
            Self::EnvironmentLocked {
                ..
            } => "environment_locked",
            Self::RegistryUnavailable(_) => "registry_unavailable",
            Self::CircuitBreakerOpen => "circuit_breaker_open",
            Self::Registry(_) => "registry_error",
            Self::TagExists {
                ..
            } => "tag_exists",
            Self::GateValidation {
                ..
            } => "gate_validation",
            Self::SignatureVerification(_) => "signature_verification",
            Self::VersionNotPromoted {
                ..
            } => "version_not_promoted",
            Self::Authorization {
                ..
            } => "authorization",
            Self::Audit(_) => "audit",
            Self::UnrecordedWrite {
                ..
            } => "unrecorded_write",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<RegistryError> for PromotionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Unavailable(message) => {
                Self::RegistryUnavailable(sanitize_error_summary(&message))
            }
            RegistryError::CircuitOpen => Self::CircuitBreakerOpen,
            RegistryError::NotFound(reference) => TagName::parse(reference.clone())
                .map_or_else(|_| Self::InvalidInput(reference), Self::TagNotFound),
            RegistryError::Unauthorized(message) | RegistryError::Protocol(message) => {
                Self::Registry(sanitize_error_summary(&message))
            }
            RegistryError::ImmutableTag {
                tag,
                existing_digest,
            } => Self::TagExists {
                tag,
                existing_digest,
            },
        }
    }
}

impl From<IdentifierError> for PromotionError {
    fn from(err: IdentifierError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Formats an optional value for error messages.
fn display_opt<T: fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map_or_else(|| "unknown".to_string(), ToString::to_string)
}

/// Joins tag names with commas.
fn join_tags(tags: &[TagName]) -> String {
    tags.iter().map(TagName::as_str).collect::<Vec<_>>().join(", ")
}

/// Formats an optional detail as a `: detail` suffix.
fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map_or_else(String::new, |detail| format!(": {detail}"))
}

// ============================================================================
// SECTION: Sanitization
// ============================================================================

/// Reduces an error message to a bounded summary without paths or secrets.
///
/// Filesystem paths become `[path]`; credential-looking tokens and the word
/// following `Bearer`/`Basic` become `[redacted]`. Output is capped at
/// [`MAX_ERROR_SUMMARY_CHARS`] characters.
#[must_use]
pub fn sanitize_error_summary(message: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut redact_next = false;
    for token in message.split_whitespace() {
        if redact_next {
            out.push("[redacted]".to_string());
            redact_next = false;
            continue;
        }
        let lower = token.to_ascii_lowercase();
        if lower == "bearer" || lower == "basic" {
            out.push(token.to_string());
            redact_next = true;
        } else if is_secret_token(&lower) {
            out.push("[redacted]".to_string());
        } else if is_path_token(token) {
            out.push("[path]".to_string());
        } else {
            out.push(token.to_string());
        }
    }
    let joined = out.join(" ");
    if joined.chars().count() <= MAX_ERROR_SUMMARY_CHARS {
        return joined;
    }
    let mut truncated: String = joined.chars().take(MAX_ERROR_SUMMARY_CHARS - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Returns true for tokens that look like inline credentials.
fn is_secret_token(lower: &str) -> bool {
    ["token=", "password=", "passwd=", "secret=", "api_key=", "apikey=", "authorization:"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Returns true for tokens that look like filesystem paths.
fn is_path_token(token: &str) -> bool {
    let token = token.trim_matches(|ch: char| matches!(ch, '"' | '\'' | '(' | ')' | ',' | ':'));
    token.starts_with('/')
        || token.starts_with("./")
        || token.starts_with("../")
        || token.starts_with("~/")
        || token.contains(":\\")
}
