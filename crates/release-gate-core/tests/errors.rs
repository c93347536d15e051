// crates/release-gate-core/tests/errors.rs
// ============================================================================
// Module: Error Mapping Tests
// Description: Exit codes, error kinds, and error summary sanitization.
// Purpose: Keep CLI exit codes stable and error text free of secrets.
// Dependencies: release-gate-core
// ============================================================================

//! Error Mapping Tests for release-gate-core.

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

use release_gate_core::Digest;
use release_gate_core::EnvironmentName;
use release_gate_core::GateId;
use release_gate_core::OperatorId;
use release_gate_core::PromotionError;
use release_gate_core::RegistryError;
use release_gate_core::TagName;
use release_gate_core::sanitize_error_summary;

#[test]
fn exit_codes_are_stable() {
    let tag = TagName::parse("v1.0.0").unwrap();
    let environment = EnvironmentName::parse("prod").unwrap();
    let cases: Vec<(PromotionError, u8, &str)> = vec![
        (PromotionError::InvalidInput("x".to_string()), 2, "invalid_input"),
        (PromotionError::TagNotFound(tag.clone()), 2, "tag_not_found"),
        (PromotionError::RegistryUnavailable("down".to_string()), 5, "registry_unavailable"),
        (PromotionError::CircuitBreakerOpen, 5, "circuit_breaker_open"),
        (PromotionError::SignatureVerification("bad".to_string()), 6, "signature_verification"),
        (
            PromotionError::GateValidation {
                gate: GateId::parse("tests").unwrap(),
                detail: None,
            },
            8,
            "gate_validation",
        ),
        (
            PromotionError::InvalidTransition {
                from: "dev".to_string(),
                to: "prod".to_string(),
            },
            9,
            "invalid_transition",
        ),
        (
            PromotionError::TagExists {
                tag: tag.clone(),
                existing_digest: Digest::of_bytes(b"a"),
            },
            10,
            "tag_exists",
        ),
        (
            PromotionError::VersionNotPromoted {
                tag,
                environment: environment.clone(),
            },
            11,
            "version_not_promoted",
        ),
        (
            PromotionError::Authorization {
                operator: OperatorId::new("mallory"),
                required_groups: vec!["release-managers".to_string()],
            },
            12,
            "authorization",
        ),
        (
            PromotionError::EnvironmentLocked {
                environment,
                locked_by: None,
                reason: None,
            },
            13,
            "environment_locked",
        ),
        (PromotionError::Registry("bad manifest".to_string()), 1, "registry_error"),
        (PromotionError::Audit("disk full".to_string()), 1, "audit"),
        (
            PromotionError::UnrecordedWrite {
                written: vec![TagName::parse("v1.0.0-prod").unwrap()],
                detail: "disk full".to_string(),
            },
            1,
            "unrecorded_write",
        ),
        (PromotionError::Internal("boom".to_string()), 1, "internal"),
    ];
    for (err, code, kind) in cases {
        assert_eq!(err.exit_code(), code, "{err}");
        assert_eq!(err.kind(), kind, "{err}");
    }
}

#[test]
fn unrecorded_write_names_the_written_tags() {
    let err = PromotionError::UnrecordedWrite {
        written: vec![TagName::parse("v1.0.0-prod").unwrap(), TagName::parse("latest-prod").unwrap()],
        detail: "audit trail io error: disk full".to_string(),
    };

    assert_eq!(
        err.to_string(),
        "registry updated (v1.0.0-prod, latest-prod) but not recorded: audit trail failure: \
         audit trail io error: disk full"
    );
}

#[test]
fn locked_error_names_the_operator_and_reason() {
    let err = PromotionError::EnvironmentLocked {
        environment: EnvironmentName::parse("prod").unwrap(),
        locked_by: Some(OperatorId::new("oncall")),
        reason: Some("incident".to_string()),
    };

    assert_eq!(err.to_string(), "environment prod is locked by oncall (incident)");
}

#[test]
fn registry_errors_map_to_promotion_errors() {
    assert!(matches!(
        PromotionError::from(RegistryError::Unavailable("timeout".to_string())),
        PromotionError::RegistryUnavailable(_)
    ));
    assert!(matches!(
        PromotionError::from(RegistryError::CircuitOpen),
        PromotionError::CircuitBreakerOpen
    ));
    assert!(matches!(
        PromotionError::from(RegistryError::NotFound("v9.9.9".to_string())),
        PromotionError::TagNotFound(ref tag) if tag.as_str() == "v9.9.9"
    ));
    assert!(matches!(
        PromotionError::from(RegistryError::NotFound("sha256:abc".to_string())),
        PromotionError::InvalidInput(_)
    ));
    assert_eq!(PromotionError::from(RegistryError::Unauthorized("401".to_string())).exit_code(), 1);
    assert_eq!(PromotionError::from(RegistryError::Protocol("bad".to_string())).exit_code(), 1);
}

#[test]
fn only_unavailable_counts_as_availability_failure() {
    assert!(RegistryError::Unavailable("x".to_string()).is_availability_failure());
    assert!(!RegistryError::NotFound("x".to_string()).is_availability_failure());
    assert!(!RegistryError::Unauthorized("x".to_string()).is_availability_failure());
    assert!(!RegistryError::Protocol("x".to_string()).is_availability_failure());
    assert!(!RegistryError::CircuitOpen.is_availability_failure());
}

#[test]
fn sanitize_redacts_credentials() {
    let summary = sanitize_error_summary(
        "request failed Authorization: Bearer abc.def.ghi url?token=s3cr3t password=hunter2",
    );

    assert!(!summary.contains("abc.def.ghi"));
    assert!(!summary.contains("s3cr3t"));
    assert!(!summary.contains("hunter2"));
    assert!(summary.contains("[redacted]"));
}

#[test]
fn sanitize_replaces_paths() {
    let summary = sanitize_error_summary("cannot open /etc/release-gate/key.pem: denied");

    assert_eq!(summary, "cannot open [path] denied");
}

#[test]
fn sanitize_truncates_long_messages() {
    let summary = sanitize_error_summary(&"word ".repeat(200));

    assert_eq!(summary.chars().count(), 256);
    assert!(summary.ends_with("..."));
}

#[test]
fn internal_errors_are_sanitized() {
    let err = PromotionError::internal("failed reading /var/lib/release-gate/audit.jsonl");

    assert_eq!(err.to_string(), "internal error: failed reading [path]");
}

#[test]
fn unavailable_registry_messages_are_sanitized() {
    let err = PromotionError::from(RegistryError::Unavailable(
        "connect failed with Basic dXNlcjpwYXNz".to_string(),
    ));

    assert_eq!(err.to_string(), "registry unavailable: connect failed with Basic [redacted]");
}
