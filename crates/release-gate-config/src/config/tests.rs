// crates/release-gate-config/src/config/tests.rs
// ============================================================================
// Module: Config Unit Tests
// Description: Path helpers and section-level validation.
// Dependencies: release-gate-config
// ============================================================================

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

use super::*;

#[test]
fn validate_path_string_rejects_empty_and_long_values() {
    assert!(validate_path_string("field", "./keys/ca.pub").is_ok());
    assert!(validate_path_string("field", "   ").unwrap_err().to_string().contains("non-empty"));
    let long = "a".repeat(MAX_TOTAL_PATH_LENGTH + 1);
    assert!(validate_path_string("field", &long).unwrap_err().to_string().contains("max length"));
    let component = "b".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
    assert!(
        validate_path_string("field", &component)
            .unwrap_err()
            .to_string()
            .contains("component too long")
    );
}

#[test]
fn validate_url_requires_tls_unless_allowed() {
    assert!(validate_url("u", "https://registry.example", false).is_ok());
    assert!(validate_url("u", "http://registry.example", true).is_ok());
    let err = validate_url("u", "http://registry.example", false).unwrap_err();
    assert!(err.to_string().contains("without allow_http"));
    assert!(validate_url("u", "registry.example", true).is_err());
}

#[test]
fn timeouts_are_bounded() {
    assert!(validate_timeout("t", MIN_TIMEOUT_MS).is_ok());
    assert!(validate_timeout("t", MAX_TIMEOUT_MS).is_ok());
    assert!(validate_timeout("t", MIN_TIMEOUT_MS - 1).is_err());
    assert!(validate_timeout("t", MAX_TIMEOUT_MS + 1).is_err());
}

#[test]
fn breaker_threshold_must_be_positive() {
    let mut registry = RegistrySection {
        base_url: "https://registry.example".to_string(),
        repository: "team/app".to_string(),
        allow_http: false,
        timeout_ms: default_registry_timeout_ms(),
        max_response_bytes: default_max_response_bytes(),
        username_env: None,
        password_env: None,
        breaker: BreakerSection::default(),
    };
    assert!(registry.validate().is_ok());

    registry.breaker.failure_threshold = 0;
    assert!(registry.validate().unwrap_err().to_string().contains("failure_threshold"));
}

#[test]
fn registry_credentials_come_in_pairs() {
    let registry = RegistrySection {
        base_url: "https://registry.example".to_string(),
        repository: "team/app".to_string(),
        allow_http: false,
        timeout_ms: default_registry_timeout_ms(),
        max_response_bytes: default_max_response_bytes(),
        username_env: Some("REGISTRY_USER".to_string()),
        password_env: None,
        breaker: BreakerSection::default(),
    };
    assert!(registry.validate().unwrap_err().to_string().contains("set together"));
}

#[test]
fn logging_path_follows_output() {
    let file_without_path = LoggingSection {
        output: LogOutput::File,
        path: None,
    };
    assert!(file_without_path.validate().is_err());

    let stderr_with_path = LoggingSection {
        output: LogOutput::Stderr,
        path: Some("controller.log".to_string()),
    };
    assert!(stderr_with_path.validate().is_err());

    let file_with_path = LoggingSection {
        output: LogOutput::File,
        path: Some("controller.log".to_string()),
    };
    assert!(file_with_path.validate().is_ok());
}

#[test]
fn authorization_requires_groups_when_enabled() {
    let mut authorization = AuthorizationSection {
        enabled: true,
        ..AuthorizationSection::default()
    };
    assert!(authorization.validate().unwrap_err().to_string().contains("rollback_groups"));

    authorization.rollback_groups = vec!["release-managers".to_string()];
    assert!(authorization.validate().is_ok());

    authorization.max_rollback_index = 0;
    assert!(authorization.validate().is_err());
}
