// crates/release-gate-config/tests/common/mod.rs
// ============================================================================
// Module: Config Test Fixtures
// Description: Temporary config files, key files, and a reference config.
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are used by a subset of test binaries.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures unwrap deterministic values."
)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use ed25519_dalek::SigningKey;
use release_gate_config::ConfigError;
use release_gate_config::ReleaseGateConfig;

pub type TestResult = Result<(), String>;

/// Minimal valid chain used as a prefix for focused configs.
pub const MINIMAL: &str = r#"
[[environments]]
name = "dev"

[[environments]]
name = "prod"
"#;

pub fn ca_key() -> SigningKey {
    SigningKey::from_bytes(&[31; 32])
}

pub fn log_key() -> SigningKey {
    SigningKey::from_bytes(&[32; 32])
}

pub fn release_key() -> SigningKey {
    SigningKey::from_bytes(&[33; 32])
}

/// Writes `bytes` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// Writes the public halves of the fixture keys and the release private key.
pub fn write_keys(dir: &Path) {
    write_file(dir, "ca.pub", ca_key().verifying_key().as_bytes());
    write_file(dir, "log.pub", log_key().verifying_key().as_bytes());
    write_file(dir, "release.pub", release_key().verifying_key().as_bytes());
    write_file(dir, "release.key", &release_key().to_bytes());
}

/// A config exercising every section, with key paths under `dir`.
pub fn full_config(dir: &Path) -> String {
    let dir = dir.display();
    format!(
        r#"
[chain]
allow_skip = false

[[environments]]
name = "dev"
consumers = ["dev-dashboard"]

[[environments]]
name = "staging"
signature = "optional"
consumers = ["billing-api"]

[[environments.gates]]
id = "tests"

[[environments.gates]]
id = "load_test"
mode = "optional"

[[environments]]
name = "prod"
signature = "required"
consumers = ["edge-cache"]

[[environments.gates]]
id = "tests"

[[environments.gates]]
id = "policy_compliance"
mode = "advisory"

[registry]
base_url = "https://registry.example.com"
repository = "platform/release"
timeout_ms = 5000

[registry.breaker]
failure_threshold = 3
reset_timeout_ms = 15000

[signing]
mode = "key"
key_path = "{dir}/release.key"

[signing.trust]
certificate_authorities = ["{dir}/ca.pub"]
transparency_logs = ["{dir}/log.pub"]
signing_keys = ["{dir}/release.pub"]
allowed_issuers = ["https://token.actions.githubusercontent.com"]

[[webhooks]]
url = "https://hooks.example.com/releases"
events = ["promote", "rollback"]
retry_count = 2
backoff_base_ms = 500

[webhooks.headers]
Authorization = "Bearer hook-token"

[[webhooks]]
url = "https://hooks.example.com/all"

[authorization]
enabled = true
rollback_groups = ["release-managers"]
max_rollback_index = 50

[authorization.members]
release-managers = ["alice", "bob"]
sre = ["carol"]

[audit]
path = "{dir}/audit.jsonl"

[logging]
output = "file"
path = "{dir}/controller.log"
"#
    )
}

/// Asserts that `result` failed with a message containing `needle`.
pub fn assert_invalid(result: Result<ReleaseGateConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
