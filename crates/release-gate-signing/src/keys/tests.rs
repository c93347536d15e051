// crates/release-gate-signing/src/keys/tests.rs
// ============================================================================
// Module: Key Material Unit Tests
// Description: Raw and base64 key file loading.
// Dependencies: release-gate-signing, tempfile
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

use std::fs;

use tempfile::TempDir;

use super::*;

#[test]
fn raw_and_base64_key_files_load_the_same_key() {
    let dir = TempDir::new().unwrap();
    let key = SigningKey::from_bytes(&[7_u8; 32]);
    let raw = dir.path().join("raw.key");
    let text = dir.path().join("text.key");
    fs::write(&raw, key.to_bytes()).unwrap();
    fs::write(&text, format!("{}\n", Base64.encode(key.to_bytes()))).unwrap();

    assert_eq!(load_signing_key(&raw).unwrap().to_bytes(), key.to_bytes());
    assert_eq!(load_signing_key(&text).unwrap().to_bytes(), key.to_bytes());
}

#[test]
fn public_key_file_loads() {
    let dir = TempDir::new().unwrap();
    let key = SigningKey::from_bytes(&[9_u8; 32]);
    let path = dir.path().join("signer.pub");
    fs::write(&path, Base64.encode(key.verifying_key().as_bytes())).unwrap();

    assert_eq!(load_verifying_key(&path).unwrap(), key.verifying_key());
}

#[test]
fn invalid_key_files_are_rejected() {
    let dir = TempDir::new().unwrap();
    let short = dir.path().join("short.key");
    let oversized = dir.path().join("big.key");
    let garbage = dir.path().join("garbage.key");
    fs::write(&short, Base64.encode([1_u8; 16])).unwrap();
    fs::write(&oversized, vec![b'A'; 8192]).unwrap();
    fs::write(&garbage, "not a key at all").unwrap();

    for path in [&short, &oversized, &garbage, &dir.path().join("missing.key")] {
        assert!(matches!(load_signing_key(path), Err(SigningError::Key(_))), "{}", path.display());
    }
}

#[test]
fn generated_keys_differ() {
    assert_ne!(generate_signing_key().to_bytes(), generate_signing_key().to_bytes());
}
