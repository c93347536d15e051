// crates/release-gate-signing/src/keys.rs
// ============================================================================
// Module: Key Material
// Description: Loading and generation of ed25519 keys.
// Purpose: Read key-mode signing keys and trust-root public keys from disk.
// Dependencies: base64, ed25519-dalek, rand
// ============================================================================

//! ## Overview
//! Key files hold either the raw 32 key bytes or their base64 text. Reads are
//! bounded so a misconfigured path cannot pull an arbitrary file into memory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::SigningError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted key file size in bytes.
pub const MAX_KEY_FILE_BYTES: u64 = 4 * 1024;

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads an ed25519 signing key from `path`.
///
/// # Errors
///
/// Returns [`SigningError::Key`] when the file is unreadable, too large, or
/// does not hold 32 key bytes.
pub fn load_signing_key(path: &Path) -> Result<SigningKey, SigningError> {
    Ok(SigningKey::from_bytes(&read_key_bytes(path)?))
}

/// Loads an ed25519 public key from `path`.
///
/// # Errors
///
/// Returns [`SigningError::Key`] when the file is unreadable, too large, or
/// does not hold a valid public key.
pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey, SigningError> {
    VerifyingKey::from_bytes(&read_key_bytes(path)?)
        .map_err(|_| SigningError::Key(format!("{} is not an ed25519 public key", path.display())))
}

/// Generates a fresh signing key from the operating system RNG.
#[must_use]
pub fn generate_signing_key() -> SigningKey {
    let mut seed = [0_u8; 32];
    OsRng.fill_bytes(&mut seed);
    SigningKey::from_bytes(&seed)
}

/// Reads 32 key bytes stored raw or as base64 text.
fn read_key_bytes(path: &Path) -> Result<[u8; 32], SigningError> {
    let invalid = || SigningError::Key(format!("{} does not hold a 32-byte key", path.display()));
    let file = File::open(path)
        .map_err(|err| SigningError::Key(format!("unable to read {}: {err}", path.display())))?;
    let mut bytes = Vec::new();
    file.take(MAX_KEY_FILE_BYTES.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| SigningError::Key(format!("unable to read {}: {err}", path.display())))?;
    if bytes.len() > usize::try_from(MAX_KEY_FILE_BYTES).unwrap_or(usize::MAX) {
        return Err(SigningError::Key(format!(
            "{} exceeds {MAX_KEY_FILE_BYTES} bytes",
            path.display()
        )));
    }
    if let Ok(raw) = <[u8; 32]>::try_from(bytes.as_slice()) {
        return Ok(raw);
    }
    let text = std::str::from_utf8(&bytes).map_err(|_| invalid())?;
    let decoded = Base64.decode(text.trim()).map_err(|_| invalid())?;
    <[u8; 32]>::try_from(decoded.as_slice()).map_err(|_| invalid())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
