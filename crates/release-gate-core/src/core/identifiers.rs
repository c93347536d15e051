// crates/release-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Release Gate Identifiers
// Description: Strongly typed names, digests, and record identifiers.
// Purpose: Keep registry references and environment names validated at the edge.
// Dependencies: rand, serde, sha2, thiserror
// ============================================================================

//! ## Overview
//! Identifiers come in two flavours. Registry-facing values ([`TagName`],
//! [`Digest`], [`EnvironmentName`], [`GateId`]) are validated on construction
//! because they end up in registry URLs and tag names. Record identifiers
//! ([`PromotionId`], [`RollbackId`], [`TraceId`], [`OperatorId`]) are opaque
//! strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest as _;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum OCI tag length.
pub const MAX_TAG_LENGTH: usize = 128;
/// Maximum environment name length.
pub const MAX_ENVIRONMENT_NAME_LENGTH: usize = 32;
/// Maximum gate identifier length.
pub const MAX_GATE_ID_LENGTH: usize = 64;
/// Digest algorithm prefix accepted by the controller.
const SHA256_PREFIX: &str = "sha256:";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Tag does not follow the OCI tag grammar.
    #[error("invalid tag: {0}")]
    InvalidTag(String),
    /// Digest is not a `sha256:` digest.
    #[error("invalid digest: {0}")]
    InvalidDigest(String),
    /// Environment name is malformed.
    #[error("invalid environment name: {0}")]
    InvalidEnvironment(String),
    /// Gate identifier is malformed.
    #[error("invalid gate id: {0}")]
    InvalidGate(String),
}

// ============================================================================
// SECTION: Tag Names
// ============================================================================

/// OCI tag name (`[A-Za-z0-9_][A-Za-z0-9._-]{0,127}`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Parses a tag name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidTag`] when the value violates the OCI grammar.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        let mut chars = value.chars();
        let valid_first =
            chars.next().is_some_and(|first| first.is_ascii_alphanumeric() || first == '_');
        let valid_rest = chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'));
        if !valid_first || !valid_rest || value.len() > MAX_TAG_LENGTH {
            return Err(IdentifierError::InvalidTag(value));
        }
        Ok(Self(value))
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for TagName {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TagName> for String {
    fn from(value: TagName) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Digests
// ============================================================================

/// Content digest in `sha256:<64 lowercase hex>` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Parses a digest string.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidDigest`] for non-sha256 or malformed digests.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        let Some(hex) = value.strip_prefix(SHA256_PREFIX) else {
            return Err(IdentifierError::InvalidDigest(value));
        };
        if hex.len() != 64 || !hex.bytes().all(|b| matches!(b, b'0' ..= b'9' | b'a' ..= b'f')) {
            return Err(IdentifierError::InvalidDigest(value));
        }
        Ok(Self(value))
    }

    /// Computes the sha256 digest of raw bytes.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let hash = Sha256::digest(bytes);
        Self(format!("{SHA256_PREFIX}{}", hex_encode(&hash)))
    }

    /// Returns the digest as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the hex portion of the digest.
    #[must_use]
    pub fn hex(&self) -> &str {
        self.0.strip_prefix(SHA256_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for Digest {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Digest> for String {
    fn from(value: Digest) -> Self {
        value.0
    }
}

/// Encodes bytes as a lowercase hex string.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[usize::from(byte >> 4)] as char);
        out.push(HEX[usize::from(byte & 0x0f)] as char);
    }
    out
}

// ============================================================================
// SECTION: Environment Names
// ============================================================================

/// Environment name used in tag suffixes (`[a-z0-9][a-z0-9-]*`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EnvironmentName(String);

impl EnvironmentName {
    /// Parses an environment name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidEnvironment`] when the name cannot be
    /// embedded in a tag.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        let valid = !value.is_empty()
            && value.len() <= MAX_ENVIRONMENT_NAME_LENGTH
            && !value.starts_with('-')
            && !value.ends_with('-')
            && value.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !valid {
            return Err(IdentifierError::InvalidEnvironment(value));
        }
        Ok(Self(value))
    }

    /// Returns the environment name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for EnvironmentName {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EnvironmentName> for String {
    fn from(value: EnvironmentName) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Gate Identifiers
// ============================================================================

/// Gate identifier (`[a-z0-9_]+`), e.g. `security_scan`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GateId(String);

impl GateId {
    /// Policy compliance gate.
    pub const POLICY_COMPLIANCE: &'static str = "policy_compliance";
    /// Test suite gate.
    pub const TESTS: &'static str = "tests";
    /// Security scan gate.
    pub const SECURITY_SCAN: &'static str = "security_scan";

    /// Parses a gate identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidGate`] for malformed identifiers.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        let valid = !value.is_empty()
            && value.len() <= MAX_GATE_ID_LENGTH
            && value.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
        if !valid {
            return Err(IdentifierError::InvalidGate(value));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for GateId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<GateId> for String {
    fn from(value: GateId) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Opaque Identifiers
// ============================================================================

/// Operator identity performing an action.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(String);

impl OperatorId {
    /// Creates a new operator identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for OperatorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Unique promotion attempt identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromotionId(String);

impl PromotionId {
    /// Generates a fresh random promotion identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("prom-{:032x}", rand::random::<u128>()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PromotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique rollback identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RollbackId(String);

impl RollbackId {
    /// Generates a fresh random rollback identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("rb-{:032x}", rand::random::<u128>()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RollbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Trace correlation identifier shared across records, logs, and webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    /// Creates a trace identifier from a caller-supplied value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random trace identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
