// crates/release-gate-core/src/core/tags.rs
// ============================================================================
// Module: Release Gate Tag Naming
// Description: Semantic-version parsing and environment tag conventions.
// Purpose: Decide which tags are write-once and derive environment tag names.
// Dependencies: crate::core::identifiers
// ============================================================================

//! ## Overview
//! Tag conventions:
//! - environment version tags: `{tag}-{env}` (e.g. `v1.2.3-staging`)
//! - mutable environment pointers: `latest-{env}`
//! - rollback tags: `v{X.Y.Z}-{env}-rollback-{N}`
//!
//! Invariants:
//! - Any tag that parses as a semantic version is immutable once written.
//! - `latest-*` tags never parse as semantic versions and may be repointed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::core::identifiers::EnvironmentName;
use crate::core::identifiers::IdentifierError;
use crate::core::identifiers::TagName;

// ============================================================================
// SECTION: Semantic Versions
// ============================================================================

/// Parsed semantic version (`v?MAJOR.MINOR.PATCH[-pre][+build]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemVer {
    /// Major version.
    pub major: u64,
    /// Minor version.
    pub minor: u64,
    /// Patch version.
    pub patch: u64,
    /// Dot-separated pre-release identifiers, if any.
    pub pre_release: Option<String>,
    /// Build metadata, if any.
    pub build: Option<String>,
}

impl SemVer {
    /// Parses a semantic version, accepting an optional leading `v`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.strip_prefix('v').unwrap_or(value);
        let (rest, build) = match value.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (value, None),
        };
        let (core, pre_release) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (rest, None),
        };
        let mut parts = core.split('.');
        let major = parse_numeric(parts.next()?)?;
        let minor = parse_numeric(parts.next()?)?;
        let patch = parse_numeric(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        if let Some(pre) = pre_release
            && !valid_identifiers(pre)
        {
            return None;
        }
        if let Some(build) = build
            && !valid_identifiers(build)
        {
            return None;
        }
        Some(Self {
            major,
            minor,
            patch,
            pre_release: pre_release.map(str::to_string),
            build: build.map(str::to_string),
        })
    }

    /// Returns the `vX.Y.Z` core without pre-release or build metadata.
    #[must_use]
    pub fn core_tag(&self) -> String {
        format!("v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre_release {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

/// Parses a numeric identifier without leading zeros.
fn parse_numeric(part: &str) -> Option<u64> {
    if part.is_empty() || (part.len() > 1 && part.starts_with('0')) {
        return None;
    }
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Validates dot-separated alphanumeric identifiers.
fn valid_identifiers(value: &str) -> bool {
    value.split('.').all(|ident| {
        !ident.is_empty() && ident.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

// ============================================================================
// SECTION: Tag Policy
// ============================================================================

/// Returns true when the tag is a write-once semantic-version tag.
#[must_use]
pub fn is_immutable_tag(tag: &TagName) -> bool {
    SemVer::parse(tag.as_str()).is_some()
}

/// Returns the mutable `latest-{env}` pointer tag.
///
/// # Errors
///
/// Returns [`IdentifierError`] when the derived tag exceeds OCI limits.
pub fn latest_tag(env: &EnvironmentName) -> Result<TagName, IdentifierError> {
    TagName::parse(format!("latest-{env}"))
}

/// Returns the environment version tag `{tag}-{env}`.
///
/// # Errors
///
/// Returns [`IdentifierError`] when the derived tag exceeds OCI limits.
pub fn environment_tag(tag: &TagName, env: &EnvironmentName) -> Result<TagName, IdentifierError> {
    TagName::parse(format!("{tag}-{env}"))
}

/// Returns the rollback tag `v{X.Y.Z}-{env}-rollback-{N}`.
///
/// # Errors
///
/// Returns [`IdentifierError::InvalidTag`] when `tag` is not a semantic version.
pub fn rollback_tag(
    tag: &TagName,
    env: &EnvironmentName,
    index: u32,
) -> Result<TagName, IdentifierError> {
    let version = SemVer::parse(tag.as_str())
        .ok_or_else(|| IdentifierError::InvalidTag(tag.to_string()))?;
    TagName::parse(format!("{}-{env}-rollback-{index}", version.core_tag()))
}
