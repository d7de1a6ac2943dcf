//! Semantic version strategy resolution.
//!
//! Pure functions: given the latest existing version of an object plus the
//! requested version string and strategy, compute the version string a new
//! revision would carry. Admissibility of the result (notably the exact
//! strategy against an older requested version) is decided by the task.

use semver::Version;

use crate::domain::{ReconcileError, Result, VersionStrategy};

/// Whether `s` is a valid semantic version string.
pub fn is_semver(s: &str) -> bool {
    Version::parse(s).is_ok()
}

/// Parse a semver string, failing with a validation error.
pub fn parse(s: &str) -> Result<Version> {
    Version::parse(s).map_err(|e| {
        ReconcileError::validation(format!("'{}' is not a valid semver string: {}", s, e))
    })
}

/// Whether `new` is strictly greater than `old`.
pub fn is_greater(new: &str, old: &str) -> Result<bool> {
    Ok(parse(new)? > parse(old)?)
}

fn bump(version: &Version, strategy: VersionStrategy) -> Version {
    match strategy {
        VersionStrategy::BumpMajor => Version::new(version.major + 1, 0, 0),
        VersionStrategy::BumpMinor => Version::new(version.major, version.minor + 1, 0),
        VersionStrategy::BumpPatch => {
            Version::new(version.major, version.minor, version.patch + 1)
        }
        VersionStrategy::Exact => version.clone(),
    }
}

/// Compute the next version string for an object whose latest existing
/// version is `existing_latest`.
///
/// - `Exact` returns `requested` unchanged.
/// - Bump strategies return `requested` when it is already greater than the
///   existing version, otherwise the existing version bumped at the strategy
///   granularity with lower components reset.
pub fn resolve(existing_latest: &str, strategy: VersionStrategy, requested: &str) -> Result<String> {
    let requested_version = parse(requested)?;
    let existing_version = parse(existing_latest)?;

    if strategy == VersionStrategy::Exact {
        return Ok(requested.to_string());
    }
    if requested_version > existing_version {
        return Ok(requested.to_string());
    }
    Ok(bump(&existing_version, strategy).to_string())
}
