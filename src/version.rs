//! Release version parsing and the naming conventions derived from it.
//!
//! Tags look like `v0.31.0`, release candidates like `v0.31.0-rc.2` and
//! release branches like `release-0.31`.
use regex::Regex;
use semver::Version;
use std::sync::LazyLock;

use crate::error::{ReleaseError, Result};

/// Prefix shared by every release branch.
pub const BRANCH_PREFIX: &str = "release-";

static BRANCH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^release-\d+\.\d+$").unwrap());

static RC_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d+\.\d+\.\d+-rc\.\d+$").unwrap());

/// Parses a tag such as `v1.2.3` or `1.2.3-rc.0` into a semantic version.
pub fn parse_version(tag: &str) -> Result<Version> {
    let trimmed = tag.strip_prefix('v').unwrap_or(tag);
    Version::parse(trimmed).map_err(|e| ReleaseError::InvalidVersion {
        version: tag.to_string(),
        reason: e.to_string(),
    })
}

/// Release branch name for a minor series, e.g. `release-0.31`.
pub fn branch_name(major: u64, minor: u64) -> String {
    format!("{BRANCH_PREFIX}{major}.{minor}")
}

/// First official tag of a minor series, e.g. `v0.31.0`.
pub fn minor_tag(major: u64, minor: u64) -> String {
    format!("v{major}.{minor}.0")
}

/// Release candidate tag, e.g. `v0.31.0-rc.2`.
pub fn rc_tag(major: u64, minor: u64, ordinal: u64) -> String {
    format!("{}{ordinal}", rc_prefix(major, minor))
}

/// Everything in a release candidate tag up to the ordinal.
pub fn rc_prefix(major: u64, minor: u64) -> String {
    format!("{}-rc.", minor_tag(major, minor))
}

/// Tag name for an already parsed version.
pub fn tag_for(version: &Version) -> String {
    format!("v{version}")
}

/// Release branch a version is cut from.
pub fn branch_for(version: &Version) -> String {
    branch_name(version.major, version.minor)
}

/// Returns true when `name` is exactly `release-<x>.<y>`.
pub fn is_release_branch(name: &str) -> bool {
    BRANCH_REGEX.is_match(name)
}

/// Returns true when `tag` is exactly `v<x>.<y>.<z>-rc.<n>`.
pub fn is_rc_tag(tag: &str) -> bool {
    RC_TAG_REGEX.is_match(tag)
}

/// Ordinal of `tag` when it is a candidate under `prefix`, e.g. 2 for
/// `v0.31.0-rc.2` under `v0.31.0-rc.`.
pub fn rc_ordinal(tag: &str, prefix: &str) -> Option<u64> {
    tag.strip_prefix(prefix)
        .and_then(|n| n.parse::<u64>().ok())
}

/// Official tag a release candidate promotes to: `v1.2.0-rc.3` -> `v1.2.0`.
pub fn official_tag_for_rc(rc: &str) -> Result<String> {
    if !is_rc_tag(rc) {
        return Err(ReleaseError::InvalidRcFormat(rc.to_string()));
    }
    let version = parse_version(rc)?;
    Ok(format!(
        "v{}.{}.{}",
        version.major, version.minor, version.patch
    ))
}
