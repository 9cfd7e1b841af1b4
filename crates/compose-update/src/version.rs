//! Running version and update resolution
//!
//! Decides whether the feed offers a release strictly newer than the running
//! binary. Releases that are equal to the running version are never
//! reinstalled.

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, UpdateError};
use crate::releases::ReleaseRecord;

/// Version information for the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Semantic version
    pub version: String,

    /// Git commit SHA (short)
    pub commit: Option<String>,

    /// Build date
    pub build_date: Option<String>,
}

impl VersionInfo {
    /// Parse the version string
    pub fn semver(&self) -> Result<Version> {
        parse_version(&self.version)
    }

    /// Format as display string
    pub fn display(&self) -> String {
        let mut parts = vec![format!("Docker Compose version v{}", self.version)];

        if let Some(commit) = &self.commit {
            parts.push(format!("({})", commit));
        }

        if let Some(date) = &self.build_date {
            parts.push(format!("built {}", date));
        }

        parts.join(" ")
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Parse a semantic version, tolerating surrounding whitespace and a `v` prefix
pub fn parse_version(input: &str) -> Result<Version> {
    let trimmed = input.trim();
    let bare = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    Version::parse(bare).map_err(|e| UpdateError::version_parse(input, e))
}

/// Outcome of comparing the running version against the feed
#[derive(Debug, Clone)]
pub struct Resolution {
    /// A strictly newer release exists
    pub update_available: bool,

    /// Running version
    pub current: Version,

    /// Version of the candidate release
    pub latest: Version,

    /// Release to install when an update is available
    pub target: ReleaseRecord,
}

/// Whether a published release may be offered as an update
fn is_candidate(release: &ReleaseRecord, version: &Version, allow_unstable: bool) -> bool {
    allow_unstable || (!release.prerelease && version.pre.is_empty())
}

/// Pick the candidate release and compare it with the running version
///
/// The feed lists newest releases first, so the first eligible entry is the
/// candidate. Drafts are never eligible. Pre-releases (flagged by the feed or
/// carrying a semver pre-release component) are only eligible with
/// `allow_unstable`.
pub fn resolve(
    current: &Version,
    releases: &[ReleaseRecord],
    allow_unstable: bool,
) -> Result<Resolution> {
    for release in releases.iter().filter(|r| !r.draft) {
        let version = parse_version(&release.tag_name)?;

        if !is_candidate(release, &version, allow_unstable) {
            debug!("Skipping unstable release {}", release.tag_name);
            continue;
        }

        let update_available = version > *current;
        debug!(
            "Current version {}, candidate {} (update available: {})",
            current, version, update_available
        );

        return Ok(Resolution {
            update_available,
            current: current.clone(),
            latest: version,
            target: release.clone(),
        });
    }

    Err(UpdateError::NoRelease)
}
