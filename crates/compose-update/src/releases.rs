//! Release feed client
//!
//! Fetches the list of published releases and, when the asset listing API is
//! used instead of predictable download URLs, the assets attached to a release.

use compose_core::types::ReleaseFeedConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::download::Fetcher;
use crate::error::{Result, UpdateError};

/// A published release as returned by the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// Feed-assigned release identifier
    pub id: u64,

    /// API URL of the release (asset listing lives below it)
    pub url: String,

    /// Web page of the release
    #[serde(default)]
    pub html_url: Option<String>,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Release tag, a semantic version optionally prefixed with `v`
    pub tag_name: String,

    /// Unpublished draft
    #[serde(default)]
    pub draft: bool,

    /// Marked as a pre-release by the publisher
    #[serde(default)]
    pub prerelease: bool,
}

impl ReleaseRecord {
    /// Name to show to users, falling back to the tag
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.tag_name)
    }
}

/// A downloadable file attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Feed-assigned asset identifier
    pub id: u64,

    /// API URL describing the asset
    pub url: String,

    /// File name of the asset
    pub name: String,
}

/// Resolved download details of an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDownload {
    /// Size in bytes
    #[serde(rename = "size")]
    pub size_bytes: u64,

    /// Direct download URL
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

/// Client for the remote release index
pub struct ReleaseFeed {
    fetcher: Fetcher,
    config: ReleaseFeedConfig,
}

impl ReleaseFeed {
    /// Create a feed client sharing the fetcher's HTTP client
    pub fn new(fetcher: Fetcher, config: ReleaseFeedConfig) -> Self {
        Self { fetcher, config }
    }

    /// URL of the release list
    pub fn releases_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases?per_page={}",
            self.config.api_url.trim_end_matches('/'),
            self.config.repo_owner,
            self.config.repo_name,
            self.config.per_page
        )
    }

    /// List published releases in feed order (newest first for GitHub)
    pub async fn list_releases(&self) -> Result<Vec<ReleaseRecord>> {
        let url = self.releases_url();
        debug!("Fetching releases from: {}", url);

        let releases: Vec<ReleaseRecord> = self
            .fetcher
            .get_json(&url)
            .await
            .map_err(|e| UpdateError::feed(&url, e))?;

        info!("Release feed lists {} releases", releases.len());
        Ok(releases)
    }

    /// List the assets attached to a release
    pub async fn list_assets(&self, release: &ReleaseRecord) -> Result<Vec<AssetRecord>> {
        let url = format!("{}/assets", release.url.trim_end_matches('/'));
        debug!("Fetching assets of {} from: {}", release.tag_name, url);

        self.fetcher
            .get_json(&url)
            .await
            .map_err(|e| UpdateError::fetch(&url, e))
    }

    /// Resolve the download details of an asset
    pub async fn asset_download(&self, asset: &AssetRecord) -> Result<AssetDownload> {
        debug!("Resolving download URL of {}", asset.name);

        self.fetcher
            .get_json(&asset.url)
            .await
            .map_err(|e| UpdateError::fetch(&asset.url, e))
    }
}

/// Find an asset by exact name
pub fn find_asset<'a>(
    release: &ReleaseRecord,
    assets: &'a [AssetRecord],
    name: &str,
) -> Result<&'a AssetRecord> {
    assets
        .iter()
        .find(|a| a.name == name)
        .ok_or_else(|| UpdateError::AssetNotFound {
            tag: release.tag_name.clone(),
            name: name.to_string(),
        })
}
