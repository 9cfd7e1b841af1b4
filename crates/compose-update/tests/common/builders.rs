//! Builders for test data
//!
//! Provides fluent APIs for release records and a runtime configuration that
//! points every request at a mock server with near-zero retry delays.

use compose_core::types::{AssetResolution, RetryPolicy, RetryStrategy, RuntimeConfig};
use compose_update::releases::{AssetRecord, ReleaseRecord};

use super::constants::*;

/// Builder for release records as the feed returns them
#[derive(Debug, Clone)]
pub struct ReleaseBuilder {
    id: u64,
    base_url: String,
    tag_name: String,
    name: Option<String>,
    draft: bool,
    prerelease: bool,
}

impl ReleaseBuilder {
    /// Create a release of v2.3.0 whose API URL lives under `base_url`
    pub fn new(base_url: &str) -> Self {
        Self {
            id: 1,
            base_url: base_url.trim_end_matches('/').to_string(),
            tag_name: TAG_V2_3_0.to_string(),
            name: None,
            draft: false,
            prerelease: false,
        }
    }

    pub fn id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag_name = tag.to_string();
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn prerelease(mut self) -> Self {
        self.prerelease = true;
        self
    }

    pub fn draft(mut self) -> Self {
        self.draft = true;
        self
    }

    pub fn build(self) -> ReleaseRecord {
        ReleaseRecord {
            id: self.id,
            url: format!("{}{}/{}", self.base_url, RELEASES_PATH, self.id),
            html_url: None,
            name: self.name,
            tag_name: self.tag_name,
            draft: self.draft,
            prerelease: self.prerelease,
        }
    }
}

/// Asset record whose description lives at `<base_url>/assets/<id>`
pub fn asset_record(base_url: &str, id: u64, name: &str) -> AssetRecord {
    AssetRecord {
        id,
        url: format!("{}{}/assets/{}", base_url, RELEASES_PATH, id),
        name: name.to_string(),
    }
}

/// Retry policy with millisecond delays
pub fn quick_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        strategy: RetryStrategy::FixedDelay,
        backoff_multiplier: 1.0,
        initial_delay_ms: 1,
        max_delay_ms: 5,
    }
}

/// Runtime configuration aimed at a mock server
pub fn test_config(server_uri: &str) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();

    config.network.http_timeout_secs = 5;
    config.network.download_timeout_secs = 5;
    config.network.download_chunk_size = 16;

    config.release_feed.api_url = server_uri.to_string();
    config.release_feed.download_url = server_uri.to_string();
    config.release_feed.repo_owner = REPO_OWNER.to_string();
    config.release_feed.repo_name = REPO_NAME.to_string();
    config.release_feed.binary_name = BINARY_NAME.to_string();
    config.release_feed.asset_resolution = AssetResolution::Direct;

    config.retry_policies.default = quick_retry(3);
    config.retry_policies.operations.clear();

    // Smoke checks execute the installed file, which only works for scripts on Unix
    config.install.verify_installed = false;

    config
}

/// Same as [`test_config`] but resolving assets through the listing API
pub fn api_test_config(server_uri: &str) -> RuntimeConfig {
    let mut config = test_config(server_uri);
    config.release_feed.asset_resolution = AssetResolution::Api;
    config
}
