//! Runtime configuration types for operational parameters
//!
//! These types define configuration that controls the self-update pipeline:
//! network timeouts, where releases are published, retry policies and how
//! the new binary is put in place.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Network and HTTP configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Release feed location and naming
    #[serde(default)]
    pub release_feed: ReleaseFeedConfig,

    /// Retry policy configurations
    #[serde(default)]
    pub retry_policies: RetryPoliciesConfig,

    /// Binary replacement settings
    #[serde(default)]
    pub install: InstallConfig,
}

/// Network and HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Timeout for metadata requests (release list, asset details) in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Timeout for binary and checksum downloads in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Buffer size used when hashing downloaded files
    #[serde(default = "default_chunk_size")]
    pub download_chunk_size: usize,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            download_timeout_secs: default_download_timeout(),
            download_chunk_size: default_chunk_size(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}
fn default_download_timeout() -> u64 {
    300 // 5 minutes
}
fn default_chunk_size() -> usize {
    1024 * 1024 // 1 MB
}
fn default_user_agent() -> String {
    format!(
        "docker-compose/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// How the asset for the host platform is located inside a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AssetResolution {
    /// Build the download URL from the release tag and asset name
    #[default]
    Direct,

    /// List the release assets through the API and match by exact name
    Api,
}

impl std::str::FromStr for AssetResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "api" => Ok(Self::Api),
            other => Err(format!("unknown asset resolution '{}'", other)),
        }
    }
}

/// Release feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReleaseFeedConfig {
    /// Base URL for the releases API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL release assets are downloaded from
    #[serde(default = "default_download_url")]
    pub download_url: String,

    /// Repository owner
    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,

    /// Repository name
    #[serde(default = "default_repo_name")]
    pub repo_name: String,

    /// Accept header sent with API requests
    #[serde(default = "default_accept")]
    pub accept: String,

    /// Base name of published binaries (`<binary-name>-<platform-suffix>`)
    #[serde(default = "default_binary_name")]
    pub binary_name: String,

    /// Number of releases requested per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Asset lookup mode
    #[serde(default)]
    pub asset_resolution: AssetResolution,
}

impl Default for ReleaseFeedConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            download_url: default_download_url(),
            repo_owner: default_repo_owner(),
            repo_name: default_repo_name(),
            accept: default_accept(),
            binary_name: default_binary_name(),
            per_page: default_per_page(),
            asset_resolution: AssetResolution::default(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_download_url() -> String {
    "https://github.com".to_string()
}
fn default_repo_owner() -> String {
    "docker".to_string()
}
fn default_repo_name() -> String {
    "compose".to_string()
}
fn default_accept() -> String {
    "application/vnd.github.v4+json".to_string()
}
fn default_binary_name() -> String {
    "docker-compose".to_string()
}
fn default_per_page() -> u32 {
    30
}

/// Retry policy configurations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPoliciesConfig {
    /// Default retry policy
    #[serde(default)]
    pub default: RetryPolicy,

    /// Per-operation retry policies
    #[serde(default)]
    pub operations: HashMap<String, RetryPolicy>,
}

impl RetryPoliciesConfig {
    /// Policy for a named operation, falling back to the default policy
    pub fn for_operation(&self, operation: &str) -> RetryPolicy {
        self.operations
            .get(operation)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

impl Default for RetryPoliciesConfig {
    fn default() -> Self {
        let mut operations = HashMap::new();

        // Downloads can run long, so back off harder between attempts
        operations.insert(
            "download".to_string(),
            RetryPolicy {
                max_attempts: 3,
                strategy: RetryStrategy::ExponentialBackoff,
                backoff_multiplier: 2.0,
                initial_delay_ms: 2000,
                max_delay_ms: 30000,
            },
        );

        Self {
            default: RetryPolicy::default(),
            operations,
        }
    }
}

/// Retry policy for an operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first one)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Retry strategy
    #[serde(default)]
    pub strategy: RetryStrategy,

    /// Backoff multiplier for exponential strategies
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            strategy: RetryStrategy::default(),
            backoff_multiplier: default_backoff_multiplier(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    30000
}

/// Retry strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategy {
    /// No delay between attempts
    None,

    /// Fixed delay between retries
    FixedDelay,

    /// Exponential backoff (default)
    #[default]
    ExponentialBackoff,

    /// Linear backoff
    LinearBackoff,
}

/// Binary replacement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstallConfig {
    /// Suffix appended to the executable path for the backup copy
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    /// Suffix of staged downloads (`<path><suffix>.<random>`)
    #[serde(default = "default_staging_suffix")]
    pub staging_suffix: String,

    /// Run the placed binary with `--version` and roll back if it fails
    #[serde(default = "default_true")]
    pub verify_installed: bool,

    /// Hold an exclusive lock on the install directory while replacing
    #[serde(default = "default_true")]
    pub lock: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            backup_suffix: default_backup_suffix(),
            staging_suffix: default_staging_suffix(),
            verify_installed: true,
            lock: true,
        }
    }
}

fn default_backup_suffix() -> String {
    "_old".to_string()
}
fn default_staging_suffix() -> String {
    "_tmp".to_string()
}
fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.network.http_timeout_secs, 30);
        assert_eq!(config.release_feed.repo_owner, "docker");
        assert_eq!(config.release_feed.repo_name, "compose");
        assert_eq!(config.release_feed.binary_name, "docker-compose");
        assert_eq!(config.release_feed.asset_resolution, AssetResolution::Direct);
        assert_eq!(config.install.backup_suffix, "_old");
        assert_eq!(config.install.staging_suffix, "_tmp");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
release-feed:
  repo-owner: "acme"
  asset-resolution: api
install:
  verify-installed: false
"#;
        let config: RuntimeConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.release_feed.repo_owner, "acme");
        assert_eq!(config.release_feed.repo_name, "compose");
        assert_eq!(config.release_feed.asset_resolution, AssetResolution::Api);
        assert!(!config.install.verify_installed);
        assert!(config.install.lock);
        assert_eq!(config.network.download_timeout_secs, 300);
    }

    #[test]
    fn test_policy_for_operation_falls_back_to_default() {
        let policies = RetryPoliciesConfig::default();
        assert_eq!(policies.for_operation("download").initial_delay_ms, 2000);
        assert_eq!(policies.for_operation("release-feed").initial_delay_ms, 1000);
    }

    #[test]
    fn test_asset_resolution_from_str() {
        assert_eq!("API".parse::<AssetResolution>(), Ok(AssetResolution::Api));
        assert_eq!(
            "direct".parse::<AssetResolution>(),
            Ok(AssetResolution::Direct)
        );
        assert!("listing".parse::<AssetResolution>().is_err());
    }
}
