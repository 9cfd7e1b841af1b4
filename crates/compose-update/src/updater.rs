//! Self-update orchestration
//!
//! Runs the stages strictly in order: release feed, version resolution,
//! asset resolution, download, integrity verification, installation. The
//! first failing stage aborts the run and its error is returned unchanged.

use std::path::{Path, PathBuf};

use compose_core::types::{AssetResolution, RuntimeConfig};
use semver::Version;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::download::{human_readable_size, Fetcher};
use crate::error::{Result, UpdateError};
use crate::installer::Installer;
use crate::platform::{download_urls, AssetNames, AssetUrls, Platform};
use crate::releases::{find_asset, ReleaseFeed, ReleaseRecord};
use crate::verify::verify_file;
use crate::version::resolve;

/// Options chosen on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Consider pre-releases
    pub allow_unstable: bool,

    /// Suppress progress output
    pub quiet: bool,
}

/// Result of comparing the running version against the feed
#[derive(Debug, Clone)]
pub struct UpdateCheck {
    pub current: Version,
    pub latest: Version,
    pub update_available: bool,
    pub release: ReleaseRecord,
}

/// Result of a completed self-update run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The running version is already the newest eligible release
    AlreadyUpToDate { current: Version, latest: Version },

    /// A new binary was installed
    Updated {
        from: Version,
        to: Version,
        backup: PathBuf,
    },
}

/// Where the binary and checksum will be downloaded from
struct ResolvedAssets {
    urls: AssetUrls,
    expected_size: Option<u64>,
}

/// Self-update pipeline for one executable
pub struct SelfUpdater {
    config: RuntimeConfig,
    options: UpdateOptions,
    current_version: Version,
    target: PathBuf,
    platform: Platform,
    cancel: CancellationToken,
}

impl SelfUpdater {
    /// Create an updater for the running executable on the host platform
    pub fn new(
        config: RuntimeConfig,
        options: UpdateOptions,
        current_version: Version,
    ) -> Result<Self> {
        let target = std::env::current_exe()
            .map_err(|e| UpdateError::install("locate", "current executable", e))?;

        debug!(
            "Updater initialized: version={}, path={:?}",
            current_version, target
        );

        Ok(Self {
            config,
            options,
            current_version,
            target,
            platform: Platform::host(),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace a different executable
    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = target.into();
        self
    }

    /// Pretend to run on another platform
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Share a cancellation token with the caller
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn current_version(&self) -> &Version {
        &self.current_version
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    fn feed(&self) -> Result<(Fetcher, ReleaseFeed)> {
        let fetcher =
            Fetcher::new(&self.config, self.cancel.clone())?.with_progress(!self.options.quiet);
        let feed = ReleaseFeed::new(fetcher.clone(), self.config.release_feed.clone());
        Ok((fetcher, feed))
    }

    /// Compare the running version with the feed without changing anything
    pub async fn check(&self) -> Result<UpdateCheck> {
        let (_, feed) = self.feed()?;
        let releases = feed.list_releases().await?;
        let resolution = resolve(
            &self.current_version,
            &releases,
            self.options.allow_unstable,
        )?;

        Ok(UpdateCheck {
            current: resolution.current,
            latest: resolution.latest,
            update_available: resolution.update_available,
            release: resolution.target,
        })
    }

    /// Run the whole pipeline
    pub async fn run(&self) -> Result<UpdateOutcome> {
        let (fetcher, feed) = self.feed()?;

        let releases = feed.list_releases().await?;
        let resolution = resolve(
            &self.current_version,
            &releases,
            self.options.allow_unstable,
        )?;

        if !resolution.update_available {
            info!(
                "Already up to date (current {}, latest {})",
                resolution.current, resolution.latest
            );
            return Ok(UpdateOutcome::AlreadyUpToDate {
                current: resolution.current,
                latest: resolution.latest,
            });
        }

        let release = &resolution.target;
        info!(
            "Updating from {} to {} ({})",
            resolution.current,
            resolution.latest,
            release.display_name()
        );

        let suffix = self.platform.suffix()?;
        let names = AssetNames::new(&self.config.release_feed.binary_name, suffix);
        debug!("Platform {} uses asset {}", self.platform, names.binary);

        let assets = self.resolve_assets(&feed, release, &names).await?;

        let installer = Installer::new(&self.target, &self.config.install)
            .with_chunk_size(self.config.network.download_chunk_size);
        let mut staged = installer.staged()?;

        let size = fetcher
            .download_to_file(&assets.urls.binary, staged.path(), &names.binary)
            .await
            .map_err(|e| UpdateError::fetch(&assets.urls.binary, e))?;
        info!("Downloaded {} ({})", names.binary, human_readable_size(size));

        if let Some(expected) = assets.expected_size {
            if expected != size {
                return Err(UpdateError::SizeMismatch {
                    expected,
                    actual: size,
                });
            }
        }

        let checksum = fetcher
            .download_bytes(&assets.urls.checksum)
            .await
            .map_err(|e| UpdateError::fetch(&assets.urls.checksum, e))?;

        let digest = verify_file(
            staged.path(),
            &checksum,
            self.config.network.download_chunk_size,
        )?;
        staged.mark_verified(digest)?;
        info!("Checksum verified");

        let report = installer.install(staged, &self.cancel)?;

        Ok(UpdateOutcome::Updated {
            from: resolution.current,
            to: resolution.latest,
            backup: report.backup,
        })
    }

    /// Work out download URLs for the binary and its checksum
    ///
    /// Both assets must be found before anything is downloaded.
    async fn resolve_assets(
        &self,
        feed: &ReleaseFeed,
        release: &ReleaseRecord,
        names: &AssetNames,
    ) -> Result<ResolvedAssets> {
        let feed_config = &self.config.release_feed;

        match feed_config.asset_resolution {
            AssetResolution::Direct => Ok(ResolvedAssets {
                urls: download_urls(
                    &feed_config.download_url,
                    &feed_config.repo_owner,
                    &feed_config.repo_name,
                    &release.tag_name,
                    names,
                ),
                expected_size: None,
            }),
            AssetResolution::Api => {
                let listed = feed.list_assets(release).await?;
                let binary = find_asset(release, &listed, &names.binary)?;
                let checksum = find_asset(release, &listed, &names.checksum)?;

                let binary = feed.asset_download(binary).await?;
                let checksum = feed.asset_download(checksum).await?;

                Ok(ResolvedAssets {
                    urls: AssetUrls {
                        binary: binary.download_url,
                        checksum: checksum.download_url,
                    },
                    expected_size: Some(binary.size_bytes),
                })
            }
        }
    }
}
