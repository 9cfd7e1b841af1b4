//! Self-update pipeline for the Compose CLI
//!
//! Provides:
//! - Release discovery through the GitHub releases API
//! - Semantic version comparison with optional pre-releases
//! - Platform asset resolution by predictable URL or asset listing
//! - Streamed downloads with retry, cancellation and progress
//! - SHA-256 verification against published checksum sidecars
//! - Binary replacement with backup and rollback

pub mod download;
pub mod error;
pub mod installer;
pub mod platform;
pub mod releases;
pub mod updater;
pub mod verify;
pub mod version;

pub use download::Fetcher;
pub use error::{Result, TransportError, UpdateError};
pub use installer::{InstallReport, InstallState, Installer, StagedBinary};
pub use platform::{platform_suffix, AssetNames, Platform};
pub use releases::{AssetRecord, ReleaseFeed, ReleaseRecord};
pub use updater::{SelfUpdater, UpdateCheck, UpdateOptions, UpdateOutcome};
pub use version::{parse_version, resolve, Resolution, VersionInfo};
