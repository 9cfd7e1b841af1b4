//! Error types for the self-update pipeline
//!
//! Every stage returns its own variant; the orchestrator propagates the first
//! failure unchanged and the CLI decides exit code and message from it.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for the update pipeline
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Failure of a single HTTP exchange
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS, timeout or body read failure
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// Server answered with a non-success status
    #[error("server responded with HTTP {status}")]
    Status { status: reqwest::StatusCode },

    /// Response body could not be decoded
    #[error("malformed response body: {0}")]
    Body(#[source] serde_json::Error),

    /// Writing the response to disk failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation was interrupted by the user
    #[error("cancelled")]
    Cancelled,
}

impl TransportError {
    /// Whether another attempt could reasonably succeed
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Request(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            TransportError::Status { status } => {
                matches!(status.as_u16(), 408 | 425 | 429) || status.is_server_error()
            }
            TransportError::Body(_) | TransportError::Io(_) | TransportError::Cancelled => false,
        }
    }
}

/// Errors produced by the self-update pipeline
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Runtime configuration could not be loaded
    #[error("configuration: {0}")]
    Config(#[from] compose_core::Error),

    /// The HTTP client could not be built from the network settings
    #[error("failed to initialise HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The release list could not be fetched or parsed
    #[error("failed to fetch release feed from {url}: {cause}")]
    Feed {
        url: String,
        #[source]
        cause: TransportError,
    },

    /// The feed contained no release that may be installed
    #[error("release feed contains no installable release")]
    NoRelease,

    /// A release tag or the running version is not a semantic version
    #[error("invalid semantic version '{input}': {source}")]
    VersionParse {
        input: String,
        #[source]
        source: semver::Error,
    },

    /// No binary is published for the host operating system and architecture
    #[error("no release binary is published for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// The release does not list an asset with the expected name
    #[error("release {tag} has no asset named {name}")]
    AssetNotFound { tag: String, name: String },

    /// Downloading a binary, checksum or asset description failed
    #[error("failed to download {url}: {cause}")]
    Fetch {
        url: String,
        #[source]
        cause: TransportError,
    },

    /// Downloaded size disagrees with the size the release advertises
    #[error("downloaded {actual} bytes but the release lists {expected} bytes")]
    SizeMismatch { expected: u64, actual: u64 },

    /// The published checksum file does not start with a SHA-256 hex digest
    #[error("published checksum is malformed: {reason}")]
    MalformedChecksum { reason: String },

    /// Computed digest differs from the published digest
    #[error("checksum mismatch: published {expected}, computed {actual}")]
    Integrity { expected: String, actual: String },

    /// A filesystem step of the installation failed
    #[error("failed to {action} {}: {source}", .path.display())]
    Install {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The freshly installed binary did not run
    #[error("installed binary failed its smoke check: {reason}")]
    SmokeCheck { reason: String },

    /// Installation failed and the original executable was restored
    #[error("{cause} (original executable restored)")]
    RolledBack {
        #[source]
        cause: Box<UpdateError>,
    },

    /// Installation failed and the original executable could not be restored
    #[error("{cause}; restoring {} also failed: {source}", .backup.display())]
    RollbackFailed {
        cause: Box<UpdateError>,
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Installation was asked to proceed from an invalid state
    #[error("invalid install transition from {from} to {to}")]
    InvalidTransition {
        from: crate::installer::InstallState,
        to: crate::installer::InstallState,
    },

    /// The user interrupted the update
    #[error("update cancelled")]
    Cancelled,
}

impl UpdateError {
    /// Wrap a transport failure of the release feed request
    pub fn feed(url: impl Into<String>, cause: TransportError) -> Self {
        match cause {
            TransportError::Cancelled => UpdateError::Cancelled,
            cause => UpdateError::Feed {
                url: url.into(),
                cause,
            },
        }
    }

    /// Wrap a transport failure of a download or asset request
    pub fn fetch(url: impl Into<String>, cause: TransportError) -> Self {
        match cause {
            TransportError::Cancelled => UpdateError::Cancelled,
            cause => UpdateError::Fetch {
                url: url.into(),
                cause,
            },
        }
    }

    /// Create a version parse error
    pub fn version_parse(input: impl Into<String>, source: semver::Error) -> Self {
        UpdateError::VersionParse {
            input: input.into(),
            source,
        }
    }

    /// Create an install error for a filesystem step
    pub fn install(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UpdateError::Install {
            action,
            path: path.into(),
            source,
        }
    }

    /// Name of the pipeline stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            UpdateError::Config(_) | UpdateError::Client(_) => "configuration",
            UpdateError::Feed { .. } => "release feed",
            UpdateError::NoRelease | UpdateError::VersionParse { .. } => "version resolution",
            UpdateError::UnsupportedPlatform { .. } | UpdateError::AssetNotFound { .. } => {
                "asset resolution"
            }
            UpdateError::Fetch { .. } | UpdateError::SizeMismatch { .. } => "download",
            UpdateError::MalformedChecksum { .. } | UpdateError::Integrity { .. } => {
                "integrity verification"
            }
            UpdateError::Install { .. }
            | UpdateError::SmokeCheck { .. }
            | UpdateError::RollbackFailed { .. }
            | UpdateError::InvalidTransition { .. } => "install",
            UpdateError::RolledBack { cause } => cause.stage(),
            UpdateError::Cancelled => "cancelled",
        }
    }

    /// Whether the failure is worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            UpdateError::Feed { cause, .. } | UpdateError::Fetch { cause, .. } => {
                cause.is_transient()
            }
            _ => false,
        }
    }
}
