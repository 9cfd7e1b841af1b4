//! Platform detection and release asset naming
//!
//! Binaries are published as `<binary-name>-<suffix>` with a `.sha256`
//! sidecar next to them. The suffix comes from a fixed table; a host outside
//! the table cannot be updated.

use std::fmt;

use crate::error::{Result, UpdateError};

/// Operating system and architecture in the release feed's vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// `darwin`, `linux`, `windows`, ...
    pub os: String,

    /// `amd64`, `arm64`, `s390x`, `arm/v6`, `arm/v7`, ...
    pub arch: String,
}

impl Platform {
    /// Create a platform from explicit names
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Platform of the running binary
    pub fn host() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };

        let arch = if cfg!(all(target_arch = "arm", target_feature = "v7")) {
            "arm/v7"
        } else if cfg!(target_arch = "arm") {
            "arm/v6"
        } else {
            match std::env::consts::ARCH {
                "x86_64" => "amd64",
                "aarch64" => "arm64",
                other => other,
            }
        };

        Self::new(os, arch)
    }

    /// Release suffix for this platform
    pub fn suffix(&self) -> Result<&'static str> {
        platform_suffix(&self.os, &self.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Map an operating system and architecture to the published asset suffix
pub fn platform_suffix(os: &str, arch: &str) -> Result<&'static str> {
    let suffix = match (os, arch) {
        ("darwin", "arm64") => "darwin-aarch64",
        ("darwin", "amd64") => "darwin-x86_64",
        ("linux", "amd64") => "linux-x86_64",
        ("linux", "arm64") => "linux-aarch64",
        ("linux", "s390x") => "linux-s390x",
        ("linux", "arm/v6") => "linux-armv6",
        ("linux", "arm/v7") => "linux-armv7",
        ("windows", "amd64") => "windows-x86_64",
        _ => {
            return Err(UpdateError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            })
        }
    };
    Ok(suffix)
}

/// Names of the binary asset and its checksum sidecar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetNames {
    pub binary: String,
    pub checksum: String,
}

impl AssetNames {
    pub fn new(binary_name: &str, suffix: &str) -> Self {
        let binary = format!("{}-{}", binary_name, suffix);
        let checksum = format!("{}.sha256", binary);
        Self { binary, checksum }
    }
}

/// Download URLs of the binary and its checksum sidecar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUrls {
    pub binary: String,
    pub checksum: String,
}

/// Build the predictable download URLs of a release's assets
pub fn download_urls(
    download_url: &str,
    owner: &str,
    repo: &str,
    tag: &str,
    names: &AssetNames,
) -> AssetUrls {
    let base = format!(
        "{}/{}/{}/releases/download/{}",
        download_url.trim_end_matches('/'),
        owner,
        repo,
        tag
    );

    AssetUrls {
        binary: format!("{}/{}", base, names.binary),
        checksum: format!("{}/{}", base, names.checksum),
    }
}
