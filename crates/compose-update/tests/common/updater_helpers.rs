//! Fake executables for installer and updater tests

use std::fs;
use std::path::{Path, PathBuf};

use compose_update::platform::Platform;
use compose_update::updater::{SelfUpdater, UpdateOptions};
use semver::Version;
use tempfile::TempDir;

use super::builders::test_config;
use super::constants::*;

/// Create an executable file with the given content
pub fn create_fake_binary(path: &Path, content: &[u8]) -> std::io::Result<()> {
    fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}

/// Install the "running" v2.2.2 executable in a fresh directory
pub fn install_original(temp: &TempDir) -> PathBuf {
    let target = temp.path().join(BINARY_NAME);
    create_fake_binary(&target, ORIGINAL_BINARY).unwrap();
    target
}

/// Names of the files in `dir`, sorted
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Updater for `target`, running as v2.2.2 on linux/amd64 against `server_uri`
pub fn linux_updater(server_uri: &str, target: &Path) -> SelfUpdater {
    linux_updater_at(server_uri, target, VERSION_2_2_2)
}

/// Updater for `target` running as `version` on linux/amd64
pub fn linux_updater_at(server_uri: &str, target: &Path, version: &str) -> SelfUpdater {
    SelfUpdater::new(
        test_config(server_uri),
        UpdateOptions {
            allow_unstable: false,
            quiet: true,
        },
        Version::parse(version).unwrap(),
    )
    .unwrap()
    .with_target(target)
    .with_platform(Platform::new("linux", "amd64"))
}
