//! Binary replacement with backup and rollback
//!
//! Every run downloads into its own `<path>_tmp.<random>` file next to the
//! executable. Under the install lock the staged file is hashed again and
//! must still match the verified digest. The running executable is then
//! renamed to `<path>_old` and the staged file is renamed into its place.
//! Renaming a running executable is permitted on POSIX filesystems and on
//! Windows, so no "finalize on next launch" step is needed. Any failure after
//! the backup exists restores it before the error is returned.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use compose_core::types::InstallConfig;
use fs4::fs_std::FileExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, UpdateError};
use crate::verify::file_sha256;

/// Pause between attempts to take a contended install lock
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Read buffer for re-hashing the staged binary
const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Progress of a downloaded binary through installation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Downloaded,
    Verified,
    BackedUp,
    Installed,
    Aborted,
}

impl InstallState {
    /// Whether `next` may follow this state
    pub fn can_transition_to(self, next: InstallState) -> bool {
        use InstallState::*;
        matches!(
            (self, next),
            (Downloaded, Verified) | (Verified, BackedUp) | (BackedUp, Installed)
        ) || (next == Aborted && self != Installed && self != Aborted)
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallState::Downloaded => "downloaded",
            InstallState::Verified => "verified",
            InstallState::BackedUp => "backed-up",
            InstallState::Installed => "installed",
            InstallState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// A downloaded binary waiting next to the executable it will replace
///
/// The file is deleted when the guard is dropped before installation
/// completes, so every failure path leaves no staged file behind.
#[derive(Debug)]
pub struct StagedBinary {
    path: PathBuf,
    state: InstallState,
    digest: Option<String>,
}

impl StagedBinary {
    /// Take ownership of a downloaded file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: InstallState::Downloaded,
            digest: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    /// Digest recorded when the file was verified
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Record a successful integrity check
    pub fn mark_verified(&mut self, digest: impl Into<String>) -> Result<()> {
        self.advance(InstallState::Verified)?;
        self.digest = Some(digest.into());
        Ok(())
    }

    fn advance(&mut self, next: InstallState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(UpdateError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!("Staged binary {:?}: {} -> {}", self.path, self.state, next);
        self.state = next;
        Ok(())
    }

    fn abort(&mut self) {
        if self.state.can_transition_to(InstallState::Aborted) {
            self.state = InstallState::Aborted;
        }
    }
}

impl Drop for StagedBinary {
    fn drop(&mut self) {
        if self.state == InstallState::Installed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged binary {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staged binary {:?}: {}", self.path, e),
        }
    }
}

/// Result of a completed installation
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Path of the replaced executable
    pub target: PathBuf,

    /// Where the previous executable was kept
    pub backup: PathBuf,

    /// SHA-256 of the installed binary
    pub digest: Option<String>,
}

/// Replaces one executable on disk
pub struct Installer {
    target: PathBuf,
    backup: PathBuf,
    staging_prefix: OsString,
    lock_path: Option<PathBuf>,
    verify_installed: bool,
    chunk_size: usize,
}

impl Installer {
    pub fn new(target: impl Into<PathBuf>, config: &InstallConfig) -> Self {
        let target = target.into();
        let backup = with_suffix(&target, &config.backup_suffix);
        let staging_prefix = staging_prefix_for(&target, &config.staging_suffix);
        let lock_path = config.lock.then(|| lock_path_for(&target));

        Self {
            target,
            backup,
            staging_prefix,
            lock_path,
            verify_installed: config.verify_installed,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Buffer size used when re-hashing the staged binary
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Executable that will be replaced
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Backup location (`<target>_old` by default)
    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Lock file guarding the backup and placement steps
    pub fn lock_path(&self) -> Option<&Path> {
        self.lock_path.as_deref()
    }

    fn target_dir(&self) -> &Path {
        match self.target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// Create an empty, uniquely named staging file next to the target
    ///
    /// Concurrent runs never share a staging file.
    pub fn staged(&self) -> Result<StagedBinary> {
        let dir = self.target_dir();
        let path = tempfile::Builder::new()
            .prefix(&self.staging_prefix)
            .tempfile_in(dir)
            .map_err(|e| UpdateError::install("create staging file in", dir, e))?
            .into_temp_path()
            .keep()
            .map_err(|e| UpdateError::install("create staging file in", dir, e.error))?;

        debug!("Staging download at {:?}", path);
        Ok(StagedBinary::new(path))
    }

    /// Back up the current executable and put the verified binary in its place
    ///
    /// The staged binary must be verified. Cancellation is honoured until the
    /// new binary has been placed, including while waiting for the install
    /// lock; once the backup exists a cancelled or failed installation
    /// restores it.
    pub fn install(
        &self,
        mut staged: StagedBinary,
        cancel: &CancellationToken,
    ) -> Result<InstallReport> {
        if staged.state() != InstallState::Verified {
            return Err(UpdateError::InvalidTransition {
                from: staged.state(),
                to: InstallState::BackedUp,
            });
        }

        if cancel.is_cancelled() {
            staged.abort();
            return Err(UpdateError::Cancelled);
        }

        let _lock = match self.acquire_lock(cancel) {
            Ok(lock) => lock,
            Err(e) => {
                staged.abort();
                return Err(e);
            }
        };

        if let Err(e) = self
            .check_unchanged(&staged)
            .and_then(|()| self.prepare(&staged))
        {
            staged.abort();
            return Err(e);
        }

        self.swap(&mut staged, cancel)?;

        info!("Installed new binary at {:?}", self.target);
        Ok(InstallReport {
            target: self.target.clone(),
            backup: self.backup.clone(),
            digest: staged.digest().map(String::from),
        })
    }

    /// Put the backup back at the target path
    pub fn rollback(&self) -> std::io::Result<()> {
        warn!("Restoring {:?} from {:?}", self.target, self.backup);

        match fs::symlink_metadata(&self.target) {
            Ok(_) => fs::remove_file(&self.target)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        fs::rename(&self.backup, &self.target)
    }

    /// Back up the target, move the staged binary into place and smoke check it
    ///
    /// Runs with the install lock held. Every failure after the backup rename
    /// rolls back.
    fn swap(&self, staged: &mut StagedBinary, cancel: &CancellationToken) -> Result<()> {
        debug!("Backing up {:?} to {:?}", self.target, self.backup);
        if let Err(e) = fs::rename(&self.target, &self.backup) {
            staged.abort();
            return Err(UpdateError::install("back up", &self.target, e));
        }
        staged.advance(InstallState::BackedUp)?;

        if cancel.is_cancelled() {
            staged.abort();
            return Err(self.restore(UpdateError::Cancelled));
        }

        debug!("Moving {:?} to {:?}", staged.path(), self.target);
        if let Err(e) = fs::rename(staged.path(), &self.target) {
            staged.abort();
            return Err(self.restore(UpdateError::install(
                "move new binary to",
                &self.target,
                e,
            )));
        }
        staged.advance(InstallState::Installed)?;

        if self.verify_installed {
            if let Err(e) = self.smoke_check() {
                return Err(self.restore(e));
            }
        }

        Ok(())
    }

    /// Roll back after `cause`, folding a rollback failure into the error
    fn restore(&self, cause: UpdateError) -> UpdateError {
        match self.rollback() {
            Ok(()) => {
                info!("Original executable restored");
                UpdateError::RolledBack {
                    cause: Box::new(cause),
                }
            }
            Err(source) => UpdateError::RollbackFailed {
                cause: Box::new(cause),
                backup: self.backup.clone(),
                source,
            },
        }
    }

    /// The staged file must still hash to the digest it was verified with
    fn check_unchanged(&self, staged: &StagedBinary) -> Result<()> {
        let Some(expected) = staged.digest() else {
            return Err(UpdateError::InvalidTransition {
                from: staged.state(),
                to: InstallState::BackedUp,
            });
        };

        let actual = file_sha256(staged.path(), self.chunk_size)
            .map_err(|e| UpdateError::install("read staged binary", staged.path(), e))?;

        if actual != expected {
            return Err(UpdateError::Integrity {
                expected: expected.to_string(),
                actual,
            });
        }

        Ok(())
    }

    /// Make the staged file executable and clear a stale backup
    fn prepare(&self, staged: &StagedBinary) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o755))
                .map_err(|e| UpdateError::install("set permissions on", staged.path(), e))?;
        }

        if fs::symlink_metadata(&self.backup).is_ok() {
            debug!("Removing stale backup {:?}", self.backup);
            fs::remove_file(&self.backup)
                .map_err(|e| UpdateError::install("remove stale backup", &self.backup, e))?;
        }

        Ok(())
    }

    /// Run the placed binary with `--version`
    fn smoke_check(&self) -> Result<()> {
        debug!("Verifying installed binary at {:?}", self.target);

        let output = Command::new(&self.target)
            .arg("--version")
            .output()
            .map_err(|e| UpdateError::SmokeCheck {
                reason: format!("could not execute: {}", e),
            })?;

        if !output.status.success() {
            return Err(UpdateError::SmokeCheck {
                reason: format!(
                    "exit code {}",
                    output
                        .status
                        .code()
                        .map_or_else(|| "unknown".to_string(), |c| c.to_string())
                ),
            });
        }

        debug!(
            "Installed binary reports: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    /// Exclusive lock released when the returned file is dropped
    ///
    /// Waits while another self-update holds the lock, giving up with
    /// `Cancelled` once `cancel` fires.
    fn acquire_lock(&self, cancel: &CancellationToken) -> Result<Option<File>> {
        let Some(path) = &self.lock_path else {
            return Ok(None);
        };

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| UpdateError::install("open lock file", path, e))?;

        let mut waiting = false;
        loop {
            let acquired = file
                .try_lock_exclusive()
                .map_err(|e| UpdateError::install("lock", path, e))?;
            if acquired {
                debug!("Acquired install lock {:?}", path);
                return Ok(Some(file));
            }

            if cancel.is_cancelled() {
                return Err(UpdateError::Cancelled);
            }
            if !waiting {
                info!("Waiting for another self-update to finish ({:?})", path);
                waiting = true;
            }
            thread::sleep(LOCK_POLL_INTERVAL);
        }
    }
}

/// Append `suffix` to the full path (`/usr/bin/app` -> `/usr/bin/app_old`)
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// File name prefix of staging files (`app` -> `app_tmp.`)
fn staging_prefix_for(target: &Path, suffix: &str) -> OsString {
    let mut prefix = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("compose"));
    prefix.push(suffix);
    prefix.push(".");
    prefix
}

/// `<dir>/.<name>.selfupdate.lock`
fn lock_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "compose".to_string());
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!(".{}.selfupdate.lock", name))
}
