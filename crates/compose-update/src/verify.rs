//! SHA-256 integrity verification of downloaded binaries
//!
//! A checksum sidecar is `<hex-digest>  <filename>`. Only the first 64
//! characters are significant and they must be hex; anything shorter is a
//! malformed checksum, never a reason to skip verification.
//!
//! Digests are compared as lowercase hex. An uppercase sidecar is accepted
//! and normalised to lowercase before the comparison.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Result, UpdateError};

/// Length of a hex-encoded SHA-256 digest
const DIGEST_HEX_LEN: usize = 64;

/// Lowercase hex SHA-256 of a byte slice
pub fn sha256_hex(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// Lowercase hex SHA-256 of a file, read in `chunk_size` pieces
pub fn file_sha256(path: &Path, chunk_size: usize) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Extract the digest from the contents of a checksum sidecar
pub fn published_digest(checksum_file: &[u8]) -> Result<String> {
    let prefix = checksum_file
        .get(..DIGEST_HEX_LEN)
        .ok_or_else(|| UpdateError::MalformedChecksum {
            reason: format!(
                "expected at least {} characters, got {}",
                DIGEST_HEX_LEN,
                checksum_file.len()
            ),
        })?;

    if !prefix.iter().all(u8::is_ascii_hexdigit) {
        return Err(UpdateError::MalformedChecksum {
            reason: "digest is not hexadecimal".to_string(),
        });
    }

    // All bytes are ASCII hex digits at this point
    Ok(String::from_utf8_lossy(prefix).to_ascii_lowercase())
}

/// Whether `content` hashes to the digest published in `checksum_file`
pub fn verify(content: &[u8], checksum_file: &[u8]) -> bool {
    match published_digest(checksum_file) {
        Ok(expected) => sha256_hex(content) == expected,
        Err(_) => false,
    }
}

/// Verify a downloaded file against its checksum sidecar
///
/// Returns the computed digest on success.
pub fn verify_file(path: &Path, checksum_file: &[u8], chunk_size: usize) -> Result<String> {
    let expected = published_digest(checksum_file)?;
    let actual = file_sha256(path, chunk_size)
        .map_err(|e| UpdateError::install("read downloaded binary", path, e))?;

    if actual != expected {
        return Err(UpdateError::Integrity { expected, actual });
    }

    debug!("Checksum verified for {:?}: {}", path, actual);
    Ok(actual)
}
