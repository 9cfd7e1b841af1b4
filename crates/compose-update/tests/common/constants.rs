//! Shared constants for test infrastructure

// Versions
pub const VERSION_2_2_2: &str = "2.2.2";
pub const VERSION_2_3_0: &str = "2.3.0";

// Release tags
pub const TAG_V2_2_2: &str = "v2.2.2";
pub const TAG_V2_3_0: &str = "v2.3.0";
pub const TAG_V2_4_0_RC1: &str = "v2.4.0-rc.1";

// Feed location
pub const REPO_OWNER: &str = "docker";
pub const REPO_NAME: &str = "compose";
pub const RELEASES_PATH: &str = "/repos/docker/compose/releases";
pub const ACCEPT_HEADER: &str = "application/vnd.github.v4+json";

// Assets for linux/amd64
pub const BINARY_NAME: &str = "docker-compose";
pub const ASSET_LINUX_AMD64: &str = "docker-compose-linux-x86_64";
pub const CHECKSUM_LINUX_AMD64: &str = "docker-compose-linux-x86_64.sha256";

// Binary content
pub const ORIGINAL_BINARY: &[u8] =
    b"#!/bin/sh\necho 'Docker Compose version v2.2.2'\n";
pub const NEW_BINARY: &[u8] = b"#!/bin/sh\necho 'Docker Compose version v2.3.0'\n";
pub const BROKEN_BINARY: &[u8] = b"#!/bin/sh\nexit 1\n";

// Checksums
pub const WRONG_CHECKSUM: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";
