//! Common test infrastructure for compose-update tests
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: Versions, tags, asset names and binary contents
//! - `builders`: Builders for release records and runtime configuration
//! - `mock_server`: Wiremock setup for the release feed and downloads
//! - `updater_helpers`: Fake executables on disk

// Each test binary uses a different subset of the helpers
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod builders;
pub mod constants;
pub mod mock_server;
pub mod updater_helpers;

pub use builders::*;
pub use constants::*;
pub use mock_server::*;
pub use updater_helpers::*;
