//! # compose-core
//!
//! Core library for the Compose CLI providing:
//! - Runtime configuration types (network, release feed, retry, install)
//! - Hierarchical configuration loading (embedded defaults, user file, environment)
//! - Retry execution engine with policy-based configuration

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::HierarchicalConfigLoader;
pub use error::{Error, Result};
