//! Type definitions for runtime configuration

mod runtime_config;

pub use runtime_config::*;
