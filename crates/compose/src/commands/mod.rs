//! Command implementations

pub mod selfupdate;
pub mod version;
