//! CLI argument parsing with clap

use clap::{Args, Parser, Subcommand};

/// Docker Compose - Define and run multi-container applications
#[derive(Parser, Debug)]
#[command(name = "docker-compose")]
#[command(author, version = crate::version::VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print failures
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Replace this executable with the latest release
    #[command(name = "selfupdate", alias = "self-update")]
    SelfUpdate(SelfUpdateArgs),
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print only the version number
    #[arg(long, conflicts_with = "json")]
    pub short: bool,
}

#[derive(Args, Debug)]
pub struct SelfUpdateArgs {
    /// Consider pre-release versions
    #[arg(long)]
    pub unstable: bool,

    /// Only report whether an update is available
    #[arg(long)]
    pub check: bool,
}
