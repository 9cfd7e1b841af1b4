//! Self-update command

use anyhow::{anyhow, Result};
use compose_core::HierarchicalConfigLoader;
use compose_update::{SelfUpdater, UpdateError, UpdateOptions, UpdateOutcome};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::SelfUpdateArgs;
use crate::output;
use crate::version::build_info;

pub async fn run(args: SelfUpdateArgs, quiet: bool) -> Result<()> {
    let updater = build_updater(&args, quiet).map_err(stage_error)?;

    if args.check {
        return check(&updater, quiet).await;
    }

    match updater.run().await.map_err(stage_error)? {
        UpdateOutcome::AlreadyUpToDate { current, latest } => {
            if !quiet {
                output::success(&format!(
                    "Already up to date (running v{}, latest v{})",
                    current, latest
                ));
            }
        }
        UpdateOutcome::Updated { from, to, backup } => {
            if !quiet {
                output::success(&format!("Updated docker-compose from v{} to v{}", from, to));
                output::kv("Previous version kept at", &backup.display().to_string());
            }
        }
    }

    Ok(())
}

/// Report whether an update is available without installing it
async fn check(updater: &SelfUpdater, quiet: bool) -> Result<()> {
    let spinner = output::spinner("Checking for updates...", quiet);
    let result = updater.check().await;
    spinner.finish_and_clear();

    let check = result.map_err(stage_error)?;
    if quiet {
        return Ok(());
    }

    if check.update_available {
        output::info(&format!(
            "Update available: v{} -> v{} ({})",
            check.current,
            check.latest,
            check.release.display_name()
        ));
        if let Some(url) = &check.release.html_url {
            output::kv("Release notes", url);
        }
        output::info("Run 'docker-compose selfupdate' to install it");
    } else {
        output::success(&format!("Already up to date (v{})", check.current));
    }

    Ok(())
}

fn build_updater(args: &SelfUpdateArgs, quiet: bool) -> compose_update::Result<SelfUpdater> {
    let config = HierarchicalConfigLoader::new()?.load_runtime_config()?;
    let current = build_info().semver()?;

    let options = UpdateOptions {
        allow_unstable: args.unstable,
        quiet,
    };

    Ok(SelfUpdater::new(config, options, current)?.with_cancel_token(cancel_on_ctrl_c()))
}

/// Token cancelled when the user presses Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let on_signal = token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling update");
            on_signal.cancel();
        }
    });

    token
}

/// Name the failed stage in the message shown to the user
fn stage_error(err: UpdateError) -> anyhow::Error {
    match err {
        UpdateError::Cancelled => anyhow!("self-update cancelled"),
        err => anyhow!("self-update failed during {}: {}", err.stage(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_names_stage() {
        let err = stage_error(UpdateError::UnsupportedPlatform {
            os: "plan9".to_string(),
            arch: "amd64".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "self-update failed during asset resolution: no release binary is published for plan9/amd64"
        );
    }

    #[test]
    fn test_cancelled_message() {
        assert_eq!(
            stage_error(UpdateError::Cancelled).to_string(),
            "self-update cancelled"
        );
    }
}
