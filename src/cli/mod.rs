//! Command-line interface for the Nimbus launcher engine.
//!
//! The CLI stands in for the excluded GUI as the engine's host: it reads
//! persisted settings, triggers channel refreshes and self-updates, and
//! renders progress. Commands are organized one module per subcommand,
//! with this module owning the top-level parser and dispatch.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::LauncherConfig;
use crate::upgrade::sweep_stale_artifacts;

pub mod branches;
pub mod status;
pub mod upgrade;

/// Top-level CLI for the Nimbus launcher.
#[derive(Parser)]
#[command(
    name = "nimbus",
    about = "Nimbus launcher - release channels and self-update",
    version,
    long_about = "Resolves release channels for the managed application, decides update \
                  availability across version dialects, and self-updates the launcher's \
                  own installation."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (equivalent to RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh all channels and show per-channel versions and update
    /// availability against the local installation.
    Status(status::StatusCommand),

    /// List the available branch builds (cached for a few minutes).
    Branches(branches::BranchesCommand),

    /// Download and install a newer launcher build, replacing this
    /// installation in place.
    Upgrade(upgrade::UpgradeCommand),
}

impl Cli {
    /// Initialize the tracing subscriber from the verbosity flags, with
    /// `RUST_LOG` taking precedence when set.
    pub fn init_logging(&self) {
        let default = if self.verbose {
            "nimbus_launcher=debug"
        } else if self.quiet {
            "error"
        } else {
            "nimbus_launcher=info"
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
    }

    /// Execute the selected command.
    pub async fn execute(self) -> Result<()> {
        let config = LauncherConfig::load().await?;

        // Clear leftovers of any previously interrupted swap before doing
        // anything else with the installation directory.
        match config.install_root() {
            Ok(root) => {
                let swept = sweep_stale_artifacts(&root);
                if swept > 0 {
                    warn!("Removed {swept} stale update artifact(s) from {}", root.display());
                }
            }
            Err(e) => warn!("Skipping startup sweep: {e}"),
        }

        match self.command {
            Commands::Status(cmd) => cmd.execute(&config).await,
            Commands::Branches(cmd) => cmd.execute(&config).await,
            Commands::Upgrade(cmd) => cmd.execute(&config).await,
        }
    }
}
