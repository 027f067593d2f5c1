//! The `nimbus upgrade` command: replace this launcher installation with
//! the newest build from the self-update channel.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;

use crate::channels::{ChannelId, ChannelRegistry, HttpReleaseFetcher};
use crate::config::LauncherConfig;
use crate::constants::VERSION_MARKER_FILE;
use crate::upgrade::{ConfirmAction, SelfUpdateTransaction, SwapOutcome};
use crate::version::VersionInfo;

/// Command-line arguments for the upgrade command.
#[derive(Parser, Debug)]
pub struct UpgradeCommand {
    /// Check for a newer launcher build without installing.
    #[arg(long)]
    pub check: bool,

    /// Install even when the installed version already matches.
    #[arg(short, long)]
    pub force: bool,

    /// Answer yes to confirmation prompts (non-interactive use).
    #[arg(short = 'y', long)]
    pub yes: bool,
}

struct AlwaysYes;

impl ConfirmAction for AlwaysYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

struct TerminalConfirm;

impl ConfirmAction for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

impl UpgradeCommand {
    pub async fn execute(&self, config: &LauncherConfig) -> Result<()> {
        let registry = ChannelRegistry::new(
            HttpReleaseFetcher::new(),
            config.app_repo()?,
            config.launcher_repo()?,
        );

        println!("{}", "Checking the launcher channel...".cyan());
        registry.refresh_all(None).await;

        let Some(snapshot) = registry.snapshot(ChannelId::LauncherSelf) else {
            bail!("Could not fetch launcher release metadata");
        };

        let install_root = config.install_root()?;
        let marker = install_root.join(VERSION_MARKER_FILE);
        let local = match fs::read_to_string(&marker).await {
            Ok(raw) => VersionInfo::parse(&raw),
            Err(_) => VersionInfo::parse(""),
        };
        let remote = snapshot.version();

        if !VersionInfo::is_update_available(&local, &remote) && !self.force {
            println!("{}", format!("Already on the latest launcher build ({local})").green());
            return Ok(());
        }

        if self.check {
            println!("{}", format!("Update available: {local} -> {remote}").green());
            println!("Run `nimbus upgrade` to install it");
            return Ok(());
        }

        println!("{}", format!("Updating launcher: {local} -> {remote}").cyan());

        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {bytes}/{total_bytes} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message("downloading");

        let yes = AlwaysYes;
        let terminal = TerminalConfirm;
        let confirm: &dyn ConfirmAction = if self.yes { &yes } else { &terminal };

        let client = reqwest::Client::new();
        let txn = SelfUpdateTransaction::new(install_root.clone(), client).with_confirm(confirm);

        let progress_bar = bar.clone();
        let outcome = txn
            .run(&snapshot, move |p| {
                if let Some(fraction) = p.fraction {
                    progress_bar.set_length(10_000);
                    progress_bar.set_position((fraction * 10_000.0) as u64);
                } else {
                    progress_bar.set_position(p.bytes_copied);
                }
            })
            .await;
        bar.finish_and_clear();

        match outcome {
            Ok(SwapOutcome::Relaunched) => {
                record_installed_version(&marker, &snapshot.tag).await;
                println!("{}", "Update installed; new launcher started".green());
                println!("This process will now exit.");
                std::process::exit(0);
            }
            Ok(SwapOutcome::ManualRestart) => {
                record_installed_version(&marker, &snapshot.tag).await;
                println!("{}", "Update installed".green());
                println!("No executable found to relaunch; please restart the launcher manually.");
                Ok(())
            }
            Err(e) => Err(e).context("Self-update failed; previous installation was restored"),
        }
    }
}

/// Persist the raw tag string as the new install marker. Failure here is
/// cosmetic (the next refresh reports unknown and offers the update
/// again), so it is reported but not fatal.
async fn record_installed_version(marker: &std::path::Path, tag: &str) {
    if let Err(e) = fs::write(marker, tag).await {
        eprintln!("{}", format!("Could not record installed version: {e}").yellow());
    }
}
