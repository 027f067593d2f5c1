//! The `nimbus status` command: refresh every channel and report versions
//! and update availability against the locally installed build.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tokio::fs;
use tracing::debug;

use crate::channels::{ChannelId, ChannelRegistry, HttpReleaseFetcher, SnapshotRef};
use crate::config::{ChannelSelection, LauncherConfig};
use crate::constants::VERSION_MARKER_FILE;
use crate::version::VersionInfo;

/// Command-line arguments for the status command.
#[derive(Parser, Debug)]
pub struct StatusCommand {
    /// Only show the channel currently selected in the configuration.
    #[arg(long)]
    pub selected_only: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config: &LauncherConfig) -> Result<()> {
        let registry = ChannelRegistry::new(
            HttpReleaseFetcher::new(),
            config.app_repo()?,
            config.launcher_repo()?,
        );

        println!("{}", "Refreshing release channels...".cyan());
        registry.refresh_all(config.channel.branch_name()).await;

        let local = local_version(config).await;
        let channels: Vec<ChannelId> = if self.selected_only {
            vec![selected_channel(&config.channel), ChannelId::LauncherSelf]
        } else {
            vec![ChannelId::Stable, ChannelId::Dev, ChannelId::Branch, ChannelId::LauncherSelf]
        };

        println!("Installed: {}", local.to_string().bold());
        for channel in channels {
            print_channel(channel, registry.snapshot(channel), &local);
        }
        Ok(())
    }
}

/// The update track matching the user's configured channel selection.
fn selected_channel(selection: &ChannelSelection) -> ChannelId {
    match selection {
        ChannelSelection::Stable => ChannelId::Stable,
        ChannelSelection::Dev => ChannelId::Dev,
        ChannelSelection::Branch { .. } => ChannelId::Branch,
    }
}

/// Read the raw install marker and parse it on demand. A missing or
/// unreadable marker degrades to an unknown local baseline, which the
/// comparison rules treat as "any valid remote is an update".
async fn local_version(config: &LauncherConfig) -> VersionInfo {
    let marker = match config.install_root() {
        Ok(root) => root.join(VERSION_MARKER_FILE),
        Err(e) => {
            debug!("Cannot resolve install root: {e}");
            return VersionInfo::parse("");
        }
    };
    match fs::read_to_string(&marker).await {
        Ok(raw) => VersionInfo::parse(&raw),
        Err(e) => {
            debug!("No readable version marker at {}: {e}", marker.display());
            VersionInfo::parse("")
        }
    }
}

fn print_channel(channel: ChannelId, snapshot: Option<SnapshotRef>, local: &VersionInfo) {
    let Some(snapshot) = snapshot else {
        println!("  {channel:<10} {}", "no data".dimmed());
        return;
    };

    let remote = snapshot.version();
    let mut line = format!("  {channel:<10} {remote}");
    if snapshot.fallback_from_stable {
        line.push_str(&format!(" {}", "(branch missing, showing stable)".yellow()));
    }
    if VersionInfo::is_update_available(local, &remote) {
        line.push_str(&format!(" {}", "update available".green().bold()));
    }
    println!("{line}");
}
