//! The `nimbus branches` command: list the available branch builds.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::channels::{ChannelRegistry, HttpReleaseFetcher};
use crate::config::LauncherConfig;

/// Command-line arguments for the branches command.
#[derive(Parser, Debug)]
pub struct BranchesCommand {}

impl BranchesCommand {
    pub async fn execute(&self, config: &LauncherConfig) -> Result<()> {
        let registry = ChannelRegistry::new(
            HttpReleaseFetcher::new(),
            config.app_repo()?,
            config.launcher_repo()?,
        );

        let builds = registry.list_branches().await;
        if builds.is_empty() {
            println!("No branch builds available");
            return Ok(());
        }

        let selected = config.channel.branch_name();
        println!("Available branch builds:");
        for build in builds {
            let tag = build.doc.tag_name.as_deref().unwrap_or("-");
            if selected == Some(build.name.as_str()) {
                println!("  {} {}  {}", "*".green(), build.name.bold(), tag.dimmed());
            } else {
                println!("    {}  {}", build.name, tag.dimmed());
            }
        }
        Ok(())
    }
}
