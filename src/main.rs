//! Nimbus CLI entry point.
//!
//! Parses arguments, initializes logging, runs the startup sweep for
//! artifacts of a previously interrupted self-update, and dispatches to
//! the selected command.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use nimbus_launcher::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.init_logging();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}
