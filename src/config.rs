//! Persisted launcher settings.
//!
//! Settings live in a TOML file at `~/.nimbus/config.toml`, overridable
//! with the `NIMBUS_CONFIG_PATH` environment variable. The engine reads
//! the channel selection and auto-update flag from here; everything is
//! defaulted so a missing or partial file never blocks startup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::channels::RepoLocator;

/// The update track the user selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelSelection {
    /// Follow stable releases.
    Stable,
    /// Follow dated development builds.
    Dev,
    /// Follow a named branch's builds.
    Branch {
        /// The selected branch name.
        name: String,
    },
}

impl Default for ChannelSelection {
    fn default() -> Self {
        Self::Stable
    }
}

impl ChannelSelection {
    /// The selected branch name, when the branch track is active.
    pub fn branch_name(&self) -> Option<&str> {
        match self {
            Self::Branch { name } => Some(name),
            _ => None,
        }
    }
}

/// Release repository coordinates for the managed application and the
/// launcher itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Owner/name of the managed application's release repository.
    #[serde(default = "default_app_repo")]
    pub app: String,
    /// Owner/name of the launcher's own release repository.
    #[serde(default = "default_launcher_repo")]
    pub launcher: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            app: default_app_repo(),
            launcher: default_launcher_repo(),
        }
    }
}

fn default_app_repo() -> String {
    "nimbus-app/phoenix".to_string()
}

fn default_launcher_repo() -> String {
    "nimbus-app/nimbus-launcher".to_string()
}

fn parse_repo(coords: &str) -> Result<RepoLocator> {
    let (owner, repo) = coords
        .split_once('/')
        .with_context(|| format!("Repository '{coords}' is not in owner/name form"))?;
    Ok(RepoLocator::new(owner, repo))
}

/// Launcher configuration as persisted on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Which update track to follow.
    #[serde(default)]
    pub channel: ChannelSelection,
    /// Whether to self-update without prompting when a newer launcher
    /// build is available.
    #[serde(default)]
    pub auto_update: bool,
    /// Installation root override; defaults to the running executable's
    /// directory.
    #[serde(default)]
    pub install_root: Option<PathBuf>,
    /// Release repository coordinates.
    #[serde(default)]
    pub repos: RepoConfig,
}

impl LauncherConfig {
    /// Resolve the config file path: env override, then home directory.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("NIMBUS_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }
        Ok(dirs::home_dir()
            .context("Could not determine home directory")?
            .join(".nimbus")
            .join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when the file
    /// does not exist yet.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            debug!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path).await
    }

    /// Load from an explicit path.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Persist to the default location, creating parent directories.
    pub async fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?).await
    }

    /// Persist to an explicit path.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Coordinates of the managed application's release repository.
    pub fn app_repo(&self) -> Result<RepoLocator> {
        parse_repo(&self.repos.app)
    }

    /// Coordinates of the launcher's own release repository.
    pub fn launcher_repo(&self) -> Result<RepoLocator> {
        parse_repo(&self.repos.launcher)
    }

    /// The installation root: explicit override, else the directory the
    /// running executable lives in.
    pub fn install_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.install_root {
            return Ok(root.clone());
        }
        let exe = std::env::current_exe().context("Failed to locate current executable")?;
        Ok(exe
            .parent()
            .context("Executable has no parent directory")?
            .to_path_buf())
    }
}
