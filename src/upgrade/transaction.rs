//! The self-update swap: replacing the launcher's own files on disk while
//! it runs from them.
//!
//! The transaction follows a strict six-step protocol: acquire (download),
//! stage (extract into a private staging directory), displace (rename live
//! entries out of the way with a reserved suffix), install (move staged
//! entries in), permission fix-up, launch. Any step's failure jumps to a
//! best-effort rollback driven by the [`UndoLog`](super::rollback::UndoLog);
//! the temp archive and staging directory are cleaned up on every path.
//!
//! The live entries displaced are exactly the staged payload's top-level
//! names minus the user-data exclusion set. Live entries with no staged
//! counterpart are never touched, which protects user files even if the
//! exclusion set is incomplete: user files simply never have a staged
//! counterpart.
//!
//! Only one transaction may execute at a time system-wide; callers
//! serialize triggers. Cancellation is honored during the download only;
//! once staging begins the transaction runs to completion or to a full
//! rollback, never left half-applied by an external cancel.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channels::ChannelSnapshot;
use crate::constants::{DISPLACED_SUFFIX, USER_DATA_ENTRIES};
use crate::transfer::{self, CancelFlag, Progress};
use crate::utils::{archive, platform};

use super::rollback::{UndoLog, remove_path};

/// How the swap concluded when it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The replacement executable was launched; the caller should
    /// terminate the current process.
    Relaunched,
    /// Files are in place but no executable was found to relaunch; the
    /// user restarts manually. Not an error.
    ManualRestart,
}

/// Collaborator capability for confirming risky actions.
///
/// The engine calls out before proceeding while the managed application
/// appears to be running. When no collaborator is available the engine
/// declines to proceed rather than guessing.
pub trait ConfirmAction {
    /// Return `true` to proceed with the described risky action.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Marker file the managed application holds open while running.
const APP_RUNNING_MARKER: &str = "app/.lock";

/// A single self-update attempt against one installation directory.
///
/// Created fresh per attempt and fully consumed by [`run`](Self::run).
pub struct SelfUpdateTransaction<'a> {
    install_dir: PathBuf,
    client: reqwest::Client,
    confirm: Option<&'a dyn ConfirmAction>,
    cancel: Option<CancelFlag>,
}

impl<'a> SelfUpdateTransaction<'a> {
    pub fn new(install_dir: PathBuf, client: reqwest::Client) -> Self {
        Self {
            install_dir,
            client,
            confirm: None,
            cancel: None,
        }
    }

    /// Attach the risky-action confirmation collaborator.
    #[must_use]
    pub fn with_confirm(mut self, confirm: &'a dyn ConfirmAction) -> Self {
        self.confirm = Some(confirm);
        self
    }

    /// Attach a cancellation flag, honored during the download phase only.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Execute the full swap protocol against `snapshot`.
    ///
    /// Preconditions are checked before any filesystem side effect: the
    /// snapshot must carry an asset matching this platform's expected
    /// archive name, and a running managed application must be confirmed
    /// past. On success the prior state's backups are discarded; on any
    /// failure the recorded mutations are rolled back and the error is
    /// returned with context for display.
    pub async fn run(
        self,
        snapshot: &ChannelSnapshot,
        mut on_progress: impl FnMut(Progress),
    ) -> Result<SwapOutcome> {
        let archive_name = platform::expected_archive_name()
            .context("No release archive is published for this platform")?;
        let asset = snapshot.find_asset(&archive_name).with_context(|| {
            format!("Release {} has no asset named {archive_name}", snapshot.tag)
        })?;
        self.guard_running_app()?;

        info!("Starting self-update to {} from {}", snapshot.tag, asset.download_url);

        let scratch = tempfile::tempdir().context("Failed to create download scratch directory")?;
        let archive_path = scratch.path().join(&archive_name);
        let staging_dir = staging_path(&self.install_dir);

        let result = self
            .acquire_and_swap(&asset.download_url, asset.size, &archive_path, &staging_dir, &mut on_progress)
            .await;

        // Cleanup always: the scratch dir drops itself, the staging dir is
        // ours to remove.
        if let Err(e) = remove_path(&staging_dir) {
            warn!("Failed to clean up staging directory {}: {e}", staging_dir.display());
        }

        result
    }

    async fn acquire_and_swap(
        &self,
        url: &str,
        known_size: Option<u64>,
        archive_path: &Path,
        staging_dir: &Path,
        on_progress: &mut impl FnMut(Progress),
    ) -> Result<SwapOutcome> {
        // Step 1: acquire the platform asset into a private temp file.
        transfer::download_to_file(
            &self.client,
            url,
            archive_path,
            known_size,
            &mut *on_progress,
            self.cancel.clone(),
        )
        .await
        .context("Failed to download update archive")?;

        // Steps 2-5 are synchronous filesystem work; run them on a
        // blocking worker so the caller's event loop is not stalled.
        let archive_path = archive_path.to_path_buf();
        let staging_dir = staging_dir.to_path_buf();
        let install_dir = self.install_dir.clone();
        let undo = tokio::task::spawn_blocking(move || {
            fs::create_dir_all(&staging_dir).with_context(|| {
                format!("Failed to create staging directory {}", staging_dir.display())
            })?;
            archive::extract_zip(&archive_path, &staging_dir)
                .context("Failed to extract update archive")?;
            swap_from_staging(&staging_dir, &install_dir)
        })
        .await
        .context("Update swap task panicked")??;

        // Step 6: launch the replacement. A missing executable is the soft
        // manual-restart outcome; a spawn failure rolls the swap back.
        match self.launch_replacement() {
            Ok(outcome) => {
                undo.commit();
                Ok(outcome)
            }
            Err(e) => {
                warn!("Relaunch failed, rolling back swap: {e}");
                if tokio::task::spawn_blocking(move || undo.rollback()).await.is_err() {
                    warn!("Rollback task panicked; installation may need the startup sweep");
                }
                Err(e)
            }
        }
    }

    /// Decline or confirm proceeding while the managed app looks live.
    fn guard_running_app(&self) -> Result<()> {
        if !self.install_dir.join(APP_RUNNING_MARKER).exists() {
            return Ok(());
        }
        match self.confirm {
            Some(confirm) => {
                if confirm.confirm("The application appears to be running. Update anyway?") {
                    Ok(())
                } else {
                    bail!("Update declined while the application is running");
                }
            }
            None => {
                bail!("The application appears to be running and no confirmation is available")
            }
        }
    }

    fn launch_replacement(&self) -> Result<SwapOutcome> {
        let executable = self.install_dir.join(platform::launcher_executable_name());
        if !executable.exists() {
            info!("No replacement executable at {}; manual restart needed", executable.display());
            return Ok(SwapOutcome::ManualRestart);
        }

        std::process::Command::new(&executable)
            .current_dir(&self.install_dir)
            .spawn()
            .with_context(|| format!("Failed to launch {}", executable.display()))?;
        info!("Launched replacement executable {}", executable.display());
        Ok(SwapOutcome::Relaunched)
    }
}

/// Unique staging directory next to the install root, falling back to the
/// system temp directory when the root has no parent. Staying on the same
/// filesystem keeps the install step a rename instead of a copy.
fn staging_path(install_dir: &Path) -> PathBuf {
    let name = format!(".nimbus-staging-{}", Uuid::new_v4());
    match install_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => std::env::temp_dir().join(name),
    }
}

/// Steps 3-5 of the protocol: displace, install, fix permissions.
///
/// Returns the undo log on success for the caller to commit or roll back
/// after the launch step. On any internal failure the log is rolled back
/// here and the error returned.
pub fn swap_from_staging(staging_dir: &Path, install_dir: &Path) -> Result<UndoLog> {
    let mut undo = UndoLog::new();
    match displace_and_install(staging_dir, install_dir, &mut undo) {
        Ok(()) => Ok(undo),
        Err(e) => {
            warn!("Swap failed, rolling back: {e}");
            undo.rollback();
            Err(e)
        }
    }
}

/// Top-level staged entries subject to the swap, with user-data names
/// excluded unconditionally.
fn staged_entries(staging_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    let read = fs::read_dir(staging_dir)
        .with_context(|| format!("Failed to read staging directory {}", staging_dir.display()))?;
    for entry in read {
        let entry = entry.context("Failed to read staging entry")?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if USER_DATA_ENTRIES.contains(&name.as_str()) {
            debug!("Skipping user-data entry '{name}' in staged payload");
            continue;
        }
        entries.push((name, entry.path()));
    }
    // Deterministic order keeps the undo log reproducible.
    entries.sort();
    Ok(entries)
}

fn displace_and_install(staging_dir: &Path, install_dir: &Path, undo: &mut UndoLog) -> Result<()> {
    let entries = staged_entries(staging_dir)?;

    // Step 3: displace every live entry with a staged counterpart. Live
    // entries without one are left untouched.
    for (name, _) in &entries {
        let live = install_dir.join(name);
        if !live.exists() {
            continue;
        }
        let backed_up = install_dir.join(format!("{name}{DISPLACED_SUFFIX}"));
        // A stale marker-suffixed entry from a previously interrupted run
        // may occupy the slot; clear it first.
        remove_path(&backed_up).with_context(|| {
            format!("Failed to clear stale backup {}", backed_up.display())
        })?;
        fs::rename(&live, &backed_up).with_context(|| {
            format!("Failed to displace {} to {}", live.display(), backed_up.display())
        })?;
        debug!("Displaced {} -> {}", live.display(), backed_up.display());
        undo.record_displaced(live, backed_up);
    }

    // Step 4: move the staged payload in. The displacement step already
    // cleared every slot, so nothing is overwritten.
    for (name, staged) in &entries {
        let dest = install_dir.join(name);
        fs::rename(staged, &dest).with_context(|| {
            format!("Failed to install {} to {}", staged.display(), dest.display())
        })?;
        debug!("Installed {}", dest.display());
        undo.record_installed(dest);
    }

    fix_permissions(undo)?;
    Ok(())
}

/// Step 5: on unix targets, mark the new executable and shared libraries
/// as world-readable and owner/group/other-executable.
#[cfg(unix)]
fn fix_permissions(undo: &UndoLog) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for installed in undo.installed() {
        for entry in walkdir::WalkDir::new(installed).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if platform::needs_executable_bit(&name) {
                fs::set_permissions(entry.path(), fs::Permissions::from_mode(0o755))
                    .with_context(|| {
                        format!("Failed to set permissions on {}", entry.path().display())
                    })?;
                debug!("Marked {} executable", entry.path().display());
            }
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn fix_permissions(_undo: &UndoLog) -> Result<()> {
    Ok(())
}
