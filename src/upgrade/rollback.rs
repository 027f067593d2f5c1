//! The undo log that makes rollback possible.
//!
//! Every filesystem mutation the swap performs is recorded here as it
//! happens: `(original, backed_up)` rename pairs from the displacement
//! step and destination paths from the install step. Rollback replays the
//! log instead of introspecting the filesystem, so a half-applied swap is
//! reverted from ground truth about what was actually done.
//!
//! Rollback is best effort: each individual deletion or rename failure is
//! logged and skipped, so a partial rollback still restores as much as
//! possible.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Remove a file or directory tree, tolerating its absence.
pub(crate) fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if meta.is_dir() { fs::remove_dir_all(path) } else { fs::remove_file(path) }
}

/// Ordered record of the mutations one swap performed.
///
/// Created fresh per self-update attempt and fully consumed (committed or
/// rolled back) before the attempt returns.
#[derive(Debug, Default)]
pub struct UndoLog {
    /// `(original, backed_up)` pairs, in displacement order.
    displaced: Vec<(PathBuf, PathBuf)>,
    /// Destination paths written from staging, in install order.
    installed: Vec<PathBuf>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a live entry renamed out of the way.
    pub fn record_displaced(&mut self, original: PathBuf, backed_up: PathBuf) {
        self.displaced.push((original, backed_up));
    }

    /// Record a destination newly written from staging.
    pub fn record_installed(&mut self, destination: PathBuf) {
        self.installed.push(destination);
    }

    /// Destinations written so far, in install order.
    pub fn installed(&self) -> &[PathBuf] {
        &self.installed
    }

    /// Rename pairs performed so far, in displacement order.
    pub fn displaced(&self) -> &[(PathBuf, PathBuf)] {
        &self.displaced
    }

    /// Commit the swap: delete the backed-up entries, keeping the newly
    /// installed files. Failures to delete a backup are logged only; the
    /// startup sweeper picks up anything left behind.
    pub fn commit(self) {
        for (original, backed_up) in &self.displaced {
            if let Err(e) = remove_path(backed_up) {
                warn!("Failed to remove displaced backup {}: {e}", backed_up.display());
            } else {
                debug!("Removed displaced backup for {}", original.display());
            }
        }
    }

    /// Undo the swap: delete everything installed (reverse order), then
    /// restore every displaced entry to its original name.
    ///
    /// Returns the number of log entries successfully reverted.
    pub fn rollback(self) -> usize {
        let mut reverted = 0;

        for destination in self.installed.iter().rev() {
            match remove_path(destination) {
                Ok(()) => {
                    debug!("Rolled back install of {}", destination.display());
                    reverted += 1;
                }
                Err(e) => {
                    warn!("Rollback: failed to remove {}: {e}", destination.display());
                }
            }
        }

        for (original, backed_up) in self.displaced.iter().rev() {
            // Anything occupying the original name is wreckage from the
            // failed install; clear it before restoring.
            if let Err(e) = remove_path(original) {
                warn!("Rollback: failed to clear {}: {e}", original.display());
                continue;
            }
            match fs::rename(backed_up, original) {
                Ok(()) => {
                    debug!("Restored {}", original.display());
                    reverted += 1;
                }
                Err(e) => {
                    warn!(
                        "Rollback: failed to restore {} from {}: {e}",
                        original.display(),
                        backed_up.display()
                    );
                }
            }
        }

        reverted
    }
}
