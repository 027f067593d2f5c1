//! Startup cleanup of leftover swap artifacts.
//!
//! A transaction that crashed between displacement and a completed
//! rollback or install leaves marker-suffixed entries behind. Sweeping
//! them at process start keeps a manual retry from being blocked by a
//! half-renamed file or directory. Deletion is best effort; failures are
//! logged and skipped.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::constants::DISPLACED_SUFFIX;

use super::rollback::remove_path;

/// Recursively delete every marker-suffixed entry under `install_dir`.
///
/// Returns the number of entries removed. A missing install directory is
/// not an error; there is nothing to sweep.
pub fn sweep_stale_artifacts(install_dir: &Path) -> usize {
    if !install_dir.is_dir() {
        return 0;
    }

    let mut stale = Vec::new();
    let mut walker = WalkDir::new(install_dir).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Sweep: failed to read directory entry: {e}");
                continue;
            }
        };
        if entry.file_name().to_string_lossy().ends_with(DISPLACED_SUFFIX) {
            if entry.file_type().is_dir() {
                // The whole tree goes; no need to descend into it.
                walker.skip_current_dir();
            }
            stale.push(entry.into_path());
        }
    }

    let mut removed = 0;
    for path in stale {
        match remove_path(&path) {
            Ok(()) => {
                debug!("Swept stale artifact {}", path.display());
                removed += 1;
            }
            Err(e) => {
                warn!("Sweep: failed to remove {}: {e}", path.display());
            }
        }
    }
    removed
}
