//! Zip extraction into a staging directory.
//!
//! Extraction always targets a freshly created staging directory, never
//! the live installation. Entry paths are validated against traversal
//! (`..`, absolute paths) so a hostile archive cannot write outside the
//! staging root. This is synchronous I/O and is run on a blocking worker
//! by the transaction.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;
use zip::ZipArchive;

/// Extract `archive_path` into `staging_dir`.
///
/// `staging_dir` must already exist and should be empty. Returns the
/// number of entries written.
pub fn extract_zip(archive_path: &Path, staging_dir: &Path) -> Result<usize> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read archive {}", archive_path.display()))?;

    let mut written = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .with_context(|| format!("Failed to read archive entry {index}"))?;

        let Some(rel_path) = sanitized_entry_path(entry.name()) else {
            bail!("Archive entry '{}' escapes the staging directory", entry.name());
        };
        let dest = staging_dir.join(&rel_path);

        if entry.is_dir() {
            fs::create_dir_all(&dest)
                .with_context(|| format!("Failed to create directory {}", dest.display()))?;
            continue;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let mut out = File::create(&dest)
            .with_context(|| format!("Failed to create file {}", dest.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to extract {}", dest.display()))?;
        written += 1;
    }

    debug!("Extracted {written} entries into {}", staging_dir.display());
    Ok(written)
}

/// Reject absolute paths and any `..` component; return the normalized
/// relative path otherwise.
fn sanitized_entry_path(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() { None } else { Some(out) }
}
