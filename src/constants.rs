//! Global constants used throughout the Nimbus codebase.
//!
//! This module contains timeout durations, buffer sizes, and the reserved
//! filesystem names the update engine relies on. Defining them centrally
//! improves maintainability and makes magic numbers more discoverable.

use std::time::Duration;

/// Time-to-live for the cached branch-build listing (5 minutes).
///
/// Within this window repeated `list_branches` calls reuse the cached
/// listing instead of hitting the release host again.
pub const BRANCH_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Fixed spacing between launches of grouped channel-metadata fetches.
///
/// Spreads load on the release host. This is not a correctness
/// requirement; the fetches themselves still run concurrently.
pub const CHANNEL_FETCH_SPACING: Duration = Duration::from_millis(250);

/// Chunk size for streaming copies (64 KiB).
///
/// Each chunk is written to the destination before the next read, so
/// this bounds the engine's buffering during downloads.
pub const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Reserved suffix appended to live entries displaced during a swap.
///
/// An entry carrying this suffix is either mid-transaction state or a
/// leftover from an interrupted run; the startup sweeper deletes the
/// latter.
pub const DISPLACED_SUFFIX: &str = ".old";

/// Tag prefix identifying branch builds on the release host.
pub const BRANCH_TAG_PREFIX: &str = "branch-";

/// Name of the marker file recording the locally installed version.
///
/// Holds the raw version string only; it is parsed on demand and never
/// written back in structured form.
pub const VERSION_MARKER_FILE: &str = "version";

/// Top-level install-root entries the self-update swap must never touch.
///
/// These hold user data and the managed application payload. The swap
/// additionally skips any live entry without a staged counterpart, so
/// this set is a hard guarantee on top of that structural protection.
pub const USER_DATA_ENTRIES: &[&str] = &["app", "profiles", "settings.toml", "logs"];

/// Placeholder shown for versions that could not be parsed.
pub const UNKNOWN_VERSION_DISPLAY: &str = "unknown";
