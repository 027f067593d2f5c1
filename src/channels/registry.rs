//! The process-wide owner of channel snapshots.
//!
//! `ChannelRegistry` fetches release metadata per channel, caches the
//! branch-build listing behind a TTL, and applies the fallback policy when
//! a selected branch disappears. It is the single writer into the snapshot
//! map; concurrent readers get `Arc` views via [`ChannelRegistry::snapshot`].
//!
//! Failure semantics: every network fetch is independently wrapped. A
//! fetch failure is logged and leaves that channel without data; it never
//! blocks the other channels and never propagates to the caller.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::constants::{BRANCH_CACHE_TTL, BRANCH_TAG_PREFIX, CHANNEL_FETCH_SPACING};
use crate::version::{VersionInfo, VersionKind};

use super::release::{FetchError, ReleaseDoc, ReleaseFetcher, RepoLocator};
use super::{ChannelId, ChannelSnapshot, SnapshotRef};

/// One entry of the branch-build listing: a branch name with the release
/// document backing it.
#[derive(Debug, Clone)]
pub struct BranchBuild {
    /// Branch name with the tag prefix stripped.
    pub name: String,
    /// The backing release document.
    pub doc: ReleaseDoc,
}

struct BranchCache {
    fetched_at: Instant,
    builds: Vec<BranchBuild>,
}

/// Fetches and owns release metadata for every channel the launcher cares
/// about.
///
/// # Concurrency contract
///
/// The snapshot map supports safe concurrent insert/update and lock-free
/// reads; the registry is its only writer. Grouped fetches in
/// [`refresh_all`](Self::refresh_all) run concurrently with a fixed
/// inter-launch spacing that exists purely to spread load on the release
/// host. Branch resolution runs strictly after the fetch group completes
/// because its fallback path depends on stable data being present.
pub struct ChannelRegistry<F> {
    fetcher: F,
    app_repo: RepoLocator,
    launcher_repo: RepoLocator,
    snapshots: DashMap<ChannelId, SnapshotRef>,
    branch_cache: Mutex<Option<BranchCache>>,
    branch_ttl: Duration,
    fetch_spacing: Duration,
}

impl<F: ReleaseFetcher> ChannelRegistry<F> {
    /// Create a registry over the given fetcher and repositories.
    pub fn new(fetcher: F, app_repo: RepoLocator, launcher_repo: RepoLocator) -> Self {
        Self {
            fetcher,
            app_repo,
            launcher_repo,
            snapshots: DashMap::new(),
            branch_cache: Mutex::new(None),
            branch_ttl: BRANCH_CACHE_TTL,
            fetch_spacing: CHANNEL_FETCH_SPACING,
        }
    }

    /// Override the branch-listing TTL (tests use short windows).
    #[must_use]
    pub fn with_branch_ttl(mut self, ttl: Duration) -> Self {
        self.branch_ttl = ttl;
        self
    }

    /// Override the inter-fetch spacing (tests use zero).
    #[must_use]
    pub fn with_fetch_spacing(mut self, spacing: Duration) -> Self {
        self.fetch_spacing = spacing;
        self
    }

    /// The underlying fetcher (tests inspect stub call counts).
    pub fn fetcher_ref(&self) -> &F {
        &self.fetcher
    }

    /// Whether a snapshot is currently stored for `channel`.
    pub fn has_data(&self, channel: ChannelId) -> bool {
        self.snapshots.contains_key(&channel)
    }

    /// Read-only view of the current snapshot for `channel`, if any.
    pub fn snapshot(&self, channel: ChannelId) -> Option<SnapshotRef> {
        self.snapshots.get(&channel).map(|entry| entry.value().clone())
    }

    /// Refresh the Stable, Dev, and LauncherSelf channels concurrently,
    /// then resolve the branch channel.
    ///
    /// Each fetch is independent: a single channel's failure is logged and
    /// leaves that channel's previous snapshot (if any) in place without
    /// affecting the others. `selected_branch` is the branch name from the
    /// user's settings, or `None` when no branch is selected.
    pub async fn refresh_all(&self, selected_branch: Option<&str>) {
        let stable = self.fetch_into(ChannelId::Stable, 0);
        let dev = self.fetch_into(ChannelId::Dev, 1);
        let launcher = self.fetch_into(ChannelId::LauncherSelf, 2);
        futures::join!(stable, dev, launcher);

        // Runs only after the group: the fallback below needs the stable
        // snapshot to exist if it is going to exist at all.
        if let Some(name) = selected_branch {
            self.resolve_branch(name).await;
        }
    }

    /// Fetch one channel's metadata and store the resulting snapshot.
    ///
    /// `slot` staggers the launch within a fetch group.
    async fn fetch_into(&self, channel: ChannelId, slot: u32) {
        if slot > 0 && !self.fetch_spacing.is_zero() {
            tokio::time::sleep(self.fetch_spacing * slot).await;
        }

        match self.fetch_channel(channel).await {
            Ok(Some(snapshot)) => {
                debug!("Fetched {channel} channel: {}", snapshot.tag);
                self.snapshots.insert(channel, SnapshotRef::new(snapshot));
            }
            Ok(None) => {
                debug!("No matching release for {channel} channel");
            }
            Err(e) => {
                warn!("Failed to fetch {channel} channel metadata: {e}");
            }
        }
    }

    async fn fetch_channel(&self, channel: ChannelId) -> Result<Option<ChannelSnapshot>, FetchError> {
        match channel {
            ChannelId::Stable => {
                let doc = self.fetcher.fetch_latest(&self.app_repo).await?;
                Ok(Some(ChannelSnapshot::from_release(channel, &doc)))
            }
            ChannelId::LauncherSelf => {
                let doc = self.fetcher.fetch_latest(&self.launcher_repo).await?;
                Ok(Some(ChannelSnapshot::from_release(channel, &doc)))
            }
            ChannelId::Dev => {
                // The dev track is the newest release whose tag parses as a
                // dated development build.
                let docs = self.fetcher.fetch_all(&self.app_repo).await?;
                let dev = docs.into_iter().find(|d| {
                    d.tag_name.as_deref().is_some_and(|t| {
                        matches!(VersionInfo::parse(t).kind(), VersionKind::Dev { .. })
                    })
                });
                Ok(dev.map(|d| ChannelSnapshot::from_release(channel, &d)))
            }
            // The branch channel is resolved from the listing, not fetched
            // directly.
            ChannelId::Branch => Ok(None),
        }
    }

    /// Resolve the branch channel for the selected branch name.
    ///
    /// An exact-name hit in the (possibly cached) branch listing becomes
    /// the branch snapshot. A miss falls back to aliasing the current
    /// stable snapshot, flagged so callers can react; a user who selected
    /// a since-deleted branch still gets a usable update target. With no
    /// stable data either, the branch channel simply stays empty.
    pub async fn resolve_branch(&self, name: &str) {
        if name.is_empty() {
            return;
        }

        let builds = self.list_branches().await;
        if let Some(build) = builds.iter().find(|b| b.name == name) {
            let snapshot = ChannelSnapshot::from_release(ChannelId::Branch, &build.doc);
            info!("Resolved branch '{name}' to {}", snapshot.tag);
            self.snapshots.insert(ChannelId::Branch, SnapshotRef::new(snapshot));
            return;
        }

        warn!("Selected branch '{name}' not found in branch listing");
        if let Some(stable) = self.snapshot(ChannelId::Stable) {
            info!("Falling back to stable build {} for branch channel", stable.tag);
            let aliased = stable.aliased_to(ChannelId::Branch);
            self.snapshots.insert(ChannelId::Branch, SnapshotRef::new(aliased));
        } else {
            warn!("No stable snapshot available for branch fallback");
        }
    }

    /// The branch-build listing, cached for the configured TTL.
    ///
    /// A fetch failure with no cache yields an empty listing; with a stale
    /// cache, the stale listing is returned. Errors never propagate.
    pub async fn list_branches(&self) -> Vec<BranchBuild> {
        let mut cache = self.branch_cache.lock().await;

        if let Some(cached) = cache.as_ref()
            && cached.fetched_at.elapsed() < self.branch_ttl
        {
            debug!("Using cached branch listing ({} builds)", cached.builds.len());
            return cached.builds.clone();
        }

        match self.fetcher.fetch_all(&self.app_repo).await {
            Ok(docs) => {
                let builds: Vec<BranchBuild> = docs
                    .into_iter()
                    .filter_map(|doc| {
                        let tag = doc.tag_name.as_deref()?;
                        let name = tag.strip_prefix(BRANCH_TAG_PREFIX)?;
                        // Strip the trailing date and hash components to
                        // expose the bare branch name.
                        let name = branch_name_from_suffix(name).to_string();
                        Some(BranchBuild { name, doc })
                    })
                    .collect();
                debug!("Fetched branch listing: {} builds", builds.len());
                *cache = Some(BranchCache {
                    fetched_at: Instant::now(),
                    builds: builds.clone(),
                });
                builds
            }
            Err(e) => {
                warn!("Failed to fetch branch listing: {e}");
                match cache.as_ref() {
                    Some(stale) => {
                        debug!("Returning stale branch listing ({} builds)", stale.builds.len());
                        stale.builds.clone()
                    }
                    None => Vec::new(),
                }
            }
        }
    }
}

/// Drop the `.{date}.{hash}` suffix from a prefix-stripped branch tag,
/// leaving the branch name (which may itself contain dots).
fn branch_name_from_suffix(stripped: &str) -> &str {
    let mut parts = stripped.rsplitn(3, '.');
    let hash = parts.next();
    let date = parts.next();
    let name = parts.next();
    match (name, date, hash) {
        (Some(name), Some(date), Some(hash))
            if date.len() == 8
                && date.bytes().all(|b| b.is_ascii_digit())
                && !hash.is_empty()
                && hash.bytes().all(|b| b.is_ascii_hexdigit()) =>
        {
            name
        }
        _ => stripped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_name_strips_date_and_hash() {
        assert_eq!(branch_name_from_suffix("feature-x.20240115.abc1234"), "feature-x");
        assert_eq!(branch_name_from_suffix("feature-x.y.20240115.abc1234"), "feature-x.y");
    }

    #[test]
    fn branch_name_without_build_suffix_is_kept_whole() {
        assert_eq!(branch_name_from_suffix("feature-x"), "feature-x");
        assert_eq!(branch_name_from_suffix("feature.notadate.xyz"), "feature.notadate.xyz");
    }

    #[test]
    fn branch_name_requires_a_non_empty_hash_segment() {
        assert_eq!(branch_name_from_suffix("feature-x.20240115."), "feature-x.20240115.");
    }
}
