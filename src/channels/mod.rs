//! Release channels and their fetched snapshots.
//!
//! A channel is a named update track: the managed application's stable and
//! development tracks, an ad-hoc named branch track, and the launcher's
//! own self-update track. Each resolves independently to a
//! [`ChannelSnapshot`]; one channel's outage never blocks the others.
//!
//! [`registry::ChannelRegistry`] owns the live snapshot set and is its
//! single writer; readers receive cheap `Arc` views.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::version::VersionInfo;

pub mod registry;
pub mod release;

pub use registry::ChannelRegistry;
pub use release::{HttpReleaseFetcher, ReleaseFetcher, RepoLocator};

/// Identity of an update track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    /// The managed application's stable track.
    Stable,
    /// The managed application's dated development track.
    Dev,
    /// The launcher's own self-update track.
    LauncherSelf,
    /// The currently selected named-branch track.
    Branch,
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stable => "stable",
            Self::Dev => "dev",
            Self::LauncherSelf => "launcher",
            Self::Branch => "branch",
        };
        f.pad(name)
    }
}

/// A downloadable asset attached to a channel snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotAsset {
    /// Asset file name.
    pub name: String,
    /// Byte size when the host reported one.
    pub size: Option<u64>,
    /// Retrieval locator for the payload.
    pub download_url: String,
}

/// The fetched metadata of one channel at one point in time.
///
/// Snapshots are immutable once built; the registry replaces them wholesale
/// on each successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSnapshot {
    /// Which track this snapshot belongs to.
    pub channel: ChannelId,
    /// Tag identity as published (also the version payload).
    pub tag: String,
    /// Human-readable title, falling back to the tag.
    pub display_name: String,
    /// Downloadable assets; entries without a locator are dropped at
    /// construction.
    pub assets: Vec<SnapshotAsset>,
    /// Free-text release notes, if any.
    pub notes: Option<String>,
    /// When this metadata was fetched by the registry.
    pub fetched_at: DateTime<Utc>,
    /// True when this is the stable snapshot aliased into the branch
    /// channel because the selected branch no longer exists. Callers use
    /// this to surface the fallback instead of presenting a branch build
    /// that is not one.
    pub fallback_from_stable: bool,
}

impl ChannelSnapshot {
    /// Build a snapshot from a fetched release document.
    pub fn from_release(channel: ChannelId, doc: &release::ReleaseDoc) -> Self {
        let tag = doc.tag_name.clone().unwrap_or_default();
        let display_name = doc.name.clone().filter(|n| !n.is_empty()).unwrap_or_else(|| tag.clone());
        let assets = doc
            .assets
            .iter()
            .filter_map(|a| {
                let download_url = a.browser_download_url.clone()?;
                Some(SnapshotAsset {
                    name: a.name.clone().unwrap_or_default(),
                    size: a.size,
                    download_url,
                })
            })
            .collect();

        Self {
            channel,
            tag,
            display_name,
            assets,
            notes: doc.body.clone().filter(|b| !b.is_empty()),
            fetched_at: Utc::now(),
            fallback_from_stable: false,
        }
    }

    /// Re-home a snapshot onto another channel, marking it as the stable
    /// fallback. Content is otherwise identical to the source snapshot.
    pub fn aliased_to(&self, channel: ChannelId) -> Self {
        Self {
            channel,
            fallback_from_stable: true,
            ..self.clone()
        }
    }

    /// Parse the version payload on demand.
    pub fn version(&self) -> VersionInfo {
        VersionInfo::parse(&self.tag)
    }

    /// Find an asset by exact file name.
    pub fn find_asset(&self, name: &str) -> Option<&SnapshotAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// Shared read-only view of a snapshot as handed out by the registry.
pub type SnapshotRef = Arc<ChannelSnapshot>;
