//! Version parsing and update-availability decisions.
//!
//! Nimbus consumes version strings in three mutually exclusive dialects:
//!
//! - **Stable**: a plain semantic version, optionally `v`-prefixed
//!   (`v1.4.2`, `1.4.2`)
//! - **Dev**: a dated development build with a commit fragment
//!   (`0.0.0-dev.20240115.abc1234`)
//! - **Branch**: a dated named-branch build
//!   (`branch-feature-x.20240115.abc1234`)
//!
//! The rendered display forms of the dev and branch dialects
//! (`dev.20240115.abc1234`, `feature-x.20240115.abc1234`) are accepted as
//! input too, so displayed values re-parse to the same kind. Anything else
//! parses as [`VersionKind::Unknown`], carrying the raw text. Parsing never
//! fails; comparisons involving `Unknown` are conservative (never claim an
//! update from unparseable remote data).
//!
//! # Comparison semantics
//!
//! Cross-kind transitions always report an update, because "newer" is not
//! well-ordered across dialects and a deployment tool must never silently
//! withhold an update it cannot compare. Dev and branch builds likewise do
//! not order by date: any raw-string difference counts as an update, so a
//! same-day rebuild with a different commit fragment is picked up. Channel
//! switch UX downstream depends on these coarse semantics; do not replace
//! them with a date-aware ordering.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::constants::UNKNOWN_VERSION_DISPLAY;

/// The dialect a version string was recognized as, with its structured
/// components.
///
/// Exactly one variant's payload is populated per instance; `Unknown`
/// carries no structured data beyond the raw text held by [`VersionInfo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionKind {
    /// Input did not match any recognized dialect.
    Unknown,
    /// Stable semantic version: (major, minor, patch).
    Stable(u64, u64, u64),
    /// Dated development build.
    Dev {
        /// 8-digit calendar date, e.g. `20240115`.
        date: String,
        /// Short lowercase-hex commit fragment.
        hash: String,
    },
    /// Dated build from a named branch.
    Branch {
        /// Branch name; may itself contain dots.
        name: String,
        /// 8-digit calendar date.
        date: String,
        /// Short lowercase-hex commit fragment.
        hash: String,
    },
}

/// An immutable, parsed version value.
///
/// Constructed by [`VersionInfo::parse`] from a tag string, a release
/// payload, or the local install marker. Only the raw string form is ever
/// persisted; the structured form lives in memory for comparison and
/// display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    raw: String,
    kind: VersionKind,
}

fn dev_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^0\.0\.0-dev\.(\d{8})\.([0-9a-f]+)$").expect("dev version pattern is valid")
    })
}

fn branch_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Branch names may contain dots, so the name match is lazy and the
        // trailing date/hash anchor the split.
        Regex::new(r"^branch-(.+?)\.(\d{8})\.([0-9a-f]+)$").expect("branch version pattern is valid")
    })
}

fn dev_display_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^dev\.(\d{8})\.([0-9a-f]+)$").expect("dev display pattern is valid")
    })
}

fn branch_display_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.+?)\.(\d{8})\.([0-9a-f]+)$").expect("branch display pattern is valid")
    })
}

impl VersionInfo {
    /// Parse a version string into its dialect.
    ///
    /// Never fails: input matching none of the dialects yields an
    /// `Unknown` instance carrying the trimmed raw text. Matching is
    /// attempted in order: the dev and branch tag forms, the dev and
    /// branch display forms (so values rendered by [`fmt::Display`]
    /// re-parse to the same kind), then stable.
    pub fn parse(text: &str) -> Self {
        let raw = text.trim().to_string();

        if let Some(caps) = dev_pattern().captures(&raw) {
            let kind = VersionKind::Dev {
                date: caps[1].to_string(),
                hash: caps[2].to_string(),
            };
            return Self { raw, kind };
        }

        if let Some(caps) = branch_pattern().captures(&raw) {
            let kind = VersionKind::Branch {
                name: caps[1].to_string(),
                date: caps[2].to_string(),
                hash: caps[3].to_string(),
            };
            return Self { raw, kind };
        }

        if let Some(caps) = dev_display_pattern().captures(&raw) {
            let kind = VersionKind::Dev {
                date: caps[1].to_string(),
                hash: caps[2].to_string(),
            };
            return Self { raw, kind };
        }

        if let Some(caps) = branch_display_pattern().captures(&raw) {
            let kind = VersionKind::Branch {
                name: caps[1].to_string(),
                date: caps[2].to_string(),
                hash: caps[3].to_string(),
            };
            return Self { raw, kind };
        }

        if let Ok(v) = semver::Version::parse(raw.trim_start_matches('v'))
            && v.pre.is_empty()
            && v.build.is_empty()
        {
            return Self {
                raw,
                kind: VersionKind::Stable(v.major, v.minor, v.patch),
            };
        }

        Self {
            raw,
            kind: VersionKind::Unknown,
        }
    }

    /// The trimmed input string this value was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The recognized dialect and its components.
    pub fn kind(&self) -> &VersionKind {
        &self.kind
    }

    /// Whether this value failed to match any dialect.
    pub fn is_unknown(&self) -> bool {
        matches!(self.kind, VersionKind::Unknown)
    }

    /// Decide whether `remote` constitutes an update over `local`.
    ///
    /// The rules, in order:
    ///
    /// 1. An unknown remote is never an update (don't trust unparseable
    ///    metadata).
    /// 2. An unknown local baseline makes any valid remote an update.
    /// 3. A kind mismatch is always an update; channel or format switches
    ///    must go through rather than being dropped as incomparable.
    /// 4. Stable vs stable: strictly greater under (major, minor, patch)
    ///    lexicographic ordering.
    /// 5. Dev/branch vs same kind: any raw-string difference.
    pub fn is_update_available(local: &Self, remote: &Self) -> bool {
        match (&local.kind, &remote.kind) {
            (_, VersionKind::Unknown) => false,
            (VersionKind::Unknown, _) => true,
            (VersionKind::Stable(lm, ln, lp), VersionKind::Stable(rm, rn, rp)) => {
                (rm, rn, rp) > (lm, ln, lp)
            }
            (VersionKind::Dev { .. }, VersionKind::Dev { .. })
            | (VersionKind::Branch { .. }, VersionKind::Branch { .. }) => local.raw != remote.raw,
            _ => true,
        }
    }
}

impl fmt::Display for VersionInfo {
    /// Render the canonical display form for each dialect.
    ///
    /// Stable normalizes to a `v` prefix regardless of how it was written;
    /// unknown values render as a fixed placeholder.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            VersionKind::Unknown => write!(f, "{UNKNOWN_VERSION_DISPLAY}"),
            VersionKind::Stable(major, minor, patch) => write!(f, "v{major}.{minor}.{patch}"),
            VersionKind::Dev { date, hash } => write!(f, "dev.{date}.{hash}"),
            VersionKind::Branch { name, date, hash } => write!(f, "{name}.{date}.{hash}"),
        }
    }
}
