//! Release-host wire format and the fetcher seam.
//!
//! The engine consumes a GitHub-style JSON release document per fetch. The
//! schema is dictated by the upstream host and treated as partially
//! trusted: every field is optional and parsing is defensive, so a missing
//! or malformed field degrades to "no data" instead of an error.
//!
//! [`ReleaseFetcher`] is the seam between the registry and the network;
//! production uses [`HttpReleaseFetcher`], tests substitute stubs.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Coordinates of a release repository on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocator {
    /// Repository owner or organization.
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

impl RepoLocator {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl std::fmt::Display for RepoLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// One release document as published by the host.
///
/// All fields are optional by design; callers must cope with any subset
/// being absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseDoc {
    /// Tag identity, e.g. `v1.4.2` or `branch-feature-x.20240115.abc1234`.
    #[serde(default)]
    pub tag_name: Option<String>,
    /// Human-readable release title.
    #[serde(default)]
    pub name: Option<String>,
    /// Free-text release notes.
    #[serde(default)]
    pub body: Option<String>,
    /// Publish timestamp reported by the host.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Downloadable assets attached to the release.
    #[serde(default)]
    pub assets: Vec<ReleaseAssetDoc>,
}

/// One downloadable asset attached to a release.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseAssetDoc {
    /// File name of the asset.
    #[serde(default)]
    pub name: Option<String>,
    /// Byte size, when the host reports one.
    #[serde(default)]
    pub size: Option<u64>,
    /// Retrieval locator for the asset payload.
    #[serde(default)]
    pub browser_download_url: Option<String>,
}

/// Failure fetching or decoding release metadata.
///
/// The registry logs these and degrades to "no data for this channel";
/// they never reach the engine's callers.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure reaching the release host.
    #[error("request to release host failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The host answered with a non-success status.
    #[error("release host returned status {0}")]
    Status(reqwest::StatusCode),
    /// The response body was not a valid release document.
    #[error("malformed release metadata: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of release metadata for the registry.
///
/// Implementations must be safe to call concurrently; the registry issues
/// independent fetches for distinct channels at the same time.
pub trait ReleaseFetcher: Send + Sync {
    /// Fetch the latest published release of `repo`.
    fn fetch_latest(
        &self,
        repo: &RepoLocator,
    ) -> impl Future<Output = Result<ReleaseDoc, FetchError>> + Send;

    /// Fetch the full release listing of `repo`, newest first.
    fn fetch_all(
        &self,
        repo: &RepoLocator,
    ) -> impl Future<Output = Result<Vec<ReleaseDoc>, FetchError>> + Send;
}

/// `reqwest`-backed fetcher against a GitHub-style releases API.
#[derive(Debug, Clone)]
pub struct HttpReleaseFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReleaseFetcher {
    /// Create a fetcher against the public GitHub API.
    pub fn new() -> Self {
        Self::with_base_url("https://api.github.com")
    }

    /// Create a fetcher against a custom API root (mirrors, test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("nimbus-launcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// The HTTP client, shared with asset downloads.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        // Decode from text so schema problems surface as Decode, not as an
        // opaque transport error.
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl Default for HttpReleaseFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseFetcher for HttpReleaseFetcher {
    async fn fetch_latest(&self, repo: &RepoLocator) -> Result<ReleaseDoc, FetchError> {
        let url = format!("{}/repos/{}/{}/releases/latest", self.base_url, repo.owner, repo.repo);
        self.get_json(&url).await
    }

    async fn fetch_all(&self, repo: &RepoLocator) -> Result<Vec<ReleaseDoc>, FetchError> {
        let url =
            format!("{}/repos/{}/{}/releases?per_page=50", self.base_url, repo.owner, repo.repo);
        self.get_json(&url).await
    }
}
