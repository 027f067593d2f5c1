//! Channel registry behavior against stub fetchers: fetch independence,
//! branch fallback, and the branch-listing TTL.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nimbus_launcher::channels::release::{FetchError, ReleaseDoc, ReleaseFetcher, RepoLocator};
use nimbus_launcher::channels::{ChannelId, ChannelRegistry};

fn release(tag: &str) -> ReleaseDoc {
    serde_json::from_value(serde_json::json!({
        "tag_name": tag,
        "name": format!("Release {tag}"),
        "assets": [{
            "name": "nimbus-linux-x86_64.zip",
            "size": 1024,
            "browser_download_url": format!("https://example.invalid/{tag}.zip"),
        }],
    }))
    .expect("stub release document")
}

/// Serves scripted documents and counts listing fetches. Listing
/// responses are consumed in order, with the last one repeating.
struct StubFetcher {
    latest: Option<ReleaseDoc>,
    all: std::sync::Mutex<VecDeque<Result<Vec<ReleaseDoc>, ()>>>,
    list_calls: AtomicUsize,
}

impl StubFetcher {
    fn new(latest: Option<ReleaseDoc>, all: Result<Vec<ReleaseDoc>, ()>) -> Self {
        Self::scripted(latest, vec![all])
    }

    fn scripted(latest: Option<ReleaseDoc>, all: Vec<Result<Vec<ReleaseDoc>, ()>>) -> Self {
        Self {
            latest,
            all: std::sync::Mutex::new(all.into()),
            list_calls: AtomicUsize::new(0),
        }
    }

    fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

impl ReleaseFetcher for StubFetcher {
    async fn fetch_latest(&self, _repo: &RepoLocator) -> Result<ReleaseDoc, FetchError> {
        match &self.latest {
            Some(doc) => Ok(doc.clone()),
            None => Err(FetchError::Status(reqwest::StatusCode::NOT_FOUND)),
        }
    }

    async fn fetch_all(&self, _repo: &RepoLocator) -> Result<Vec<ReleaseDoc>, FetchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.all.lock().expect("stub queue poisoned");
        let response = if queue.len() > 1 {
            queue.pop_front().expect("non-empty queue")
        } else {
            queue.front().cloned().expect("stub fetcher has no scripted response")
        };
        match response {
            Ok(docs) => Ok(docs),
            Err(()) => Err(FetchError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)),
        }
    }
}

fn registry(fetcher: StubFetcher) -> ChannelRegistry<StubFetcher> {
    ChannelRegistry::new(
        fetcher,
        RepoLocator::new("nimbus-app", "phoenix"),
        RepoLocator::new("nimbus-app", "nimbus-launcher"),
    )
    .with_fetch_spacing(Duration::ZERO)
}

#[tokio::test]
async fn refresh_populates_independent_channels() {
    let fetcher = StubFetcher::new(
        Some(release("v2.0.0")),
        Ok(vec![release("0.0.0-dev.20240115.abc1234"), release("v2.0.0")]),
    );
    let reg = registry(fetcher);

    reg.refresh_all(None).await;

    assert!(reg.has_data(ChannelId::Stable));
    assert!(reg.has_data(ChannelId::Dev));
    assert!(reg.has_data(ChannelId::LauncherSelf));
    assert!(!reg.has_data(ChannelId::Branch));

    let dev = reg.snapshot(ChannelId::Dev).unwrap();
    assert_eq!(dev.tag, "0.0.0-dev.20240115.abc1234");
}

#[tokio::test]
async fn one_channel_failure_does_not_block_the_others() {
    // Latest fetches fail; the listing works, so only Dev resolves.
    let fetcher = StubFetcher::new(None, Ok(vec![release("0.0.0-dev.20240115.abc1234")]));
    let reg = registry(fetcher);

    reg.refresh_all(None).await;

    assert!(!reg.has_data(ChannelId::Stable));
    assert!(!reg.has_data(ChannelId::LauncherSelf));
    assert!(reg.has_data(ChannelId::Dev));
}

#[tokio::test]
async fn dev_channel_skips_tags_that_do_not_parse_as_dev_builds() {
    let fetcher = StubFetcher::new(
        None,
        Ok(vec![
            release("0.0.0-dev.garbage"),
            release("0.0.0-dev.20240115.abc1234"),
        ]),
    );
    let reg = registry(fetcher);

    reg.refresh_all(None).await;

    let dev = reg.snapshot(ChannelId::Dev).unwrap();
    assert_eq!(dev.tag, "0.0.0-dev.20240115.abc1234");
}

#[tokio::test]
async fn missing_branch_falls_back_to_the_stable_snapshot() {
    let fetcher = StubFetcher::new(
        Some(release("v2.0.0")),
        Ok(vec![release("branch-other.20240115.abc1234")]),
    );
    let reg = registry(fetcher);

    reg.refresh_all(Some("feature-x")).await;

    let stable = reg.snapshot(ChannelId::Stable).unwrap();
    let branch = reg.snapshot(ChannelId::Branch).unwrap();
    assert!(branch.fallback_from_stable);
    assert_eq!(branch.channel, ChannelId::Branch);
    assert_eq!(branch.tag, stable.tag);
    assert_eq!(branch.assets, stable.assets);
}

#[tokio::test]
async fn existing_branch_resolves_to_its_own_build() {
    let fetcher = StubFetcher::new(
        Some(release("v2.0.0")),
        Ok(vec![release("branch-feature-x.20240115.abc1234")]),
    );
    let reg = registry(fetcher);

    reg.refresh_all(Some("feature-x")).await;

    let branch = reg.snapshot(ChannelId::Branch).unwrap();
    assert!(!branch.fallback_from_stable);
    assert_eq!(branch.tag, "branch-feature-x.20240115.abc1234");
}

#[tokio::test]
async fn branch_miss_without_stable_leaves_the_channel_empty() {
    let fetcher = StubFetcher::new(None, Ok(vec![]));
    let reg = registry(fetcher);

    reg.refresh_all(Some("feature-x")).await;
    assert!(!reg.has_data(ChannelId::Branch));
}

#[tokio::test]
async fn branch_listing_is_cached_within_the_ttl() {
    let fetcher = StubFetcher::new(None, Ok(vec![release("branch-feature-x.20240115.abc1234")]));
    let reg = registry(fetcher).with_branch_ttl(Duration::from_secs(60));

    let first = reg.list_branches().await;
    let second = reg.list_branches().await;

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].name, "feature-x");
    assert_eq!(second.len(), 1);
    // Both calls within the TTL window: exactly one network fetch.
    assert_eq!(reg.fetcher_ref().list_calls(), 1);
}

#[tokio::test]
async fn expired_ttl_triggers_a_second_fetch() {
    let fetcher = StubFetcher::new(None, Ok(vec![release("branch-feature-x.20240115.abc1234")]));
    let reg = registry(fetcher).with_branch_ttl(Duration::ZERO);

    reg.list_branches().await;
    reg.list_branches().await;

    assert_eq!(reg.fetcher_ref().list_calls(), 2);
}

#[tokio::test]
async fn listing_failure_without_cache_yields_empty() {
    let fetcher = StubFetcher::new(None, Err(()));
    let reg = registry(fetcher);

    assert!(reg.list_branches().await.is_empty());
}

#[tokio::test]
async fn listing_failure_with_stale_cache_returns_the_stale_listing() {
    // First fetch succeeds and populates the cache; after the TTL expires
    // the second fetch fails and the stale listing is served instead.
    let fetcher = StubFetcher::scripted(
        None,
        vec![Ok(vec![release("branch-feature-x.20240115.abc1234")]), Err(())],
    );
    let reg = registry(fetcher).with_branch_ttl(Duration::ZERO);

    let fresh = reg.list_branches().await;
    assert_eq!(fresh.len(), 1);

    let stale = reg.list_branches().await;
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].name, "feature-x");
    assert_eq!(reg.fetcher_ref().list_calls(), 2);
}

#[tokio::test]
async fn listing_filters_to_branch_tagged_builds_only() {
    let fetcher = StubFetcher::new(
        None,
        Ok(vec![
            release("v2.0.0"),
            release("0.0.0-dev.20240115.abc1234"),
            release("branch-feature-x.20240115.abc1234"),
        ]),
    );
    let reg = registry(fetcher);

    let builds = reg.list_branches().await;
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].name, "feature-x");
}
