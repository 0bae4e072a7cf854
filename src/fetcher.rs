//! Fetch-all orchestration: drive paginated search until every match is collected.
//!
//! # Algorithm
//!
//! Starting at offset 0 with an empty [`ResultSet`], each iteration:
//!
//! 1. requests the page at the current offset
//! 2. appends its messages in arrival order
//! 3. stops once the collected count reaches the page's `total_results`
//! 4. otherwise advances the offset by the fixed page size and waits on the
//!    pacing policy
//!
//! The offset never depends on how many messages a page returned. The stop
//! condition trusts `total_results` to stay stable across requests; if it
//! drifts, results can be missed or over-collected. An optional page or time
//! bound ([`FetchLimits`]) guards against a server that never reports
//! completion.

use crate::config::FetchConfig;
use crate::error::{Error, PartialFetch};
use crate::pacing::{self, PacingPolicy};
use crate::search::SearchSource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Page size the search endpoint serves
pub const PAGE_SIZE: u64 = 25;

/// Ordered accumulation of message records across pages
///
/// Only grows: pages are appended, nothing is removed or reordered.
/// Serializes as a plain JSON array.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    messages: Vec<Value>,
}

impl ResultSet {
    /// Empty result set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one page of messages, keeping their order
    pub fn extend_page(&mut self, page: Vec<Value>) {
        self.messages.extend(page);
    }

    /// Number of collected messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been collected
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Collected messages in arrival order
    pub fn messages(&self) -> &[Value] {
        &self.messages
    }

    /// Consume the set, returning the messages
    pub fn into_messages(self) -> Vec<Value> {
        self.messages
    }
}

/// Optional bounds on one fetch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchLimits {
    /// Maximum number of search requests
    pub max_pages: Option<u32>,
    /// Maximum wall-clock time spent paginating
    pub max_duration: Option<Duration>,
}

impl FetchLimits {
    /// No bounds; pagination ends only when the server reports completion
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The error to stop with, if a bound has been reached
    fn exceeded(&self, pages: u32, elapsed: Duration) -> Option<Error> {
        let limit = match (self.max_pages, self.max_duration) {
            (Some(max), _) if pages >= max => format!("max_pages = {}", max),
            (_, Some(max)) if elapsed >= max => format!("max_duration = {:?}", max),
            _ => return None,
        };
        Some(Error::FetchLimit {
            pages,
            elapsed,
            limit,
        })
    }
}

impl From<&FetchConfig> for FetchLimits {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_duration: config.max_duration,
        }
    }
}

/// Drives a [`SearchSource`] until a query's results are exhausted
///
/// # Examples
///
/// ```no_run
/// use guild_search_dl::config::Config;
/// use guild_search_dl::fetcher::Fetcher;
/// use guild_search_dl::session::ApiClient;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let client = Arc::new(ApiClient::new(&config.identity, &config.api)?);
/// let fetcher = Fetcher::from_config(client, &config.fetch);
///
/// let results = fetcher.fetch_all("token", "880822868907282482", "fries").await?;
/// println!("collected {} messages", results.len());
/// # Ok(())
/// # }
/// ```
pub struct Fetcher {
    source: Arc<dyn SearchSource>,
    pacing: Box<dyn PacingPolicy>,
    page_size: u64,
    limits: FetchLimits,
}

impl Fetcher {
    /// Create a fetcher with the default page size and no bounds
    pub fn new(source: Arc<dyn SearchSource>, pacing: Box<dyn PacingPolicy>) -> Self {
        Self {
            source,
            pacing,
            page_size: PAGE_SIZE,
            limits: FetchLimits::unbounded(),
        }
    }

    /// Create a fetcher from the `fetch` section of the configuration
    pub fn from_config(source: Arc<dyn SearchSource>, config: &FetchConfig) -> Self {
        Self::new(source, pacing::from_config(&config.pacing))
            .page_size(config.page_size)
            .limits(FetchLimits::from(config))
    }

    /// Override the offset increment (values below 1 are treated as 1)
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set page and time bounds
    pub fn limits(mut self, limits: FetchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Collect every message matching `query` in `server_id`
    ///
    /// Requests run strictly one after another with the pacing policy applied
    /// between them.
    ///
    /// # Errors
    ///
    /// The first failing search ends the fetch. The returned [`PartialFetch`]
    /// holds the messages collected up to that point, the offset that failed
    /// and the cause. Tripping a [`FetchLimits`] bound is reported the same
    /// way with [`Error::FetchLimit`].
    pub async fn fetch_all(
        &self,
        token: &str,
        server_id: &str,
        query: &str,
    ) -> std::result::Result<ResultSet, PartialFetch> {
        let started = Instant::now();
        let mut collected = ResultSet::new();
        let mut offset = 0u64;
        let mut pages = 0u32;

        loop {
            let page = match self.source.search(token, server_id, query, offset).await {
                Ok(page) => page,
                Err(source) => {
                    return Err(PartialFetch {
                        collected,
                        offset,
                        source,
                    });
                }
            };
            pages += 1;

            let returned = page.messages.len();
            collected.extend_page(page.messages);
            let total = page.total_results;
            let have = collected.len() as u64;

            info!(
                offset,
                returned,
                collected = have,
                total_results = total,
                remaining_fetches = remaining_fetches(total, have, self.page_size),
                "Fetched search page"
            );

            if have >= total {
                break;
            }

            offset += self.page_size;

            if let Some(source) = self.limits.exceeded(pages, started.elapsed()) {
                return Err(PartialFetch {
                    collected,
                    offset,
                    source,
                });
            }

            debug!(next_offset = offset, "Pacing before next page");
            self.pacing.pace().await;
        }

        info!(
            pages,
            collected = collected.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search results exhausted"
        );
        Ok(collected)
    }
}

/// Pages still needed to reach `total`, rounding up
fn remaining_fetches(total: u64, collected: u64, page_size: u64) -> u64 {
    total.saturating_sub(collected).div_ceil(page_size.max(1))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::NoDelay;
    use crate::search::SearchPage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serves a fixed corpus in pages, recording every offset requested
    struct FakeSource {
        total: u64,
        page_size: u64,
        fail_at_offset: Option<u64>,
        offsets: Mutex<Vec<u64>>,
    }

    impl FakeSource {
        fn new(total: u64) -> Self {
            Self {
                total,
                page_size: PAGE_SIZE,
                fail_at_offset: None,
                offsets: Mutex::new(Vec::new()),
            }
        }

        fn failing_at(mut self, offset: u64) -> Self {
            self.fail_at_offset = Some(offset);
            self
        }

        fn serving(mut self, page_size: u64) -> Self {
            self.page_size = page_size;
            self
        }

        fn offsets(&self) -> Vec<u64> {
            self.offsets.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchSource for FakeSource {
        async fn search(
            &self,
            _token: &str,
            _server_id: &str,
            _query: &str,
            offset: u64,
        ) -> crate::Result<SearchPage> {
            self.offsets.lock().unwrap().push(offset);
            if self.fail_at_offset == Some(offset) {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset",
                )));
            }

            let end = (offset + self.page_size).min(self.total);
            let messages = (offset..end).map(|i| json!({"id": i.to_string()})).collect();
            Ok(SearchPage {
                total_results: self.total,
                messages,
            })
        }
    }

    /// Replays a fixed script of pages regardless of offset
    struct ScriptedSource {
        pages: Mutex<Vec<SearchPage>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl SearchSource for ScriptedSource {
        async fn search(&self, _: &str, _: &str, _: &str, _: u64) -> crate::Result<SearchPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut pages = self.pages.lock().unwrap();
            Ok(if pages.is_empty() {
                SearchPage::default()
            } else {
                pages.remove(0)
            })
        }
    }

    struct CountingPacer(Arc<AtomicU32>);

    #[async_trait]
    impl PacingPolicy for CountingPacer {
        async fn pace(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fetcher_for(source: Arc<dyn SearchSource>) -> Fetcher {
        Fetcher::new(source, Box::new(NoDelay))
    }

    fn page(total: u64, ids: &[&str]) -> SearchPage {
        SearchPage {
            total_results: total,
            messages: ids.iter().map(|id| json!({"id": id})).collect(),
        }
    }

    #[test]
    fn test_remaining_fetches() {
        assert_eq!(remaining_fetches(60, 25, 25), 2);
        assert_eq!(remaining_fetches(60, 50, 25), 1);
        assert_eq!(remaining_fetches(60, 60, 25), 0);
        assert_eq!(remaining_fetches(10, 25, 25), 0, "over-collection saturates");
        assert_eq!(remaining_fetches(51, 0, 25), 3);
    }

    #[tokio::test]
    async fn test_sixty_results_take_three_pages() {
        let source = Arc::new(FakeSource::new(60));
        let fetcher = fetcher_for(source.clone());

        let results = fetcher.fetch_all("t", "g", "fries").await.unwrap();

        assert_eq!(source.offsets(), vec![0, 25, 50]);
        assert_eq!(results.len(), 60);
        assert_eq!(results.messages()[0]["id"], "0");
        assert_eq!(results.messages()[59]["id"], "59");
    }

    #[tokio::test]
    async fn test_call_count_is_ceil_of_total_over_page_size() {
        for total in [1u64, 24, 25, 26, 49, 50, 51, 100, 101] {
            let source = Arc::new(FakeSource::new(total));
            let results = fetcher_for(source.clone())
                .fetch_all("t", "g", "q")
                .await
                .unwrap();

            let expected_calls = total.div_ceil(PAGE_SIZE) as usize;
            assert_eq!(source.offsets().len(), expected_calls, "total = {total}");
            assert_eq!(results.len() as u64, total, "total = {total}");

            let expected_offsets: Vec<u64> =
                (0..expected_calls as u64).map(|i| i * PAGE_SIZE).collect();
            assert_eq!(source.offsets(), expected_offsets, "total = {total}");
        }
    }

    #[tokio::test]
    async fn test_zero_results_makes_exactly_one_call() {
        let source = Arc::new(FakeSource::new(0));
        let results = fetcher_for(source.clone())
            .fetch_all("t", "g", "nothing")
            .await
            .unwrap();

        assert_eq!(source.offsets(), vec![0]);
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_error_on_second_page_returns_first_page() {
        let source = Arc::new(FakeSource::new(60).failing_at(25));
        let err = fetcher_for(source.clone())
            .fetch_all("t", "g", "fries")
            .await
            .unwrap_err();

        assert_eq!(err.collected.len(), 25);
        assert_eq!(err.offset, 25);
        assert!(matches!(err.source, Error::Io(_)));
        assert_eq!(source.offsets(), vec![0, 25], "no calls after the failure");
    }

    #[tokio::test]
    async fn test_offsets_ignore_short_pages() {
        // Server hands out only 10 per page, but offsets still advance by 25,
        // so results 10..25 and 35..40 are never requested
        let source = Arc::new(FakeSource::new(40).serving(10));
        let err = fetcher_for(source.clone())
            .limits(FetchLimits {
                max_pages: Some(4),
                max_duration: None,
            })
            .fetch_all("t", "g", "q")
            .await
            .unwrap_err();

        assert_eq!(source.offsets(), vec![0, 25, 50, 75]);
        assert_eq!(err.collected.len(), 20);
        assert!(matches!(err.source, Error::FetchLimit { .. }));
    }

    #[tokio::test]
    async fn test_empty_error_page_ends_pagination() {
        // A non-success response decodes as total 0 which counts as done
        let source = Arc::new(ScriptedSource {
            pages: Mutex::new(vec![page(50, &["a"; 25]), SearchPage::default()]),
            calls: AtomicU32::new(0),
        });
        let results = fetcher_for(source.clone())
            .fetch_all("t", "g", "q")
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(results.len(), 25);
    }

    #[tokio::test]
    async fn test_order_and_duplicates_are_preserved() {
        let source = Arc::new(ScriptedSource {
            pages: Mutex::new(vec![page(4, &["b", "a"]), page(4, &["a", "c"])]),
            calls: AtomicU32::new(0),
        });
        let results = fetcher_for(source).fetch_all("t", "g", "q").await.unwrap();

        let ids: Vec<&str> = results
            .messages()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["b", "a", "a", "c"]);
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 3, "no client-side deduplication");
    }

    #[tokio::test]
    async fn test_total_shrinking_mid_fetch_stops_early() {
        let source = Arc::new(ScriptedSource {
            pages: Mutex::new(vec![page(60, &["x"; 25]), page(30, &["y"; 25])]),
            calls: AtomicU32::new(0),
        });
        let results = fetcher_for(source.clone())
            .fetch_all("t", "g", "q")
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(results.len(), 50);
    }

    #[tokio::test]
    async fn test_pacing_runs_between_pages_only() {
        let paced = Arc::new(AtomicU32::new(0));
        let source = Arc::new(FakeSource::new(60));
        let fetcher = Fetcher::new(source, Box::new(CountingPacer(paced.clone())));

        fetcher.fetch_all("t", "g", "q").await.unwrap();
        assert_eq!(paced.load(Ordering::SeqCst), 2, "3 pages need 2 pauses");

        paced.store(0, Ordering::SeqCst);
        let single = Fetcher::new(
            Arc::new(FakeSource::new(3)),
            Box::new(CountingPacer(paced.clone())),
        );
        single.fetch_all("t", "g", "q").await.unwrap();
        assert_eq!(paced.load(Ordering::SeqCst), 0, "single page needs no pause");
    }

    #[tokio::test]
    async fn test_custom_page_size_drives_offsets() {
        let source = Arc::new(FakeSource::new(25).serving(10));
        let results = fetcher_for(source.clone())
            .page_size(10)
            .fetch_all("t", "g", "q")
            .await
            .unwrap();

        assert_eq!(source.offsets(), vec![0, 10, 20]);
        assert_eq!(results.len(), 25);
    }

    #[tokio::test]
    async fn test_max_pages_stops_runaway_pagination() {
        // Server claims more results than it ever returns
        let source = Arc::new(ScriptedSource {
            pages: Mutex::new((0..10).map(|_| page(1_000, &[])).collect()),
            calls: AtomicU32::new(0),
        });
        let err = fetcher_for(source.clone())
            .limits(FetchLimits {
                max_pages: Some(3),
                max_duration: None,
            })
            .fetch_all("t", "g", "q")
            .await
            .unwrap_err();

        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.offset, 75);
        match err.source {
            Error::FetchLimit { pages, limit, .. } => {
                assert_eq!(pages, 3);
                assert_eq!(limit, "max_pages = 3");
            }
            other => panic!("expected FetchLimit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_max_pages_does_not_cut_natural_completion() {
        let source = Arc::new(FakeSource::new(60));
        let results = fetcher_for(source.clone())
            .limits(FetchLimits {
                max_pages: Some(3),
                max_duration: None,
            })
            .fetch_all("t", "g", "q")
            .await
            .unwrap();

        assert_eq!(results.len(), 60);
        assert_eq!(source.offsets().len(), 3);
    }

    #[tokio::test]
    async fn test_max_duration_stops_pagination() {
        let source = Arc::new(FakeSource::new(10_000));
        let err = Fetcher::new(
            source.clone(),
            Box::new(crate::pacing::FixedDelay(Duration::from_millis(20))),
        )
        .limits(FetchLimits {
            max_pages: None,
            max_duration: Some(Duration::from_millis(50)),
        })
        .fetch_all("t", "g", "q")
        .await
        .unwrap_err();

        assert!(matches!(err.source, Error::FetchLimit { .. }));
        let calls = source.offsets().len();
        assert!(calls >= 2 && calls < 400, "unexpected call count {calls}");
        assert_eq!(err.collected.len(), calls * PAGE_SIZE as usize);
    }

    #[test]
    fn test_limits_from_config() {
        let config = FetchConfig {
            max_pages: Some(7),
            max_duration: Some(Duration::from_secs(60)),
            ..Default::default()
        };
        let limits = FetchLimits::from(&config);
        assert_eq!(limits.max_pages, Some(7));
        assert_eq!(limits.max_duration, Some(Duration::from_secs(60)));
        assert!(
            FetchLimits::unbounded()
                .exceeded(1_000, Duration::MAX)
                .is_none()
        );
    }

    #[test]
    fn test_result_set_serializes_as_array() {
        let mut set = ResultSet::new();
        set.extend_page(vec![json!({"id": "1"})]);
        set.extend_page(vec![json!({"id": "2"}), json!({"id": "3"})]);

        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!([{"id": "1"}, {"id": "2"}, {"id": "3"}])
        );
        assert_eq!(set.into_messages().len(), 3);
    }
}
