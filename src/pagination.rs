//! Listing pagination
//!
//! A [`PaginationController`] owns the posts shown on one listing page view and
//! the CMS cursor for the page after them. `load_more` is single-flight: while
//! a fetch is running, further calls return [`LoadOutcome::InFlight`] without
//! touching the network.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::cms::{self, ContentSource};
use crate::content::{normalize_summary, PostSummary};
use crate::error::Result;

/// Default time allowed for one `load_more` fetch
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the controller is in its fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    /// A cursor is available and nothing is in flight
    Idle,
    /// A fetch is in flight
    Loading,
    /// The CMS reported no further page
    Exhausted,
}

/// Result of a `load_more` call that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and this many posts appended
    Loaded { appended: usize },
    /// Another call is already fetching; nothing was done
    InFlight,
    /// No cursor; nothing was done
    Exhausted,
}

#[derive(Debug)]
struct Listing {
    posts: Vec<PostSummary>,
    cursor: Option<String>,
    state: PagerState,
    last_error: Option<String>,
}

/// Ordered posts plus the cursor for the next page
pub struct PaginationController {
    source: Arc<dyn ContentSource>,
    listing: Mutex<Listing>,
    timeout: Duration,
}

impl PaginationController {
    /// Seed the controller with the first page fetched for the view
    pub fn new(
        source: Arc<dyn ContentSource>,
        posts: Vec<PostSummary>,
        cursor: Option<String>,
    ) -> Self {
        let cursor = live_cursor(cursor);
        let state = if cursor.is_some() {
            PagerState::Idle
        } else {
            PagerState::Exhausted
        };
        Self {
            source,
            listing: Mutex::new(Listing {
                posts,
                cursor,
                state,
                last_error: None,
            }),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Limit how long a single `load_more` fetch may take
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Listing> {
        // Updates never leave the listing half-written
        self.listing.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch the page at the cursor and append it
    ///
    /// On failure the posts and cursor are left untouched, the error is kept
    /// for display and the controller is ready for another attempt.
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        let cursor = {
            let mut listing = self.lock();
            match listing.state {
                PagerState::Exhausted => return Ok(LoadOutcome::Exhausted),
                PagerState::Loading => return Ok(LoadOutcome::InFlight),
                PagerState::Idle => {}
            }
            let Some(cursor) = listing.cursor.clone() else {
                listing.state = PagerState::Exhausted;
                return Ok(LoadOutcome::Exhausted);
            };
            listing.state = PagerState::Loading;
            cursor
        };

        let target = cms::describe_url(&cursor);
        let guard = LoadingGuard { controller: self };
        let result = self.fetch(&cursor).await;
        guard.disarm();

        let mut listing = self.lock();
        match result {
            Ok((posts, next_page)) => {
                let next_page = live_cursor(next_page);
                let appended = posts.len();
                listing.posts.extend(posts);
                listing.state = if next_page.is_some() {
                    PagerState::Idle
                } else {
                    PagerState::Exhausted
                };
                listing.cursor = next_page;
                listing.last_error = None;
                tracing::debug!(
                    "Loaded {} posts from {} ({} total, more: {})",
                    appended,
                    target,
                    listing.posts.len(),
                    listing.cursor.is_some()
                );
                Ok(LoadOutcome::Loaded { appended })
            }
            Err(e) => {
                tracing::warn!("Failed to load more posts from {}: {}", target, e);
                listing.state = PagerState::Idle;
                listing.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch and normalize one page; nothing is applied unless every record maps
    async fn fetch(&self, cursor: &str) -> Result<(Vec<PostSummary>, Option<String>)> {
        let response = cms::with_timeout(
            self.timeout,
            &cms::describe_url(cursor),
            self.source.fetch_page(cursor),
        )
        .await?;

        let posts = response
            .results
            .iter()
            .map(normalize_summary)
            .collect::<Result<Vec<_>>>()?;
        Ok((posts, response.next_page))
    }

    /// Snapshot of the posts, in insertion order
    pub fn posts(&self) -> Vec<PostSummary> {
        self.lock().posts.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().posts.is_empty()
    }

    /// The cursor exactly as the CMS sent it
    pub fn cursor(&self) -> Option<String> {
        self.lock().cursor.clone()
    }

    pub fn state(&self) -> PagerState {
        self.lock().state
    }

    /// Whether the "load more" trigger should be offered
    pub fn has_more(&self) -> bool {
        self.lock().state != PagerState::Exhausted
    }

    /// Message of the most recent failed `load_more`, cleared by a success
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }
}

/// An empty cursor means there is no next page
fn live_cursor(cursor: Option<String>) -> Option<String> {
    cursor.filter(|c| !c.trim().is_empty())
}

/// Returns the controller to `Idle` if a `load_more` future is dropped mid-fetch
struct LoadingGuard<'a> {
    controller: &'a PaginationController,
}

impl LoadingGuard<'_> {
    fn disarm(self) {
        std::mem::forget(self);
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut listing = self.controller.lock();
        if listing.state == PagerState::Loading {
            listing.state = PagerState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::fake::{page, record, FakeSource};
    use crate::cms::{QueryResponse, RawRecord};
    use crate::error::{ContentFetchError, Error};
    use std::collections::HashSet;

    fn seeded(source: &Arc<FakeSource>, cursor: Option<&str>) -> PaginationController {
        let seed = normalize_summary(&record("seed")).unwrap();
        PaginationController::new(source.clone(), vec![seed], cursor.map(str::to_string))
    }

    fn uids(controller: &PaginationController) -> Vec<String> {
        controller
            .posts()
            .into_iter()
            .map(|p| p.uid.unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn test_load_more_appends_and_exhausts() {
        let source = Arc::new(FakeSource::new());
        source.push_page("page2url", Ok(page(&["postB"], None)));
        let controller = seeded(&source, Some("page2url"));

        let outcome = controller.load_more().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { appended: 1 });
        assert_eq!(uids(&controller), vec!["seed", "postB"]);
        assert_eq!(controller.cursor(), None);
        assert_eq!(controller.state(), PagerState::Exhausted);
        assert!(!controller.has_more());

        assert_eq!(controller.load_more().await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(uids(&controller), vec!["seed", "postB"]);
    }

    #[tokio::test]
    async fn test_no_cursor_is_a_no_op() {
        let source = Arc::new(FakeSource::new());
        let controller = seeded(&source, None);

        assert_eq!(controller.load_more().await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(controller.len(), 1);
        assert_eq!(controller.cursor(), None);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_seed_cursor_is_exhausted() {
        let source = Arc::new(FakeSource::new());
        let controller = seeded(&source, Some(""));

        assert_eq!(controller.state(), PagerState::Exhausted);
        assert!(!controller.has_more());
        assert_eq!(controller.cursor(), None);
        assert_eq!(controller.load_more().await.unwrap(), LoadOutcome::Exhausted);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_next_page_exhausts() {
        let source = Arc::new(FakeSource::new());
        source.push_page("p2", Ok(page(&["b"], Some(""))));
        let controller = seeded(&source, Some("p2"));

        controller.load_more().await.unwrap();
        assert_eq!(controller.state(), PagerState::Exhausted);
        assert!(!controller.has_more());
        assert_eq!(controller.cursor(), None);
        assert_eq!(controller.load_more().await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_many_pages_accumulate_in_order() {
        let source = Arc::new(FakeSource::new());
        source.push_page("p2", Ok(page(&["b", "c"], Some("p3"))));
        source.push_page("p3", Ok(page(&["d"], Some("p4"))));
        source.push_page("p4", Ok(page(&["e", "f", "g"], None)));
        let controller = seeded(&source, Some("p2"));

        let mut loads = 0;
        while controller.has_more() {
            controller.load_more().await.unwrap();
            loads += 1;
        }

        assert_eq!(loads, 3);
        assert_eq!(controller.len(), 1 + 2 + 1 + 3);
        let all = uids(&controller);
        assert_eq!(all, vec!["seed", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(all.iter().collect::<HashSet<_>>().len(), all.len());
    }

    #[tokio::test]
    async fn test_cursor_is_used_verbatim() {
        let cursor = "https://blog.cdn.prismic.io/api/v2/documents/search?ref=YFTl&q=%5B%5Bat(document.type%2C+%22posts%22)%5D%5D&page=2&pageSize=1";
        let source = Arc::new(FakeSource::new());
        source.push_page(cursor, Ok(page(&["b"], Some("opaque next"))));
        let controller = seeded(&source, Some(cursor));

        controller.load_more().await.unwrap();
        assert_eq!(source.calls(), vec![format!("fetch_page {}", cursor)]);
        assert_eq!(controller.cursor().as_deref(), Some("opaque next"));
    }

    #[tokio::test]
    async fn test_failure_leaves_state_untouched() {
        let source = Arc::new(FakeSource::new());
        source.push_page(
            "p2",
            Err(ContentFetchError::Status {
                url: "p2".to_string(),
                status: 503,
            }
            .into()),
        );
        source.push_page("p2", Ok(page(&["b"], None)));
        let controller = seeded(&source, Some("p2"));

        let err = controller.load_more().await.unwrap_err();
        assert!(err.is_fetch());
        assert_eq!(uids(&controller), vec!["seed"]);
        assert_eq!(controller.cursor().as_deref(), Some("p2"));
        assert_eq!(controller.state(), PagerState::Idle);
        assert!(controller.has_more());
        assert!(controller.last_error().unwrap().contains("503"));

        // the trigger stays usable
        controller.load_more().await.unwrap();
        assert_eq!(uids(&controller), vec!["seed", "b"]);
        assert!(controller.last_error().is_none());
    }

    #[tokio::test]
    async fn test_malformed_page_is_all_or_nothing() {
        let source = Arc::new(FakeSource::new());
        let broken = RawRecord {
            uid: Some("broken".to_string()),
            ..Default::default()
        };
        source.push_page(
            "p2",
            Ok(QueryResponse {
                results: vec![record("fine"), broken],
                next_page: Some("p3".to_string()),
                ..Default::default()
            }),
        );
        let controller = seeded(&source, Some("p2"));

        let err = controller.load_more().await.unwrap_err();
        assert!(matches!(err, Error::MalformedContent(_)));
        assert_eq!(controller.len(), 1);
        assert_eq!(controller.cursor().as_deref(), Some("p2"));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let source = Arc::new(FakeSource::with_delay(Duration::from_secs(5)));
        source.push_page("p2", Ok(page(&["b"], None)));
        let controller = seeded(&source, Some("p2")).with_timeout(Duration::from_millis(20));

        let err = controller.load_more().await.unwrap_err();
        assert!(matches!(
            err,
            Error::ContentFetch(ContentFetchError::Timeout { .. })
        ));
        assert_eq!(controller.state(), PagerState::Idle);
        assert_eq!(controller.len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_calls_are_single_flight() {
        let source = Arc::new(FakeSource::with_delay(Duration::from_millis(50)));
        source.push_page("p2", Ok(page(&["b"], Some("p3"))));
        source.push_page("p2", Ok(page(&["b-again"], Some("p3"))));
        let controller = seeded(&source, Some("p2"));

        let (first, second) = tokio::join!(controller.load_more(), controller.load_more());
        assert_eq!(first.unwrap(), LoadOutcome::Loaded { appended: 1 });
        assert_eq!(second.unwrap(), LoadOutcome::InFlight);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(uids(&controller), vec!["seed", "b"]);
    }

    #[tokio::test]
    async fn test_dropped_load_returns_to_idle() {
        let source = Arc::new(FakeSource::with_delay(Duration::from_secs(5)));
        let controller = seeded(&source, Some("p2"));

        let pending = controller.load_more();
        let _ = tokio::time::timeout(Duration::from_millis(20), pending).await;

        assert_eq!(controller.state(), PagerState::Idle);
        assert_eq!(controller.cursor().as_deref(), Some("p2"));
    }
}
