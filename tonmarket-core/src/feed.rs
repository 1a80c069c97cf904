//! Feed paginator: forward-only paged retrieval filtered by tag.
//!
//! Every retrieved event goes through [`SharedCatalog::upsert`], the same
//! entry point the push ingestor uses. Failures never escape as errors; they
//! show up as the `failed` flag of [`FeedStatus`](crate::store::FeedStatus).

use std::sync::Arc;

use tonmarket_sdk::objects::catalog::{Tag, TagId};
use tracing::{debug, info, warn};

use crate::error::{TransportError, ValidationError};
use crate::store::SharedCatalog;
use crate::transport::PullApi;

/// Result of a single [`FeedPaginator::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page was applied to the store.
    Loaded {
        page: u32,
        tag: TagId,
        received: usize,
        pages: u32,
    },
    /// The retrieval failed; the `failed` flag is set.
    Failed {
        page: u32,
        tag: TagId,
        error: TransportError,
    },
    /// Another retrieval was in flight; nothing was requested.
    Busy,
    /// The request was malformed; nothing was requested.
    Invalid(ValidationError),
}

type LoadCallback = Arc<dyn Fn(&LoadOutcome) + Send + Sync>;

/// Drives paged retrieval into a [`SharedCatalog`].
pub struct FeedPaginator<P: ?Sized> {
    api: Arc<P>,
    catalog: SharedCatalog,
    on_loaded: Option<LoadCallback>,
}

impl<P: PullApi + ?Sized> FeedPaginator<P> {
    pub fn new(api: Arc<P>, catalog: SharedCatalog) -> Self {
        Self {
            api,
            catalog,
            on_loaded: None,
        }
    }

    /// Register a callback fired after every completed retrieval, successful
    /// or not.
    pub fn with_on_loaded(mut self, callback: impl Fn(&LoadOutcome) + Send + Sync + 'static) -> Self {
        self.on_loaded = Some(Arc::new(callback));
        self
    }

    pub fn catalog(&self) -> &SharedCatalog {
        &self.catalog
    }

    /// Fetch the tag list into the catalog.
    pub async fn load_tags(&self) -> Result<Vec<Tag>, TransportError> {
        let tags = self.api.list_tags().await?;
        debug!(count = tags.len(), "Loaded tags");
        self.catalog.update(|state| state.tags = tags.clone());
        Ok(tags)
    }

    /// Retrieve one page for `tag`.
    ///
    /// With `reset`, previously accumulated events are dropped first (used
    /// when the tag filter changes). Rejected with [`LoadOutcome::Busy`] while
    /// another retrieval is in flight.
    pub async fn load(&self, page: u32, tag: TagId, reset: bool) -> LoadOutcome {
        if page == 0 {
            return LoadOutcome::Invalid(ValidationError::ZeroPage);
        }

        let started = self.catalog.update(|state| {
            if state.feed.loading {
                return false;
            }
            state.feed.loading = true;
            state.feed.failed = false;
            state.feed.page = page;
            state.feed.tag = tag;
            if reset {
                state.events.clear();
                state.current = None;
            }
            true
        });
        if !started {
            debug!(page, tag = %tag, "Retrieval already in flight, ignoring load");
            return LoadOutcome::Busy;
        }

        let outcome = {
            let _loading = LoadingGuard {
                catalog: &self.catalog,
            };
            self.fetch_and_apply(page, tag).await
        };

        if let Some(callback) = &self.on_loaded {
            callback(&outcome);
        }
        outcome
    }

    async fn fetch_and_apply(&self, page: u32, tag: TagId) -> LoadOutcome {
        match self.api.list_events(page, tag).await {
            Ok(result) => {
                let received = result.items.len();
                for item in result.items {
                    if let Err(e) = self.catalog.upsert(item) {
                        warn!(page, tag = %tag, error = %e, "Dropping event from page");
                    }
                }
                self.catalog.update(|state| state.feed.pages = result.pages);
                info!(page, tag = %tag, received, pages = result.pages, "Loaded events page");
                LoadOutcome::Loaded {
                    page,
                    tag,
                    received,
                    pages: result.pages,
                }
            }
            Err(error) => {
                self.catalog.update(|state| state.feed.failed = true);
                warn!(page, tag = %tag, error = %error, "Failed to load events page");
                LoadOutcome::Failed { page, tag, error }
            }
        }
    }

    /// Load the next page of the current tag.
    ///
    /// Returns `None` without requesting anything while a retrieval is in
    /// flight or once the last known page has been reached.
    pub async fn next_page(&self) -> Option<LoadOutcome> {
        let feed = self.catalog.feed();
        if feed.loading || feed.page >= feed.pages {
            return None;
        }
        Some(self.load(feed.page + 1, feed.tag, false).await)
    }

    /// Switch the tag filter and load its first page from scratch.
    pub async fn change_tag(&self, tag: TagId) -> LoadOutcome {
        self.load(1, tag, true).await
    }
}

/// Clears the `loading` flag when dropped, including when the load future is
/// cancelled mid-retrieval.
struct LoadingGuard<'a> {
    catalog: &'a SharedCatalog,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.catalog.update(|state| state.feed.loading = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{push_frame_channel, refresh_request_channel};
    use crate::processors::PushIngestor;
    use crate::test_support::{Call, MockApi, event, refused};
    use crate::workflow::DepositCorrelator;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::watch;

    const TAG: TagId = TagId(5);

    fn ids(catalog: &SharedCatalog) -> Vec<String> {
        catalog.snapshot().into_iter().map(|e| e.id).collect()
    }

    #[tokio::test]
    async fn test_first_page_then_next_page_appends() {
        let api = MockApi::new();
        api.set_page(1, TAG, vec![event("A", 1), event("B", 2)], 3);
        api.set_page(2, TAG, vec![event("C", 9), event("A", 4)], 3);
        let feed = FeedPaginator::new(api.clone(), SharedCatalog::new());

        let outcome = feed.load(1, TAG, true).await;
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                page: 1,
                tag: TAG,
                received: 2,
                pages: 3
            }
        );
        assert_eq!(ids(feed.catalog()), ["A", "B"]);
        assert_eq!(feed.catalog().feed().pages, 3);

        feed.next_page().await.unwrap();
        assert_eq!(
            api.calls().last(),
            Some(&Call::ListEvents { page: 2, tag: TAG })
        );
        assert_eq!(ids(feed.catalog()), ["A", "B", "C"]);
        assert_eq!(
            feed.catalog().get("A").unwrap().collateral,
            rust_decimal::Decimal::from(4)
        );
    }

    #[tokio::test]
    async fn test_next_page_stops_at_last_page() {
        let api = MockApi::new();
        api.set_page(1, TAG, vec![event("A", 1)], 1);
        let feed = FeedPaginator::new(api.clone(), SharedCatalog::new());

        feed.load(1, TAG, true).await;
        assert!(feed.next_page().await.is_none());
        assert_eq!(api.count(|c| matches!(c, Call::ListEvents { .. })), 1);
    }

    #[tokio::test]
    async fn test_next_page_is_noop_while_loading() {
        let api = MockApi::new();
        api.set_page(1, TAG, vec![event("A", 1)], 5);
        let gate = api.hold_pages();
        let feed = Arc::new(FeedPaginator::new(api.clone(), SharedCatalog::new()));

        let in_flight = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.load(1, TAG, true).await })
        };
        while !feed.catalog().feed().loading {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert!(feed.next_page().await.is_none());
        assert_eq!(feed.load(2, TAG, false).await, LoadOutcome::Busy);

        gate.notify_one();
        in_flight.await.unwrap();
        assert_eq!(api.count(|c| matches!(c, Call::ListEvents { .. })), 1);
        assert!(!feed.catalog().feed().loading);
    }

    #[tokio::test]
    async fn test_pushes_apply_while_page_is_suspended() {
        let api = MockApi::new();
        api.set_page(1, TAG, vec![event("A", 1), event("B", 2)], 1);
        let gate = api.hold_pages();
        let catalog = SharedCatalog::new();
        let feed = Arc::new(FeedPaginator::new(api, catalog.clone()));

        let (refresh_tx, _refresh_rx) = refresh_request_channel();
        let (frame_tx, frame_rx) = push_frame_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ingestor = tokio::spawn(
            PushIngestor::new(catalog.clone(), DepositCorrelator::new(refresh_tx))
                .run(shutdown_rx, frame_rx),
        );

        let in_flight = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.load(1, TAG, true).await })
        };
        while !catalog.feed().loading {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        frame_tx
            .send(r#"{"id":"B","collateral":7,"title":"pushed B"}"#.to_string())
            .await
            .unwrap();
        frame_tx
            .send(r#"{"id":"N","collateral":3,"title":"pushed N"}"#.to_string())
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while catalog.get("N").is_none() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();

        assert!(catalog.feed().loading);
        assert_eq!(ids(&catalog), ["B", "N"]);
        assert_eq!(catalog.get("B").unwrap().collateral, Decimal::from(7));

        gate.notify_one();
        assert!(matches!(
            in_flight.await.unwrap(),
            LoadOutcome::Loaded { received: 2, .. }
        ));
        assert_eq!(ids(&catalog), ["B", "N", "A"]);
        let b = catalog.get("B").unwrap();
        assert_eq!(b.collateral, Decimal::from(2));
        assert_eq!(b.title, "event B");
        assert_eq!(catalog.get("N").unwrap().title, "pushed N");

        shutdown_tx.send(true).unwrap();
        ingestor.await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_sets_flag_and_clears_loading() {
        let api = MockApi::new();
        api.fail_page(1, TAG, refused(500));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let feed = FeedPaginator::new(api, SharedCatalog::new()).with_on_loaded(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let outcome = feed.load(1, TAG, false).await;
        assert!(matches!(outcome, LoadOutcome::Failed { page: 1, .. }));
        let status = feed.catalog().feed();
        assert!(status.failed);
        assert!(!status.loading);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_load_does_not_leave_loading_set() {
        let api = MockApi::new();
        let _gate = api.hold_pages();
        let feed = FeedPaginator::new(api, SharedCatalog::new());

        let result = tokio::time::timeout(Duration::from_millis(20), feed.load(1, TAG, false)).await;
        assert!(result.is_err());
        assert!(!feed.catalog().feed().loading);
    }

    #[tokio::test]
    async fn test_reset_drops_previous_tag() {
        let api = MockApi::new();
        api.set_page(1, TAG, vec![event("A", 1), event("B", 1)], 1);
        api.set_page(1, TagId::CRYPTO, vec![event("X", 1)], 2);
        let feed = FeedPaginator::new(api, SharedCatalog::new());

        feed.load(1, TAG, true).await;
        feed.catalog().select("A");
        feed.change_tag(TagId::CRYPTO).await;

        assert_eq!(ids(feed.catalog()), ["X"]);
        assert!(feed.catalog().current().is_none());
        let status = feed.catalog().feed();
        assert_eq!((status.page, status.pages, status.tag), (1, 2, TagId::CRYPTO));
    }

    #[tokio::test]
    async fn test_page_zero_is_invalid() {
        let api = MockApi::new();
        let feed = FeedPaginator::new(api.clone(), SharedCatalog::new());
        assert_eq!(
            feed.load(0, TAG, false).await,
            LoadOutcome::Invalid(ValidationError::ZeroPage)
        );
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_load_tags_stores_reference_data() {
        let api = MockApi::new();
        let feed = FeedPaginator::new(api, SharedCatalog::new());
        let tags = feed.load_tags().await.unwrap();
        assert_eq!(feed.catalog().tags(), tags);
    }
}
