//! Shared catalog state with change notification.
//!
//! `SharedCatalog` wraps the entity store together with the feed status
//! flags behind one lock and keeps an incrementing version counter.
//! Subscribers receive a [`CatalogWatcher`] that can `await` the next change.
//!
//! The lock is a blocking `RwLock` that is never held across an `.await`, so
//! the paginator and the push ingestor can write back-to-back from any task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;
use tonmarket_sdk::objects::catalog::{Event, EventPatch, Tag, TagId};

use super::{EntityStore, Upserted};
use crate::error::MergeConflictError;

/// Pagination status visible to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedStatus {
    /// A retrieval is in flight.
    pub loading: bool,
    /// The last retrieval failed.
    pub failed: bool,
    /// Last requested page (0 before the first load).
    pub page: u32,
    /// Page count reported by the server.
    pub pages: u32,
    pub tag: TagId,
}

impl Default for FeedStatus {
    fn default() -> Self {
        Self {
            loading: false,
            failed: false,
            page: 0,
            pages: 1,
            tag: TagId::ALL,
        }
    }
}

/// Everything the catalog consumers read.
#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    pub events: EntityStore,
    pub feed: FeedStatus,
    pub tags: Vec<Tag>,
    /// Identifier of the event picked for the detail view.
    pub current: Option<String>,
}

/// A cloneable handle to the catalog state.
#[derive(Clone)]
pub struct SharedCatalog {
    inner: Arc<SharedCatalogInner>,
}

struct SharedCatalogInner {
    state: RwLock<CatalogState>,
    version: AtomicU64,
    version_tx: watch::Sender<u64>,
}

/// Receives notifications when the catalog changes.
pub struct CatalogWatcher {
    version_rx: watch::Receiver<u64>,
}

// -- SharedCatalog ------------------------------------------------------

impl SharedCatalog {
    pub fn new() -> Self {
        let (version_tx, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(SharedCatalogInner {
                state: RwLock::new(CatalogState::default()),
                version: AtomicU64::new(0),
                version_tx,
            }),
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        let new_version = self.inner.version.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.inner.version_tx.send(new_version);
    }

    /// Merge one payload into the store. Watchers are notified on success.
    pub fn upsert(&self, payload: impl Into<EventPatch>) -> Result<Upserted, MergeConflictError> {
        let outcome = self.write_guard().events.upsert(payload)?;
        self.notify();
        Ok(outcome)
    }

    /// Read the state under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&CatalogState) -> R) -> R {
        f(&self.read_guard())
    }

    /// Mutate the state under the lock and notify watchers.
    pub fn update<R>(&self, f: impl FnOnce(&mut CatalogState) -> R) -> R {
        let result = {
            let mut guard = self.write_guard();
            f(&mut guard)
        };
        self.notify();
        result
    }

    pub fn get(&self, id: &str) -> Option<Event> {
        self.read(|state| state.events.get(id).cloned())
    }

    /// All events in store order.
    pub fn snapshot(&self) -> Vec<Event> {
        self.read(|state| state.events.list().cloned().collect())
    }

    /// All events sorted by descending collateral.
    pub fn ranked(&self) -> Vec<Event> {
        self.read(|state| state.events.ranked().into_iter().cloned().collect())
    }

    pub fn feed(&self) -> FeedStatus {
        self.read(|state| state.feed)
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.read(|state| state.tags.clone())
    }

    /// Pick the event shown in the detail view. Unknown ids clear the
    /// selection.
    pub fn select(&self, id: &str) -> Option<Event> {
        self.update(|state| {
            let found = state.events.get(id).cloned();
            state.current = found.as_ref().map(|e| e.id.clone());
            found
        })
    }

    /// The currently selected event, with its latest merged content.
    pub fn current(&self) -> Option<Event> {
        self.read(|state| {
            state
                .current
                .as_deref()
                .and_then(|id| state.events.get(id))
                .cloned()
        })
    }

    /// Number of changes applied so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Relaxed)
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> CatalogWatcher {
        CatalogWatcher {
            version_rx: self.inner.version_tx.subscribe(),
        }
    }
}

impl Default for SharedCatalog {
    fn default() -> Self {
        Self::new()
    }
}

// -- CatalogWatcher -----------------------------------------------------

impl CatalogWatcher {
    /// Wait until the catalog is updated.
    ///
    /// Returns `Ok(())` when a new version is available, or `Err` if every
    /// [`SharedCatalog`] handle has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.version_rx.changed().await
    }
}
