//! Entity store: the canonical, deduplicated collection of events.
//!
//! Both the feed paginator and the push ingestor write through
//! [`EntityStore::upsert`], so an event looks the same whether it was fetched
//! or pushed. Entries keep the position of their first arrival; updates
//! replace in place.

mod shared;

pub use shared::{CatalogState, CatalogWatcher, FeedStatus, SharedCatalog};

use std::collections::HashMap;

use tonmarket_sdk::objects::catalog::{Event, EventPatch};

use crate::error::MergeConflictError;

/// Where an upserted payload ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    /// A new entry was appended at this position.
    Inserted(usize),
    /// The existing entry at this position was replaced in place.
    Updated(usize),
}

impl Upserted {
    pub fn position(self) -> usize {
        match self {
            Upserted::Inserted(pos) | Upserted::Updated(pos) => pos,
        }
    }
}

/// Insertion-ordered map from event identifier to [`Event`].
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entries: Vec<Event>,
    index: HashMap<String, usize>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an unseen event at the end, or replace a known one in place.
    ///
    /// Fails without touching the store when the payload carries no
    /// identifier.
    pub fn upsert(&mut self, payload: impl Into<EventPatch>) -> Result<Upserted, MergeConflictError> {
        let mut patch = payload.into();
        let id = patch
            .id
            .take()
            .filter(|id| !id.is_empty())
            .ok_or(MergeConflictError::MissingId)?;

        if let Some(&pos) = self.index.get(&id) {
            if let Some(existing) = self.entries.get_mut(pos) {
                merge_into(existing, patch);
                return Ok(Upserted::Updated(pos));
            }
        }

        let pos = self.entries.len();
        self.entries.push(materialize(id.clone(), patch));
        self.index.insert(id, pos);
        Ok(Upserted::Inserted(pos))
    }

    pub fn get(&self, id: &str) -> Option<&Event> {
        self.index.get(id).and_then(|&pos| self.entries.get(pos))
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Iterate over all events in store order.
    ///
    /// The iterator is `Clone`, so a consumer can restart it cheaply.
    pub fn list(&self) -> std::slice::Iter<'_, Event> {
        self.entries.iter()
    }

    /// Events sorted by descending collateral.
    ///
    /// Recomputed on every call; the backing order is left untouched. Events
    /// with equal collateral keep their store order.
    pub fn ranked(&self) -> Vec<&Event> {
        let mut ranked: Vec<&Event> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.collateral.cmp(&a.collateral));
        ranked
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

/// Replace every field the patch carries. A carried wager list replaces the
/// whole sequence.
fn merge_into(target: &mut Event, patch: EventPatch) {
    let EventPatch {
        id: _,
        tag,
        collateral,
        logo_link,
        title,
        bets,
    } = patch;

    if let Some(tag) = tag {
        target.tag = tag;
    }
    if let Some(collateral) = collateral {
        target.collateral = collateral;
    }
    if let Some(logo_link) = logo_link {
        target.logo_link = logo_link;
    }
    if let Some(title) = title {
        target.title = title;
    }
    if let Some(bets) = bets {
        target.bets = bets;
    }
}

/// Build a new entry from a possibly partial payload; absent fields start
/// empty.
fn materialize(id: String, patch: EventPatch) -> Event {
    let mut event = Event {
        id,
        tag: Default::default(),
        collateral: Default::default(),
        logo_link: String::new(),
        title: String::new(),
        bets: Vec::new(),
    };
    merge_into(&mut event, patch);
    event
}
