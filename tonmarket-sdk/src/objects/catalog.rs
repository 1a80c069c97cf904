//! Catalog objects: tags, events and their wagers.
//!
//! Field names follow the server's camelCase JSON. The event snapshot sends
//! collateral and wager percentages as JSON numbers (`float64` and `int`).
//! Amounts are kept as [`rust_decimal::Decimal`], which also accepts the
//! quoted decimal form.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::SettlementToken;

/// Category filter identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub i32);

impl TagId {
    pub const POLITICS: TagId = TagId(0);
    pub const ECONOMICS: TagId = TagId(1);
    pub const CRYPTO: TagId = TagId(2);
    pub const CULTURE: TagId = TagId(3);
    pub const OTHER: TagId = TagId(4);
    /// Matches every category. This is the filter a fresh client starts with.
    pub const ALL: TagId = TagId(5);
}

impl Default for TagId {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::fmt::Display for TagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable reference data used as a filter key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub title: String,
}

/// A single outcome of an [`Event`] that users can stake collateral on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wager {
    #[serde(default)]
    pub collateral: Decimal,
    pub title: String,
    /// Share of the event's collateral staked on this wager, e.g. `42`.
    #[serde(default)]
    pub percentage: Decimal,
    pub token: SettlementToken,
    #[serde(default)]
    pub logo_link: String,
}

/// A market event with its wagers, as returned by `get-events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub tag: TagId,
    pub collateral: Decimal,
    #[serde(default)]
    pub logo_link: String,
    pub title: String,
    #[serde(default)]
    pub bets: Vec<Wager>,
}

/// A partial event payload, as delivered by the push channel.
///
/// Every field except the identifier is optional; absent fields leave the
/// stored value untouched. A carried `bets` list replaces the whole wager
/// sequence of the stored event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<TagId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collateral: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bets: Option<Vec<Wager>>,
}

impl From<Event> for EventPatch {
    fn from(event: Event) -> Self {
        Self {
            id: Some(event.id),
            tag: Some(event.tag),
            collateral: Some(event.collateral),
            logo_link: Some(event.logo_link),
            title: Some(event.title),
            bets: Some(event.bets),
        }
    }
}

/// Response body of `get-events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPage {
    pub items: Vec<Event>,
    /// Total number of pages for the requested tag.
    pub pages: u32,
}
