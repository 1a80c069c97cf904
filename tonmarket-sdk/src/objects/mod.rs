//! Wire objects shared by the TON Market HTTP API and the push channel.

pub mod account;
pub mod catalog;
pub mod payment;
pub mod push;

/// Opaque settlement token of a wager (e.g. `TokenA` / `TokenB`).
pub type SettlementToken = compact_str::CompactString;
