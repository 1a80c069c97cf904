//! Account objects: held positions and on-chain account info.

use serde::{Deserialize, Serialize};

/// A position the user holds in an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub event_title: String,
    pub bet_title: String,
    /// TON amount staked, formatted by the server.
    pub collateral_staked: String,
    pub size: String,
}

/// Response body of `get-assets`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetsResponse {
    #[serde(default)]
    pub asset_list: Vec<Position>,
    /// Sum of all staked collateral, formatted by the server.
    #[serde(default)]
    pub total_in_market: String,
}

/// The different renderings of a TON address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AccountAddress {
    pub raw: String,
    pub bounceable: String,
    pub non_bounceable: String,
}

/// Response body of `get-address`: live state of the linked wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub address: AccountAddress,
    /// Balance in nanotons.
    pub balance: i64,
    pub status: String,
}
