//! TOML file configuration structures.
//!
//! These structs directly map to the `tonmarket.toml` file format.

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Market server endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Root of the pull API, e.g. `https://market.example.com/ton-market/`.
    pub api_url: Url,
    /// WebSocket push channel. Without it, no live updates are received.
    #[serde(default)]
    pub push_url: Option<Url>,
    /// Bearer token from an earlier proof check.
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Delay before reconnecting a dropped push channel.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

/// Feed section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Tag loaded on startup (0 Politics .. 5 All).
    #[serde(default = "default_tag")]
    pub default_tag: i32,
}

fn default_tag() -> i32 {
    5
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_tag: default_tag(),
        }
    }
}

/// Workflow section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Expire submitted deposits after this many seconds without a verdict.
    #[serde(default)]
    pub submission_timeout_secs: Option<u64>,
}

/// Where the account balance is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceSourceKind {
    #[default]
    Server,
    Disabled,
}

/// Account section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Wallet address to project; the balance stays unknown without one.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub balance_source: BalanceSourceKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
}
