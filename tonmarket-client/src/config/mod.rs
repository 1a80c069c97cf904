//! Configuration module for tonmarket-client.
//!
//! Handles loading configuration from the TOML file, applying CLI overrides,
//! and converting it into the engine's runtime types.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tonmarket_core::config::{EngineConfig, FeedConfig, WorkflowConfig};
use tonmarket_sdk::objects::catalog::TagId;
use url::Url;

use crate::config::file::{BalanceSourceKind, FileConfig, LogFormat};

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Server endpoints and credentials.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_url: Url,
    pub push_url: Option<Url>,
    pub bearer_token: Option<String>,
    pub reconnect_delay: Duration,
}

/// Account settings.
#[derive(Debug, Clone)]
pub struct AccountSettings {
    pub address: Option<String>,
    pub balance_source: BalanceSourceKind,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub endpoints: Endpoints,
    pub engine: EngineConfig,
    pub account: AccountSettings,
    pub log_format: LogFormat,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    tag_override: Option<TagId>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, tag_override: Option<TagId>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            tag_override,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Read, validate and convert the configuration file, applying the CLI
    /// tag override.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        parse(&config_content, self.tag_override)
    }

    /// Reload the configuration (used on SIGHUP).
    ///
    /// The CLI tag override only applies to the initial load, so a reload
    /// picks up the file's `default_tag`.
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        parse(&config_content, None)
    }
}

fn parse(content: &str, tag_override: Option<TagId>) -> Result<LoadedConfig, ConfigError> {
    let mut file_config: FileConfig = toml::from_str(content)?;

    if let Some(tag) = tag_override {
        file_config.feed.default_tag = tag.0;
    }

    validate(&file_config)?;
    Ok(build_loaded_config(file_config))
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let api = &config.server.api_url;
    if !matches!(api.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError(format!(
            "api_url must be http(s), got {api}"
        )));
    }
    if let Some(push) = &config.server.push_url {
        if !matches!(push.scheme(), "ws" | "wss") {
            return Err(ConfigError::ValidationError(format!(
                "push_url must be ws(s), got {push}"
            )));
        }
    }
    let tag = config.feed.default_tag;
    if !(TagId::POLITICS.0..=TagId::ALL.0).contains(&tag) {
        return Err(ConfigError::ValidationError(format!(
            "unknown tag {tag}"
        )));
    }
    if config.workflow.submission_timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "submission_timeout_secs must be positive".to_string(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        endpoints: Endpoints {
            api_url: file_config.server.api_url,
            push_url: file_config.server.push_url,
            bearer_token: file_config.server.bearer_token,
            reconnect_delay: Duration::from_secs(file_config.server.reconnect_delay_secs),
        },
        engine: EngineConfig {
            feed: FeedConfig {
                default_tag: TagId(file_config.feed.default_tag),
            },
            workflow: WorkflowConfig {
                submission_timeout: file_config
                    .workflow
                    .submission_timeout_secs
                    .map(Duration::from_secs),
            },
        },
        account: AccountSettings {
            address: file_config.account.address,
            balance_source: file_config.account.balance_source,
        },
        log_format: file_config.log.format,
    }
}
