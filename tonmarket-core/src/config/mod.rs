//! Runtime configuration types for the engine.
//!
//! These are the validated values the components are built from. Loading and
//! parsing a configuration file is handled by the client binary.

use std::time::Duration;

use tonmarket_sdk::objects::catalog::TagId;

/// Feed paginator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    /// Tag loaded on startup.
    pub default_tag: TagId,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_tag: TagId::ALL,
        }
    }
}

/// Proof workflow settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkflowConfig {
    /// How long a submitted deposit may wait for a verdict. `None` waits
    /// indefinitely.
    pub submission_timeout: Option<Duration>,
}

/// Complete engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    pub feed: FeedConfig,
    pub workflow: WorkflowConfig,
}
