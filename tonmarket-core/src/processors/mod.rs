//! Event processors for the engine.
//!
//! - `PushIngestor`: Receives `PushFrame`, upserts events and resolves deposits
//! - `ProjectionRefresher`: Receives `RefreshRequest`, re-derives the account
//! - `DepositReaper`: Expires submitted deposits on a timer

pub mod deposit_reaper;
pub mod projection_refresher;
pub mod push_ingestor;

pub use deposit_reaper::DepositReaper;
pub use projection_refresher::ProjectionRefresher;
pub use push_ingestor::{IngestError, Ingested, PushIngestor};
