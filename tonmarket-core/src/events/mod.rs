//! Events flowing between the engine's processors.
//!
//! # Event Flow
//!
//! 1. Push transport emits `PushFrame` -> `PushIngestor`
//! 2. `PushIngestor` upserts events and resolves deposits in the `ProofWorkflow`
//! 3. `ProofWorkflow` emits `RefreshRequest` on approval -> `ProjectionRefresher`

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, PushFrameReceiver, PushFrameSender, RefreshRequestReceiver,
    RefreshRequestSender, push_frame_channel, refresh_request_channel,
};

pub use types::{PushFrame, RefreshReason, RefreshRequest};
