//! Event channel factories and handles.

use super::types::{PushFrame, RefreshRequest};
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for push frames.
pub type PushFrameSender = mpsc::Sender<PushFrame>;
/// Receiver handle for push frames.
pub type PushFrameReceiver = mpsc::Receiver<PushFrame>;

/// Sender handle for RefreshRequest events.
pub type RefreshRequestSender = mpsc::Sender<RefreshRequest>;
/// Receiver handle for RefreshRequest events.
pub type RefreshRequestReceiver = mpsc::Receiver<RefreshRequest>;

/// Create a new push frame channel.
///
/// The receiver is handed to the `PushIngestor` exactly once; the sender
/// goes to whatever owns the push transport.
pub fn push_frame_channel() -> (PushFrameSender, PushFrameReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a new RefreshRequest channel.
pub fn refresh_request_channel() -> (RefreshRequestSender, RefreshRequestReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
