//! Push channel subscription over WebSocket.
//!
//! The subscription only moves raw text frames from the socket into a
//! channel; decoding and applying them is up to the consumer. Reconnecting
//! after the socket closes is left to the caller.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use super::ClientError;

/// Default buffer size for the inbound frame channel.
pub const DEFAULT_PUSH_BUFFER: usize = 256;

/// A live push channel connection.
pub struct PushSubscription {
    task: JoinHandle<Result<(), ClientError>>,
}

impl PushSubscription {
    /// Connect to `url` and forward every text frame into `frames`, in
    /// arrival order.
    ///
    /// Returns once the WebSocket handshake completed; forwarding continues
    /// on a background task until the socket closes. Dropping the
    /// subscription or the frame receiver stops it as well.
    pub async fn connect(url: &Url, frames: mpsc::Sender<String>) -> Result<Self, ClientError> {
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        info!(url = %url, "push channel connected");

        let task = tokio::spawn(async move {
            let (mut write, mut read) = ws_stream.split();
            while let Some(msg) = read.next().await {
                match msg? {
                    Message::Text(text) => {
                        if frames.send(text.to_string()).await.is_err() {
                            debug!("push frame receiver dropped, closing subscription");
                            break;
                        }
                    }
                    Message::Ping(data) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Message::Close(frame) => {
                        info!(frame = ?frame, "push channel closed by server");
                        break;
                    }
                    Message::Binary(data) => {
                        warn!(len = data.len(), "ignoring binary push frame");
                    }
                    _ => {}
                }
            }
            Ok(())
        });

        Ok(Self { task })
    }

    /// Wait for the forwarding task to finish.
    pub async fn closed(&mut self) -> Result<(), ClientError> {
        match (&mut self.task).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "push forwarding task aborted");
                Ok(())
            }
        }
    }

    /// Stop forwarding frames.
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
