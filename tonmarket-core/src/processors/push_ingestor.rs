//! PushIngestor processor.
//!
//! The PushIngestor is responsible for:
//! - Receiving raw `PushFrame` text frames from the push transport
//! - Decoding them into event payloads or deposit notifications
//! - Merging event payloads into the `SharedCatalog`
//! - Resolving deposit notifications through the `DepositCorrelator`
//!
//! Malformed frames are logged and skipped; they never stop the loop.

use kanau::processor::Processor;
use thiserror::Error;
use tokio::sync::watch;
use tonmarket_sdk::objects::push::{PushDecodeError, PushMessage};
use tracing::{debug, info, warn};

use crate::error::MergeConflictError;
use crate::events::{PushFrame, PushFrameReceiver};
use crate::store::{SharedCatalog, Upserted};
use crate::workflow::DepositCorrelator;

/// Errors that can occur while ingesting a push frame.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed push frame: {0}")]
    Decode(#[from] PushDecodeError),
    #[error(transparent)]
    Merge(#[from] MergeConflictError),
}

/// What a single frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    Event(Upserted),
    /// A deposit notification; `matched` is false when no tracked deposit
    /// carried its identifier.
    Deposit { matched: bool },
}

/// PushIngestor applies the push channel to the local state.
pub struct PushIngestor {
    catalog: SharedCatalog,
    correlator: DepositCorrelator,
}

impl PushIngestor {
    pub fn new(catalog: SharedCatalog, correlator: DepositCorrelator) -> Self {
        Self {
            catalog,
            correlator,
        }
    }

    /// Run the PushIngestor until shutdown or until the frame channel closes.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>, mut frame_rx: PushFrameReceiver) {
        info!("PushIngestor started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("PushIngestor received shutdown signal");
                        break;
                    }
                }

                frame = frame_rx.recv() => {
                    let Some(frame) = frame else {
                        info!("Push frame channel closed");
                        break;
                    };
                    if let Err(e) = self.process(frame).await {
                        warn!(error = %e, "Skipping push frame");
                    }
                }
            }
        }

        info!("PushIngestor shutdown complete");
    }
}

impl Processor<PushFrame> for PushIngestor {
    type Output = Ingested;
    type Error = IngestError;

    async fn process(&self, frame: PushFrame) -> Result<Ingested, IngestError> {
        match PushMessage::decode(&frame)? {
            PushMessage::Event(patch) => {
                let upserted = self.catalog.upsert(patch)?;
                debug!(?upserted, "Applied pushed event");
                Ok(Ingested::Event(upserted))
            }
            PushMessage::Deposit(notification) => {
                let matched = self
                    .correlator
                    .resolve(&notification.deposit_id, notification.status);
                debug!(
                    deposit_id = %notification.deposit_id,
                    status = ?notification.status,
                    matched,
                    "Applied deposit notification"
                );
                Ok(Ingested::Deposit { matched })
            }
        }
    }
}
