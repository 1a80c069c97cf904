//! ProjectionRefresher processor.
//!
//! Receives `RefreshRequest` events (emitted on deposit approval) and
//! re-derives the `AccountProjection` from the server. Failures are logged;
//! the projection keeps its previous values.

use std::sync::Arc;

use kanau::processor::Processor;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::account::{AccountProjection, AccountSnapshot};
use crate::error::TransportError;
use crate::events::{RefreshRequest, RefreshRequestReceiver};
use crate::transport::PullApi;

/// ProjectionRefresher keeps the account projection in step with approvals.
pub struct ProjectionRefresher<P: ?Sized> {
    account: Arc<AccountProjection<P>>,
}

impl<P: PullApi + ?Sized> ProjectionRefresher<P> {
    pub fn new(account: Arc<AccountProjection<P>>) -> Self {
        Self { account }
    }

    /// Run the ProjectionRefresher until shutdown or until every sender is
    /// dropped.
    pub async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut refresh_rx: RefreshRequestReceiver,
    ) {
        info!("ProjectionRefresher started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("ProjectionRefresher received shutdown signal");
                        break;
                    }
                }

                request = refresh_rx.recv() => {
                    let Some(request) = request else {
                        info!("RefreshRequest channel closed");
                        break;
                    };
                    let reason = request.reason.clone();
                    if let Err(e) = self.process(request).await {
                        warn!(%reason, error = %e, "Failed to refresh account projection");
                    }
                }
            }
        }

        info!("ProjectionRefresher shutdown complete");
    }
}

impl<P: PullApi + ?Sized> Processor<RefreshRequest> for ProjectionRefresher<P> {
    type Output = AccountSnapshot;
    type Error = TransportError;

    async fn process(&self, request: RefreshRequest) -> Result<AccountSnapshot, TransportError> {
        debug!(reason = %request.reason, "Refreshing account projection");
        self.account.refresh().await
    }
}
