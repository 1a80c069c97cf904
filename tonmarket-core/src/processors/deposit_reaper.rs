//! DepositReaper processor.
//!
//! Only spawned when a submission timeout is configured. On every tick it
//! settles `Submitted` deposits that have waited longer than the timeout as
//! expired.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::transport::PullApi;
use crate::workflow::ProofWorkflow;

/// Shortest interval between two sweeps.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Sweep four times per timeout window, but never more than once a second.
pub fn sweep_interval(timeout: Duration) -> Duration {
    (timeout / 4).max(MIN_SWEEP_INTERVAL)
}

/// DepositReaper expires deposits whose verdict never arrived.
pub struct DepositReaper<P: ?Sized> {
    workflow: Arc<ProofWorkflow<P>>,
    interval: Duration,
}

impl<P: PullApi + ?Sized> DepositReaper<P> {
    pub fn new(workflow: Arc<ProofWorkflow<P>>, timeout: Duration) -> Self {
        Self {
            workflow,
            interval: sweep_interval(timeout),
        }
    }

    /// Run the DepositReaper until shutdown.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(interval = ?self.interval, "DepositReaper started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("DepositReaper received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let expired = self.workflow.expire_stale();
                    if !expired.is_empty() {
                        debug!(count = expired.len(), "Expired stale deposits");
                    }
                }
            }
        }

        info!("DepositReaper shutdown complete");
    }
}
