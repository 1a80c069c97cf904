//! Registry of in-flight deposits, matched to server verdicts by identifier.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tonmarket_sdk::objects::payment::{DepositId, DepositStatus};
use tracing::{debug, info, warn};

use super::state::{WorkflowRecord, WorkflowState};
use crate::error::WorkflowError;
use crate::events::{RefreshRequest, RefreshRequestSender};

pub(crate) type Outcome = Result<WorkflowRecord, WorkflowError>;

struct Entry {
    record: WorkflowRecord,
    outcome_tx: Option<oneshot::Sender<Outcome>>,
}

/// Cloneable handle to the deposit registry.
///
/// Both the [`ProofWorkflow`](super::ProofWorkflow) and the push ingestor hold
/// one; verdicts from either side land on the same records.
#[derive(Clone)]
pub struct DepositCorrelator {
    entries: Arc<Mutex<HashMap<DepositId, Entry>>>,
    refresh_tx: RefreshRequestSender,
}

impl DepositCorrelator {
    pub fn new(refresh_tx: RefreshRequestSender) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            refresh_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DepositId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(
        &self,
        record: WorkflowRecord,
    ) -> Result<oneshot::Receiver<Outcome>, WorkflowError> {
        let mut entries = self.lock();
        if entries.contains_key(&record.deposit_id) {
            return Err(WorkflowError::DuplicateDeposit(record.deposit_id));
        }
        let (outcome_tx, outcome_rx) = oneshot::channel();
        entries.insert(
            record.deposit_id.clone(),
            Entry {
                record,
                outcome_tx: Some(outcome_tx),
            },
        );
        Ok(outcome_rx)
    }

    /// Move a record to `to`, applying `update` on success.
    pub(crate) fn transition(
        &self,
        id: &DepositId,
        to: WorkflowState,
        update: impl FnOnce(&mut WorkflowRecord),
    ) -> Result<WorkflowRecord, WorkflowError> {
        let mut entries = self.lock();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| WorkflowError::UnknownDeposit(id.clone()))?;
        let from = entry.record.state;
        if !from.can_transition_to(to) {
            return Err(WorkflowError::InvalidTransition {
                id: id.clone(),
                from,
                to,
            });
        }
        entry.record.state = to;
        update(&mut entry.record);
        debug!(deposit_id = %id, %from, %to, "Deposit workflow advanced");
        Ok(entry.record.clone())
    }

    /// Apply a server verdict.
    ///
    /// Returns `false` when no tracked, non-terminal deposit carries `id`; such
    /// notifications have no effect. An approval emits exactly one
    /// [`RefreshRequest`].
    pub fn resolve(&self, id: &DepositId, status: DepositStatus) -> bool {
        let outcome = match status {
            DepositStatus::Approved => None,
            DepositStatus::Rejected => Some(WorkflowError::Rejected(id.clone())),
        };
        self.finish(id, outcome)
    }

    /// Terminate a record. `failure` of `None` means approval.
    pub(crate) fn finish(&self, id: &DepositId, failure: Option<WorkflowError>) -> bool {
        let to = if failure.is_some() {
            WorkflowState::Rejected
        } else {
            WorkflowState::Approved
        };

        {
            let mut entries = self.lock();
            let Some(entry) = entries.get_mut(id) else {
                debug!(deposit_id = %id, "Verdict for untracked deposit ignored");
                return false;
            };
            if !entry.record.state.can_transition_to(to) {
                debug!(deposit_id = %id, state = %entry.record.state, "Verdict for settled deposit ignored");
                return false;
            }
            entry.record.state = to;

            let outcome = match failure {
                None => Ok(entry.record.clone()),
                Some(error) => Err(error),
            };
            let delivered = entry
                .outcome_tx
                .take()
                .is_some_and(|tx| tx.send(outcome).is_ok());
            if !delivered {
                // Nobody is waiting; the record would otherwise linger.
                entries.remove(id);
            }
        }

        match to {
            WorkflowState::Approved => {
                info!(deposit_id = %id, "Deposit approved");
                if let Err(e) = self.refresh_tx.try_send(RefreshRequest::deposit_approved(id.clone())) {
                    warn!(deposit_id = %id, error = %e, "Failed to request account refresh");
                }
            }
            _ => info!(deposit_id = %id, "Deposit rejected"),
        }
        true
    }

    /// Reject every submitted deposit that has waited longer than `timeout`.
    pub fn expire_submitted(&self, timeout: Duration, now: Instant) -> Vec<DepositId> {
        let stale: Vec<DepositId> = self
            .lock()
            .values()
            .filter(|entry| entry.record.state == WorkflowState::Submitted)
            .filter(|entry| {
                entry
                    .record
                    .submitted_at
                    .is_some_and(|at| now.saturating_duration_since(at) >= timeout)
            })
            .map(|entry| entry.record.deposit_id.clone())
            .collect();

        stale
            .into_iter()
            .filter(|id| {
                warn!(deposit_id = %id, ?timeout, "Deposit expired awaiting verdict");
                self.finish(id, Some(WorkflowError::Expired(id.clone())))
            })
            .collect()
    }

    pub fn record(&self, id: &DepositId) -> Option<WorkflowRecord> {
        self.lock().get(id).map(|entry| entry.record.clone())
    }

    pub fn state(&self, id: &DepositId) -> Option<WorkflowState> {
        self.lock().get(id).map(|entry| entry.record.state)
    }

    /// All tracked records, ordered by identifier.
    pub fn records(&self) -> Vec<WorkflowRecord> {
        let mut records: Vec<_> = self.lock().values().map(|e| e.record.clone()).collect();
        records.sort_by(|a, b| a.deposit_id.cmp(&b.deposit_id));
        records
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop the record for `id` if it has reached a terminal state.
    pub(crate) fn release_settled(&self, id: &DepositId) {
        let mut entries = self.lock();
        if entries.get(id).is_some_and(|entry| entry.record.state.is_terminal()) {
            entries.remove(id);
        }
    }
}

impl std::fmt::Debug for DepositCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepositCorrelator")
            .field("tracked", &self.len())
            .finish()
    }
}
