//! Event type definitions passed between the processors.

use tonmarket_sdk::objects::payment::DepositId;

/// A raw text frame received from the push channel, not yet decoded.
pub type PushFrame = String;

/// Why the account projection should be re-derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshReason {
    /// A deposit was approved by the server.
    DepositApproved(DepositId),
    /// A consumer asked for fresh data.
    Requested,
}

/// Event asking the `ProjectionRefresher` to call `refresh()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub reason: RefreshReason,
}

impl RefreshRequest {
    pub fn deposit_approved(deposit_id: DepositId) -> Self {
        Self {
            reason: RefreshReason::DepositApproved(deposit_id),
        }
    }
}

impl std::fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshReason::DepositApproved(id) => write!(f, "deposit {id} approved"),
            RefreshReason::Requested => write!(f, "requested"),
        }
    }
}
