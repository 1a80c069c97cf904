use tokio::time::Instant;
use tonmarket_sdk::objects::payment::{DepositId, PaymentIntentRequest, PaymentMessage, SignedProof};

/// Lifecycle of a deposit workflow.
///
/// ```text
/// Initiated → IntentIssued → ProofRequested → ProofAcquired → Submitted → Approved
///                                                                       ↘ Rejected
/// ```
///
/// `Initiated` only exists until the server issues an identifier; records
/// are tracked from `IntentIssued` on. A verdict may arrive from any
/// non-terminal state, since the push channel is not ordered with respect to
/// pull responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    Initiated,
    IntentIssued,
    ProofRequested,
    ProofAcquired,
    Submitted,
    Approved,
    Rejected,
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Approved | WorkflowState::Rejected)
    }

    pub fn can_transition_to(self, next: WorkflowState) -> bool {
        use WorkflowState::*;

        match (self, next) {
            (Initiated, IntentIssued)
            | (IntentIssued, ProofRequested)
            | (ProofRequested, ProofAcquired)
            | (ProofAcquired, Submitted) => true,
            // Proof acquisition failed; allow another attempt.
            (ProofRequested, IntentIssued) => true,
            (from, Approved | Rejected) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowState::Initiated => "INITIATED",
            WorkflowState::IntentIssued => "INTENT_ISSUED",
            WorkflowState::ProofRequested => "PROOF_REQUESTED",
            WorkflowState::ProofAcquired => "PROOF_ACQUIRED",
            WorkflowState::Submitted => "SUBMITTED",
            WorkflowState::Approved => "APPROVED",
            WorkflowState::Rejected => "REJECTED",
        };
        f.write_str(name)
    }
}

/// One payment attempt, keyed by its server-issued identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRecord {
    pub deposit_id: DepositId,
    pub request: PaymentIntentRequest,
    pub instructions: PaymentMessage,
    pub state: WorkflowState,
    pub proof: Option<SignedProof>,
    pub created_at: time::OffsetDateTime,
    pub submitted_at: Option<Instant>,
}
