//! Error taxonomy shared by the engine components.
//!
//! - [`ValidationError`]: request parameters rejected before any state change.
//! - [`TransportError`]: a pull call did not complete successfully.
//! - [`MergeConflictError`]: an entity payload cannot be merged.
//! - [`WorkflowError`]: a proof/deposit workflow failed or ended in rejection.

use rust_decimal::Decimal;
use thiserror::Error;
use tonmarket_sdk::objects::payment::DepositId;

use crate::workflow::WorkflowState;

/// Malformed request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("event identifier is empty")]
    EmptyEventId,

    #[error("collateral must be positive, got {0}")]
    NonPositiveCollateral(Decimal),

    #[error("settlement token is empty")]
    EmptyToken,

    #[error("pages are numbered from 1")]
    ZeroPage,
}

/// A request/response call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    /// The request did not complete (connection, TLS, timeout, …).
    #[error("request failed: {0}")]
    Request(String),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl TransportError {
    /// `true` when the server understood the request and refused it.
    pub fn is_refusal(&self) -> bool {
        matches!(self, TransportError::Status { status, .. } if (400..500).contains(status))
    }
}

/// An entity payload cannot be merged into the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeConflictError {
    #[error("event payload has no identifier")]
    MissingId,
}

/// Failures of the proof/deposit workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("invalid payment parameters: {0}")]
    Validation(#[from] ValidationError),

    /// The server refused to issue a payment intent.
    #[error("payment intent refused: {0}")]
    PaymentIntent(TransportError),

    /// The server refused the submitted proof.
    #[error("proof refused: {0}")]
    ProofRejected(TransportError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The wallet could not produce a signed proof.
    #[error("proof signing failed: {0}")]
    Signer(String),

    #[error("unknown deposit {0}")]
    UnknownDeposit(DepositId),

    /// The server issued an identifier that is already being tracked.
    #[error("deposit {0} is already tracked")]
    DuplicateDeposit(DepositId),

    #[error("deposit {id}: cannot move from {from} to {to}")]
    InvalidTransition {
        id: DepositId,
        from: WorkflowState,
        to: WorkflowState,
    },

    #[error("deposit {0} has no acquired proof")]
    MissingProof(DepositId),

    #[error("deposit {0} was rejected")]
    Rejected(DepositId),

    #[error("deposit {0} expired while awaiting approval")]
    Expired(DepositId),

    /// The workflow registry was dropped before the outcome arrived.
    #[error("deposit {0} was abandoned")]
    Abandoned(DepositId),
}
