//! Request/response capability consumed by the engine.
//!
//! The engine never talks to a concrete HTTP client. Components are generic
//! over [`PullApi`], which the SDK's `MarketClient` implements when the
//! `http` feature is enabled; tests substitute an in-memory implementation.

#[cfg(feature = "http")]
mod http;

use async_trait::async_trait;
use tonmarket_sdk::objects::account::{AccountInfo, AssetsResponse};
use tonmarket_sdk::objects::catalog::{EventPage, Tag, TagId};
use tonmarket_sdk::objects::payment::{
    DepositReport, PaymentIntent, PaymentIntentRequest, ProofAck, ProofChallenge, SignedProof,
};

use crate::error::TransportError;

/// All server calls the engine needs.
#[async_trait]
pub trait PullApi: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<Tag>, TransportError>;

    /// Retrieve one 1-based page of events for `tag`.
    async fn list_events(&self, page: u32, tag: TagId) -> Result<EventPage, TransportError>;

    async fn list_assets(&self) -> Result<AssetsResponse, TransportError>;

    async fn account_info(&self) -> Result<AccountInfo, TransportError>;

    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, TransportError>;

    async fn request_proof(&self) -> Result<ProofChallenge, TransportError>;

    async fn verify_proof(&self, proof: &SignedProof) -> Result<ProofAck, TransportError>;

    async fn report_deposit(&self, report: &DepositReport) -> Result<(), TransportError>;

    async fn disconnect_wallet(&self) -> Result<(), TransportError>;
}
