use async_trait::async_trait;
use tonmarket_sdk::client::{ClientError, MarketClient};
use tonmarket_sdk::objects::account::{AccountInfo, AssetsResponse};
use tonmarket_sdk::objects::catalog::{EventPage, Tag, TagId};
use tonmarket_sdk::objects::payment::{
    DepositReport, PaymentIntent, PaymentIntentRequest, ProofAck, ProofChallenge, SignedProof,
};

use super::PullApi;
use crate::error::TransportError;

impl From<ClientError> for TransportError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Api { status, body } => TransportError::Status {
                status: status.as_u16(),
                body,
            },
            ClientError::Json(e) => TransportError::Decode(e.to_string()),
            other => TransportError::Request(other.to_string()),
        }
    }
}

#[async_trait]
impl PullApi for MarketClient {
    async fn list_tags(&self) -> Result<Vec<Tag>, TransportError> {
        Ok(MarketClient::list_tags(self).await?)
    }

    async fn list_events(&self, page: u32, tag: TagId) -> Result<EventPage, TransportError> {
        Ok(MarketClient::list_events(self, page, tag).await?)
    }

    async fn list_assets(&self) -> Result<AssetsResponse, TransportError> {
        Ok(MarketClient::list_assets(self).await?)
    }

    async fn account_info(&self) -> Result<AccountInfo, TransportError> {
        Ok(MarketClient::account_info(self).await?)
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, TransportError> {
        Ok(MarketClient::create_payment_intent(self, request).await?)
    }

    async fn request_proof(&self) -> Result<ProofChallenge, TransportError> {
        Ok(MarketClient::request_proof(self).await?)
    }

    async fn verify_proof(&self, proof: &SignedProof) -> Result<ProofAck, TransportError> {
        Ok(MarketClient::verify_proof(self, proof).await?)
    }

    async fn report_deposit(&self, report: &DepositReport) -> Result<(), TransportError> {
        Ok(MarketClient::report_deposit(self, report).await?)
    }

    async fn disconnect_wallet(&self) -> Result<(), TransportError> {
        Ok(MarketClient::disconnect_wallet(self).await?)
    }
}
