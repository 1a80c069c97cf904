//! In-memory [`PullApi`] and fixtures for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Notify;
use tonmarket_sdk::objects::account::{AccountAddress, AccountInfo, AssetsResponse};
use tonmarket_sdk::objects::catalog::{Event, EventPage, Tag, TagId, Wager};
use tonmarket_sdk::objects::payment::{
    DepositId, DepositReport, PaymentIntent, PaymentIntentRequest, PaymentMessage, ProofAck,
    ProofChallenge, SignedProof,
};

use crate::error::TransportError;
use crate::transport::PullApi;

pub fn event(id: &str, collateral: i64) -> Event {
    Event {
        id: id.to_string(),
        tag: TagId::ALL,
        collateral: Decimal::from(collateral),
        logo_link: String::new(),
        title: format!("event {id}"),
        bets: Vec::new(),
    }
}

pub fn wager(token: &str, title: &str) -> Wager {
    Wager {
        collateral: Decimal::ZERO,
        title: title.to_string(),
        percentage: Decimal::ZERO,
        token: token.into(),
        logo_link: String::new(),
    }
}

pub fn refused(status: u16) -> TransportError {
    TransportError::Status {
        status,
        body: "refused".to_string(),
    }
}

/// Every call the mock received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListTags,
    ListEvents { page: u32, tag: TagId },
    ListAssets,
    AccountInfo,
    CreatePaymentIntent(PaymentIntentRequest),
    RequestProof,
    VerifyProof(SignedProof),
    ReportDeposit(DepositReport),
    DisconnectWallet,
}

#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<Call>>,
    pages: Mutex<HashMap<(u32, TagId), Result<EventPage, TransportError>>>,
    intents: Mutex<VecDeque<Result<PaymentIntent, TransportError>>>,
    verify_error: Mutex<Option<TransportError>>,
    assets: Mutex<AssetsResponse>,
    account: Mutex<Option<AccountInfo>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn set_page(&self, page: u32, tag: TagId, items: Vec<Event>, pages: u32) {
        self.pages
            .lock()
            .unwrap()
            .insert((page, tag), Ok(EventPage { items, pages }));
    }

    pub fn fail_page(&self, page: u32, tag: TagId, error: TransportError) {
        self.pages.lock().unwrap().insert((page, tag), Err(error));
    }

    /// Queue the response of the next `create_payment_intent` call. Without
    /// a queued response, a fresh identifier is issued.
    pub fn push_intent(&self, response: Result<PaymentIntent, TransportError>) {
        self.intents.lock().unwrap().push_back(response);
    }

    pub fn fail_verification(&self, error: TransportError) {
        *self.verify_error.lock().unwrap() = Some(error);
    }

    pub fn set_assets(&self, assets: AssetsResponse) {
        *self.assets.lock().unwrap() = assets;
    }

    pub fn set_account_balance(&self, nanotons: i64) {
        *self.account.lock().unwrap() = Some(AccountInfo {
            address: AccountAddress {
                raw: "0:abcd".to_string(),
                bounceable: "EQ-abcd".to_string(),
                non_bounceable: "UQ-abcd".to_string(),
            },
            balance: nanotons,
            status: "active".to_string(),
        });
    }

    /// Make `list_events` wait until the returned handle is notified.
    pub fn hold_pages(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

pub fn intent(deposit_id: &str) -> PaymentIntent {
    PaymentIntent {
        message: PaymentMessage {
            address: "EQ-bank".to_string(),
            amount: "1000000000".to_string(),
            payload: "te6cck".to_string(),
        },
        deposit_id: DepositId::from(deposit_id),
    }
}

#[async_trait]
impl PullApi for MockApi {
    async fn list_tags(&self) -> Result<Vec<Tag>, TransportError> {
        self.record(Call::ListTags);
        Ok(vec![
            Tag {
                id: TagId::POLITICS,
                title: "Politics".to_string(),
            },
            Tag {
                id: TagId::ALL,
                title: "All".to_string(),
            },
        ])
    }

    async fn list_events(&self, page: u32, tag: TagId) -> Result<EventPage, TransportError> {
        self.record(Call::ListEvents { page, tag });
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.pages
            .lock()
            .unwrap()
            .get(&(page, tag))
            .cloned()
            .unwrap_or_else(|| Err(refused(404)))
    }

    async fn list_assets(&self) -> Result<AssetsResponse, TransportError> {
        self.record(Call::ListAssets);
        Ok(self.assets.lock().unwrap().clone())
    }

    async fn account_info(&self) -> Result<AccountInfo, TransportError> {
        self.record(Call::AccountInfo);
        self.account.lock().unwrap().clone().ok_or_else(|| refused(401))
    }

    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, TransportError> {
        self.record(Call::CreatePaymentIntent(request.clone()));
        let queued = self.intents.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(intent(&uuid::Uuid::new_v4().to_string())))
    }

    async fn request_proof(&self) -> Result<ProofChallenge, TransportError> {
        self.record(Call::RequestProof);
        Ok(ProofChallenge {
            payload: "challenge".to_string(),
        })
    }

    async fn verify_proof(&self, proof: &SignedProof) -> Result<ProofAck, TransportError> {
        self.record(Call::VerifyProof(proof.clone()));
        match self.verify_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(ProofAck {
                token: Some("jwt".to_string()),
            }),
        }
    }

    async fn report_deposit(&self, report: &DepositReport) -> Result<(), TransportError> {
        self.record(Call::ReportDeposit(report.clone()));
        Ok(())
    }

    async fn disconnect_wallet(&self) -> Result<(), TransportError> {
        self.record(Call::DisconnectWallet);
        Ok(())
    }
}
