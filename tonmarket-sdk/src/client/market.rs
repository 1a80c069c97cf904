//! Market API client (mini-app frontend → TON Market server).
//!
//! Public catalog endpoints need no authentication. After a successful
//! `check-proof` the server hands out a bearer token, which the client keeps
//! and attaches to every later request.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{Client, RequestBuilder};
use url::Url;

use super::{expect_success, parse_response, ClientError};
use crate::objects::account::{AccountInfo, AssetsResponse};
use crate::objects::catalog::{EventPage, Tag, TagId};
use crate::objects::payment::{
    DepositReport, PaymentIntent, PaymentIntentRequest, ProofAck, ProofChallenge, SignedProof,
};

/// Typed HTTP client for the TON Market API.
#[derive(Debug, Clone)]
pub struct MarketClient {
    http: Client,
    base_url: Url,
    auth_token: Arc<RwLock<Option<String>>>,
}

impl MarketClient {
    /// Create a new `MarketClient`.
    ///
    /// * `base_url` – API root, e.g. `https://market.example.com/ton-market/`.
    ///   A missing trailing slash is added so endpoint paths join below it.
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http: Client::new(),
            base_url,
            auth_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Set or clear the bearer token sent with every request.
    pub fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn auth_token(&self) -> Option<String> {
        self.auth_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// `GET get-tags` – list the category filters.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, ClientError> {
        let url = self.endpoint("get-tags")?;
        let resp = self.authorize(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// `GET get-events?page&tag` – one page of events for a tag.
    pub async fn list_events(&self, page: u32, tag: TagId) -> Result<EventPage, ClientError> {
        let url = self.endpoint("get-events")?;
        let resp = self
            .authorize(self.http.get(url))
            .query(&[("page", page.to_string()), ("tag", tag.to_string())])
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET get-assets` – positions held by the authenticated wallet.
    pub async fn list_assets(&self) -> Result<AssetsResponse, ClientError> {
        let url = self.endpoint("get-assets")?;
        let resp = self.authorize(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// `GET get-address` – live account state of the authenticated wallet.
    pub async fn account_info(&self) -> Result<AccountInfo, ClientError> {
        let url = self.endpoint("get-address")?;
        let resp = self.authorize(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// `POST pay` – create a payment intent for a wager.
    pub async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, ClientError> {
        let url = self.endpoint("pay")?;
        let resp = self
            .authorize(self.http.post(url))
            .json(request)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST generate-payload` – obtain a challenge for the wallet to sign.
    pub async fn request_proof(&self) -> Result<ProofChallenge, ClientError> {
        let url = self.endpoint("generate-payload")?;
        let resp = self.authorize(self.http.post(url)).send().await?;
        parse_response(resp).await
    }

    /// `POST check-proof` – submit a signed proof for verification.
    ///
    /// The returned bearer token, if any, is stored for later requests.
    pub async fn verify_proof(&self, proof: &SignedProof) -> Result<ProofAck, ClientError> {
        let url = self.endpoint("check-proof")?;
        let resp = self
            .authorize(self.http.post(url))
            .json(proof)
            .send()
            .await?;
        let ack: ProofAck = parse_response(resp).await?;
        if let Some(token) = &ack.token {
            self.set_auth_token(Some(token.clone()));
        }
        Ok(ack)
    }

    /// `POST deposit` – report the outcome of the wallet transfer.
    pub async fn report_deposit(&self, report: &DepositReport) -> Result<(), ClientError> {
        let url = self.endpoint("deposit")?;
        let resp = self
            .authorize(self.http.post(url))
            .json(report)
            .send()
            .await?;
        expect_success(resp).await
    }

    /// `DELETE disconnect-wallet` – unlink the wallet and drop the session.
    pub async fn disconnect_wallet(&self) -> Result<(), ClientError> {
        let url = self.endpoint("disconnect-wallet")?;
        let resp = self.authorize(self.http.delete(url)).send().await?;
        let result = expect_success(resp).await;
        self.set_auth_token(None);
        result
    }
}
