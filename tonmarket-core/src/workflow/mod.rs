//! Proof/deposit workflow.
//!
//! A payment attempt starts with a server-issued payment intent, proceeds
//! through wallet proof acquisition and submission, and is settled by a
//! verdict that usually arrives over the push channel. Each attempt is keyed
//! by its deposit identifier, so any number may be in flight at once.

mod correlator;
mod state;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tonmarket_sdk::objects::SettlementToken;
use tonmarket_sdk::objects::payment::{
    DepositId, DepositReport, DepositStatus, PaymentIntentRequest, PaymentMessage, ProofChallenge,
    SignedProof,
};
use tracing::{debug, info, warn};

pub use correlator::DepositCorrelator;
pub use state::{WorkflowRecord, WorkflowState};

use crate::config::WorkflowConfig;
use crate::error::{ValidationError, WorkflowError};
use crate::transport::PullApi;
use correlator::Outcome;

/// Produces a signed proof for a server challenge; implemented by the wallet
/// integration.
#[async_trait]
pub trait ProofSigner: Send + Sync {
    async fn sign(&self, challenge: &ProofChallenge) -> Result<SignedProof, String>;
}

/// Awaitable outcome of one payment attempt.
#[derive(Debug)]
pub struct DepositHandle {
    deposit_id: DepositId,
    instructions: PaymentMessage,
    outcome_rx: oneshot::Receiver<Outcome>,
    correlator: DepositCorrelator,
}

impl DepositHandle {
    pub fn deposit_id(&self) -> &DepositId {
        &self.deposit_id
    }

    /// Transfer the wallet has to execute for this attempt.
    pub fn instructions(&self) -> &PaymentMessage {
        &self.instructions
    }

    /// Wait for the verdict. The record is released once this returns.
    pub async fn wait(mut self) -> Result<WorkflowRecord, WorkflowError> {
        match (&mut self.outcome_rx).await {
            Ok(outcome) => outcome,
            Err(_) => Err(WorkflowError::Abandoned(self.deposit_id.clone())),
        }
    }
}

impl Drop for DepositHandle {
    /// A settled record goes with its handle. An unsettled one stays until its
    /// verdict arrives and finds nobody waiting.
    fn drop(&mut self) {
        self.correlator.release_settled(&self.deposit_id);
    }
}

/// Drives payment attempts against the pull API.
pub struct ProofWorkflow<P: ?Sized> {
    api: Arc<P>,
    correlator: DepositCorrelator,
    config: WorkflowConfig,
}

impl<P: PullApi + ?Sized> ProofWorkflow<P> {
    pub fn new(api: Arc<P>, correlator: DepositCorrelator, config: WorkflowConfig) -> Self {
        Self {
            api,
            correlator,
            config,
        }
    }

    pub fn correlator(&self) -> &DepositCorrelator {
        &self.correlator
    }

    /// Ask the server for transfer instructions.
    ///
    /// Parameters are validated locally first; a malformed request never
    /// reaches the server and leaves no record behind.
    pub async fn request_payment_intent(
        &self,
        event_id: impl Into<String>,
        collateral: Decimal,
        token: impl Into<SettlementToken>,
    ) -> Result<DepositHandle, WorkflowError> {
        let request = PaymentIntentRequest {
            event_id: event_id.into(),
            collateral,
            token: token.into(),
        };
        validate(&request)?;
        debug!(event_id = %request.event_id, %collateral, token = %request.token, "Requesting payment intent");

        let intent = self.api.create_payment_intent(&request).await.map_err(|e| {
            if e.is_refusal() {
                WorkflowError::PaymentIntent(e)
            } else {
                WorkflowError::Transport(e)
            }
        })?;

        let record = WorkflowRecord {
            deposit_id: intent.deposit_id.clone(),
            request,
            instructions: intent.message.clone(),
            state: WorkflowState::IntentIssued,
            proof: None,
            created_at: time::OffsetDateTime::now_utc(),
            submitted_at: None,
        };
        let event_id = record.request.event_id.clone();
        let outcome_rx = self.correlator.register(record)?;
        info!(deposit_id = %intent.deposit_id, %event_id, "Payment intent issued");

        Ok(DepositHandle {
            deposit_id: intent.deposit_id,
            instructions: intent.message,
            outcome_rx,
            correlator: self.correlator.clone(),
        })
    }

    /// Fetch a bare proof challenge, outside of any tracked attempt.
    pub async fn request_proof(&self) -> Result<ProofChallenge, WorkflowError> {
        Ok(self.api.request_proof().await?)
    }

    /// Request a challenge and have `signer` sign it.
    ///
    /// On failure the record returns to `IntentIssued` so the attempt can be
    /// retried.
    pub async fn acquire_proof(
        &self,
        id: &DepositId,
        signer: &dyn ProofSigner,
    ) -> Result<WorkflowRecord, WorkflowError> {
        self.correlator
            .transition(id, WorkflowState::ProofRequested, |_| {})?;

        let signed = match self.api.request_proof().await {
            Ok(challenge) => signer
                .sign(&challenge)
                .await
                .map_err(WorkflowError::Signer),
            Err(e) => Err(WorkflowError::Transport(e)),
        };

        match signed {
            Ok(proof) => self
                .correlator
                .transition(id, WorkflowState::ProofAcquired, |record| {
                    record.proof = Some(proof)
                }),
            Err(error) => {
                warn!(deposit_id = %id, error = %error, "Proof acquisition failed");
                // Ignored if a verdict settled the record meanwhile.
                let _ = self
                    .correlator
                    .transition(id, WorkflowState::IntentIssued, |_| {});
                Err(error)
            }
        }
    }

    /// Submit the acquired proof.
    ///
    /// A refusal settles the attempt as rejected. Any other transport failure
    /// leaves it in `ProofAcquired`, ready to be resubmitted.
    pub async fn submit_proof(&self, id: &DepositId) -> Result<WorkflowState, WorkflowError> {
        let record = self
            .correlator
            .record(id)
            .ok_or_else(|| WorkflowError::UnknownDeposit(id.clone()))?;
        if record.state != WorkflowState::ProofAcquired {
            return Err(WorkflowError::InvalidTransition {
                id: id.clone(),
                from: record.state,
                to: WorkflowState::Submitted,
            });
        }
        let proof = record
            .proof
            .ok_or_else(|| WorkflowError::MissingProof(id.clone()))?;

        match self.api.verify_proof(&proof).await {
            Ok(_) => {
                let advanced = self
                    .correlator
                    .transition(id, WorkflowState::Submitted, |record| {
                        record.submitted_at = Some(Instant::now())
                    });
                match advanced {
                    Ok(record) => {
                        info!(deposit_id = %id, "Proof submitted");
                        Ok(record.state)
                    }
                    // A verdict overtook the acknowledgement.
                    Err(WorkflowError::InvalidTransition { from, .. }) if from.is_terminal() => {
                        Ok(from)
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) if e.is_refusal() => {
                warn!(deposit_id = %id, error = %e, "Proof refused");
                self.correlator
                    .finish(id, Some(WorkflowError::ProofRejected(e.clone())));
                Err(WorkflowError::ProofRejected(e))
            }
            Err(e) => {
                warn!(deposit_id = %id, error = %e, "Proof submission failed");
                Err(WorkflowError::Transport(e))
            }
        }
    }

    /// Tell the server the outcome of the wallet transfer.
    ///
    /// Reporting a failed transfer settles the attempt as rejected.
    pub async fn report_deposit(
        &self,
        id: &DepositId,
        status: DepositStatus,
    ) -> Result<(), WorkflowError> {
        let state = self
            .correlator
            .state(id)
            .ok_or_else(|| WorkflowError::UnknownDeposit(id.clone()))?;
        if state.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                id: id.clone(),
                from: state,
                to: WorkflowState::Submitted,
            });
        }

        self.api
            .report_deposit(&DepositReport {
                deposit_status: status,
                deposit_id: id.clone(),
            })
            .await?;
        info!(deposit_id = %id, ?status, "Deposit reported");

        if status == DepositStatus::Rejected {
            self.correlator.resolve(id, DepositStatus::Rejected);
        }
        Ok(())
    }

    /// Apply a server verdict; see [`DepositCorrelator::resolve`].
    pub fn resolve(&self, id: &DepositId, status: DepositStatus) -> bool {
        self.correlator.resolve(id, status)
    }

    /// Settle submitted attempts that outlived the configured timeout.
    /// Without a timeout nothing ever expires.
    pub fn expire_stale(&self) -> Vec<DepositId> {
        match self.config.submission_timeout {
            Some(timeout) => self.correlator.expire_submitted(timeout, Instant::now()),
            None => Vec::new(),
        }
    }

    pub fn state(&self, id: &DepositId) -> Option<WorkflowState> {
        self.correlator.state(id)
    }

    pub fn records(&self) -> Vec<WorkflowRecord> {
        self.correlator.records()
    }
}

fn validate(request: &PaymentIntentRequest) -> Result<(), ValidationError> {
    if request.event_id.trim().is_empty() {
        return Err(ValidationError::EmptyEventId);
    }
    if request.collateral <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveCollateral(request.collateral));
    }
    if request.token.trim().is_empty() {
        return Err(ValidationError::EmptyToken);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{RefreshRequest, refresh_request_channel, RefreshRequestReceiver};
    use crate::test_support::{Call, MockApi, intent, refused};
    use std::time::Duration;

    struct FixedSigner;

    #[async_trait]
    impl ProofSigner for FixedSigner {
        async fn sign(&self, challenge: &ProofChallenge) -> Result<SignedProof, String> {
            Ok(SignedProof(serde_json::json!({ "signed": challenge.payload })))
        }
    }

    struct RefusingSigner;

    #[async_trait]
    impl ProofSigner for RefusingSigner {
        async fn sign(&self, _: &ProofChallenge) -> Result<SignedProof, String> {
            Err("user declined".to_string())
        }
    }

    fn workflow(
        api: Arc<MockApi>,
        config: WorkflowConfig,
    ) -> (ProofWorkflow<MockApi>, RefreshRequestReceiver) {
        let (tx, rx) = refresh_request_channel();
        (ProofWorkflow::new(api, DepositCorrelator::new(tx), config), rx)
    }

    async fn submitted(wf: &ProofWorkflow<MockApi>, event: &str) -> DepositHandle {
        let handle = wf
            .request_payment_intent(event, Decimal::ONE, "TokenA")
            .await
            .unwrap();
        wf.acquire_proof(handle.deposit_id(), &FixedSigner).await.unwrap();
        wf.submit_proof(handle.deposit_id()).await.unwrap();
        handle
    }

    #[tokio::test]
    async fn test_full_flow_approved_by_push() {
        let api = MockApi::new();
        api.push_intent(Ok(intent("D-1")));
        let (wf, mut refresh_rx) = workflow(api.clone(), WorkflowConfig::default());

        let handle = submitted(&wf, "E-1").await;
        let id = handle.deposit_id().clone();
        assert_eq!(wf.state(&id), Some(WorkflowState::Submitted));
        assert_eq!(
            api.calls().last(),
            Some(&Call::VerifyProof(SignedProof(serde_json::json!({ "signed": "challenge" }))))
        );

        assert!(wf.resolve(&id, DepositStatus::Approved));
        let record = handle.wait().await.unwrap();
        assert_eq!(record.state, WorkflowState::Approved);
        assert_eq!(record.request.event_id, "E-1");
        assert!(wf.records().is_empty());
        assert_eq!(refresh_rx.try_recv().unwrap(), RefreshRequest::deposit_approved(id));
    }

    #[tokio::test]
    async fn test_invalid_parameters_never_reach_server() {
        let api = MockApi::new();
        let (wf, _rx) = workflow(api.clone(), WorkflowConfig::default());

        let cases = [
            ("", Decimal::ONE, "TokenA", ValidationError::EmptyEventId),
            ("E", Decimal::ZERO, "TokenA", ValidationError::NonPositiveCollateral(Decimal::ZERO)),
            ("E", Decimal::ONE, "", ValidationError::EmptyToken),
        ];
        for (event, collateral, token, expected) in cases {
            let err = wf
                .request_payment_intent(event, collateral, token)
                .await
                .unwrap_err();
            assert_eq!(err, WorkflowError::Validation(expected));
        }
        assert!(api.calls().is_empty());
        assert!(wf.records().is_empty());
    }

    #[tokio::test]
    async fn test_refused_intent_is_payment_intent_error() {
        let api = MockApi::new();
        api.push_intent(Err(refused(400)));
        let (wf, _rx) = workflow(api, WorkflowConfig::default());

        let err = wf
            .request_payment_intent("E", Decimal::ONE, "TokenA")
            .await
            .unwrap_err();
        assert_eq!(err, WorkflowError::PaymentIntent(refused(400)));
        assert!(wf.records().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_attempts_are_independent() {
        let api = MockApi::new();
        api.push_intent(Ok(intent("D-1")));
        api.push_intent(Ok(intent("D-2")));
        let (wf, mut refresh_rx) = workflow(api, WorkflowConfig::default());

        let first = submitted(&wf, "E-1").await;
        let second = submitted(&wf, "E-2").await;

        assert!(wf.resolve(second.deposit_id(), DepositStatus::Rejected));
        assert_eq!(wf.state(first.deposit_id()), Some(WorkflowState::Submitted));
        assert_eq!(
            second.wait().await.unwrap_err(),
            WorkflowError::Rejected(DepositId::from("D-2"))
        );
        assert!(refresh_rx.try_recv().is_err());

        assert!(wf.resolve(first.deposit_id(), DepositStatus::Approved));
        assert!(first.wait().await.is_ok());
        assert!(refresh_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_non_matching_verdict_is_ignored() {
        let api = MockApi::new();
        api.push_intent(Ok(intent("D-1")));
        let (wf, mut refresh_rx) = workflow(api, WorkflowConfig::default());
        let handle = submitted(&wf, "E").await;

        assert!(!wf.resolve(&DepositId::from("D-404"), DepositStatus::Approved));
        assert_eq!(wf.state(handle.deposit_id()), Some(WorkflowState::Submitted));
        assert!(refresh_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_signer_failure_allows_retry() {
        let api = MockApi::new();
        let (wf, _rx) = workflow(api, WorkflowConfig::default());
        let handle = wf
            .request_payment_intent("E", Decimal::ONE, "TokenA")
            .await
            .unwrap();
        let id = handle.deposit_id().clone();

        let err = wf.acquire_proof(&id, &RefusingSigner).await.unwrap_err();
        assert_eq!(err, WorkflowError::Signer("user declined".to_string()));
        assert_eq!(wf.state(&id), Some(WorkflowState::IntentIssued));

        let record = wf.acquire_proof(&id, &FixedSigner).await.unwrap();
        assert_eq!(record.state, WorkflowState::ProofAcquired);
        assert!(record.proof.is_some());
    }

    #[tokio::test]
    async fn test_refused_proof_rejects_attempt() {
        let api = MockApi::new();
        api.fail_verification(refused(401));
        let (wf, _rx) = workflow(api, WorkflowConfig::default());
        let handle = wf
            .request_payment_intent("E", Decimal::ONE, "TokenA")
            .await
            .unwrap();
        let id = handle.deposit_id().clone();
        wf.acquire_proof(&id, &FixedSigner).await.unwrap();

        let err = wf.submit_proof(&id).await.unwrap_err();
        assert_eq!(err, WorkflowError::ProofRejected(refused(401)));
        assert_eq!(wf.state(&id), Some(WorkflowState::Rejected));
        assert_eq!(
            handle.wait().await.unwrap_err(),
            WorkflowError::ProofRejected(refused(401))
        );
    }

    #[tokio::test]
    async fn test_transient_submit_failure_keeps_proof() {
        let api = MockApi::new();
        api.fail_verification(refused(503));
        let (wf, _rx) = workflow(api, WorkflowConfig::default());
        let handle = wf
            .request_payment_intent("E", Decimal::ONE, "TokenA")
            .await
            .unwrap();
        let id = handle.deposit_id().clone();
        wf.acquire_proof(&id, &FixedSigner).await.unwrap();

        assert_eq!(
            wf.submit_proof(&id).await.unwrap_err(),
            WorkflowError::Transport(refused(503))
        );
        assert_eq!(wf.state(&id), Some(WorkflowState::ProofAcquired));
    }

    #[tokio::test]
    async fn test_submit_requires_acquired_proof() {
        let api = MockApi::new();
        let (wf, _rx) = workflow(api, WorkflowConfig::default());
        let handle = wf
            .request_payment_intent("E", Decimal::ONE, "TokenA")
            .await
            .unwrap();

        let err = wf.submit_proof(handle.deposit_id()).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition {
                from: WorkflowState::IntentIssued,
                to: WorkflowState::Submitted,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_reported_failure_settles_as_rejected() {
        let api = MockApi::new();
        api.push_intent(Ok(intent("D-9")));
        let (wf, _rx) = workflow(api.clone(), WorkflowConfig::default());
        let handle = wf
            .request_payment_intent("E", Decimal::ONE, "TokenB")
            .await
            .unwrap();

        wf.report_deposit(handle.deposit_id(), DepositStatus::Rejected)
            .await
            .unwrap();

        assert_eq!(
            api.calls().last(),
            Some(&Call::ReportDeposit(DepositReport {
                deposit_status: DepositStatus::Rejected,
                deposit_id: DepositId::from("D-9"),
            }))
        );
        assert_eq!(
            handle.wait().await.unwrap_err(),
            WorkflowError::Rejected(DepositId::from("D-9"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_stale_respects_timeout() {
        let api = MockApi::new();
        let config = WorkflowConfig {
            submission_timeout: Some(Duration::from_secs(30)),
        };
        let (wf, _rx) = workflow(api, config);
        let handle = submitted(&wf, "E").await;

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(wf.expire_stale().is_empty());

        tokio::time::advance(Duration::from_secs(25)).await;
        assert_eq!(wf.expire_stale(), vec![handle.deposit_id().clone()]);
        assert!(matches!(handle.wait().await, Err(WorkflowError::Expired(_))));
    }

    #[tokio::test]
    async fn test_dropping_settled_handle_releases_record() {
        let api = MockApi::new();
        api.push_intent(Ok(intent("D-1")));
        api.push_intent(Ok(intent("D-2")));
        let (wf, _rx) = workflow(api, WorkflowConfig::default());
        let settled = wf
            .request_payment_intent("E-1", Decimal::ONE, "TokenA")
            .await
            .unwrap();
        let pending = submitted(&wf, "E-2").await;

        assert!(wf.resolve(settled.deposit_id(), DepositStatus::Approved));
        assert_eq!(wf.state(settled.deposit_id()), Some(WorkflowState::Approved));
        drop(settled);
        assert_eq!(wf.state(&DepositId::from("D-1")), None);

        let pending_id = pending.deposit_id().clone();
        drop(pending);
        assert_eq!(wf.state(&pending_id), Some(WorkflowState::Submitted));
        assert!(wf.resolve(&pending_id, DepositStatus::Rejected));
        assert!(wf.records().is_empty());
    }

    #[tokio::test]
    async fn test_without_timeout_nothing_expires() {
        let api = MockApi::new();
        let (wf, _rx) = workflow(api, WorkflowConfig::default());
        let handle = submitted(&wf, "E").await;
        assert!(wf.expire_stale().is_empty());
        assert_eq!(wf.state(handle.deposit_id()), Some(WorkflowState::Submitted));
    }
}
