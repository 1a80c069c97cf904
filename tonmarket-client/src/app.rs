//! Wiring of the engine components around one `MarketClient`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tonmarket_core::account::{AccountProjection, BalanceSource};
use tonmarket_core::events::{
    PushFrameSender, RefreshRequestReceiver, push_frame_channel, refresh_request_channel,
};
use tonmarket_core::feed::{FeedPaginator, LoadOutcome};
use tonmarket_core::processors::{DepositReaper, ProjectionRefresher, PushIngestor};
use tonmarket_core::store::SharedCatalog;
use tonmarket_core::workflow::{DepositCorrelator, ProofWorkflow};
use tonmarket_sdk::client::{MarketClient, PushSubscription};
use tracing::{info, warn};
use url::Url;

use crate::config::LoadedConfig;
use crate::config::file::BalanceSourceKind;

pub type MarketFeed = FeedPaginator<MarketClient>;

/// All engine components, owned by `main`.
pub struct App {
    pub catalog: SharedCatalog,
    pub feed: Arc<MarketFeed>,
    pub workflow: Arc<ProofWorkflow<MarketClient>>,
    pub account: Arc<AccountProjection<MarketClient>>,
    config: LoadedConfig,
    correlator: DepositCorrelator,
    refresh_rx: RefreshRequestReceiver,
}

impl App {
    pub fn new(config: LoadedConfig) -> Self {
        let client = MarketClient::new(config.endpoints.api_url.clone());
        if let Some(token) = &config.endpoints.bearer_token {
            client.set_auth_token(Some(token.clone()));
        }
        let api = Arc::new(client);

        let catalog = SharedCatalog::new();
        let (refresh_tx, refresh_rx) = refresh_request_channel();
        let correlator = DepositCorrelator::new(refresh_tx);

        let feed = FeedPaginator::new(api.clone(), catalog.clone()).with_on_loaded(|outcome| {
            if let LoadOutcome::Failed { page, tag, error } = outcome {
                warn!(page, %tag, %error, "Feed page could not be loaded");
            }
        });
        let workflow = ProofWorkflow::new(api.clone(), correlator.clone(), config.engine.workflow);
        let source = match config.account.balance_source {
            BalanceSourceKind::Server => BalanceSource::Server,
            BalanceSourceKind::Disabled => BalanceSource::Disabled,
        };
        let account = AccountProjection::new(api, source);
        if let Some(address) = &config.account.address {
            account.set_address(address.clone());
        }

        Self {
            catalog,
            feed: Arc::new(feed),
            workflow: Arc::new(workflow),
            account: Arc::new(account),
            config,
            correlator,
            refresh_rx,
        }
    }

    /// Spawn the processors and, when configured, the push channel.
    pub fn spawn_processors(self, shutdown_rx: watch::Receiver<bool>) -> Running {
        let (frame_tx, frame_rx) = push_frame_channel();
        let mut tasks = Vec::new();

        let ingestor = PushIngestor::new(self.catalog.clone(), self.correlator.clone());
        tasks.push(tokio::spawn(ingestor.run(shutdown_rx.clone(), frame_rx)));

        let refresher = ProjectionRefresher::new(self.account.clone());
        tasks.push(tokio::spawn(refresher.run(shutdown_rx.clone(), self.refresh_rx)));

        if let Some(timeout) = self.config.engine.workflow.submission_timeout {
            let reaper = DepositReaper::new(self.workflow.clone(), timeout);
            tasks.push(tokio::spawn(reaper.run(shutdown_rx.clone())));
        }

        match self.config.endpoints.push_url.clone() {
            Some(url) => tasks.push(tokio::spawn(run_push_channel(
                url,
                frame_tx,
                self.config.endpoints.reconnect_delay,
                shutdown_rx,
            ))),
            None => warn!("No push_url configured, live updates and deposit verdicts are disabled"),
        }

        Running {
            catalog: self.catalog,
            feed: self.feed,
            workflow: self.workflow,
            account: self.account,
            tasks,
        }
    }
}

/// Components after the processors have been started.
pub struct Running {
    pub catalog: SharedCatalog,
    pub feed: Arc<MarketFeed>,
    pub workflow: Arc<ProofWorkflow<MarketClient>>,
    pub account: Arc<AccountProjection<MarketClient>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Running {
    /// Wait for every spawned task after shutdown was signalled.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
    }
}

/// Keep the push channel connected, reconnecting after `reconnect_delay`
/// whenever it drops.
async fn run_push_channel(
    url: Url,
    frame_tx: PushFrameSender,
    reconnect_delay: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let connected = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            connected = PushSubscription::connect(&url, frame_tx.clone()) => connected,
        };

        match connected {
            Ok(mut subscription) => {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    closed = subscription.closed() => match closed {
                        Ok(()) => info!("Push channel closed"),
                        Err(e) => warn!(error = %e, "Push channel failed"),
                    },
                }
            }
            Err(e) => warn!(%url, error = %e, "Failed to connect push channel"),
        }

        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            _ = tokio::time::sleep(reconnect_delay) => {
                info!(%url, "Reconnecting push channel");
            }
        }
    }
    info!("Push channel task stopped");
}
