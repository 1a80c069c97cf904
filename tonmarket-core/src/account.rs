//! Account projection: the user's held positions and wallet balance.
//!
//! The projection is only ever re-derived from the server, either on demand
//! or when a deposit approval asks for it. It is never patched locally.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tonmarket_sdk::objects::account::Position;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::transport::PullApi;

/// Scale of the nanoton amounts reported by the server.
const NANOTON_SCALE: u32 = 9;

/// Balance lookup performed by the wallet integration, in TON.
#[async_trait]
pub trait WalletBalance: Send + Sync {
    async fn balance(&self, address: &str) -> Result<Decimal, TransportError>;
}

/// Where the balance shown in the projection comes from.
#[derive(Clone, Default)]
pub enum BalanceSource {
    /// The `get-address` endpoint, reported in nanotons.
    #[default]
    Server,
    /// An external provider, typically the connected wallet.
    Wallet(Arc<dyn WalletBalance>),
    /// The balance is never looked up and stays unknown.
    Disabled,
}

impl std::fmt::Debug for BalanceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BalanceSource::Server => f.write_str("Server"),
            BalanceSource::Wallet(_) => f.write_str("Wallet"),
            BalanceSource::Disabled => f.write_str("Disabled"),
        }
    }
}

/// Read-only view of the account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub address: Option<String>,
    /// Balance in TON; `None` while unknown.
    pub balance: Option<Decimal>,
    pub assets: Vec<Position>,
    /// Total staked across all positions, as formatted by the server.
    pub total: String,
}

/// Owns the account state and re-derives it from the server.
pub struct AccountProjection<P: ?Sized> {
    api: Arc<P>,
    source: BalanceSource,
    state_tx: watch::Sender<AccountSnapshot>,
    /// Bumped on every address change so that refreshes started before it
    /// are discarded.
    generation: AtomicU64,
}

impl<P: PullApi + ?Sized> AccountProjection<P> {
    pub fn new(api: Arc<P>, source: BalanceSource) -> Self {
        let (state_tx, _) = watch::channel(AccountSnapshot::default());
        Self {
            api,
            source,
            state_tx,
            generation: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        self.state_tx.borrow().clone()
    }

    /// Watch the projection; the receiver sees every applied change.
    pub fn subscribe(&self) -> watch::Receiver<AccountSnapshot> {
        self.state_tx.subscribe()
    }

    /// Associate a wallet address. The cached balance is dropped until the
    /// next refresh.
    pub fn set_address(&self, address: impl Into<String>) {
        let address = address.into();
        self.generation.fetch_add(1, Ordering::SeqCst);
        info!(%address, "Account address set");
        self.state_tx.send_modify(|state| {
            state.address = Some(address);
            state.balance = None;
        });
    }

    /// Re-read positions and balance from the server.
    ///
    /// The new values are applied together or not at all. A refresh that
    /// overlaps an address change or a disconnect is discarded.
    pub async fn refresh(&self) -> Result<AccountSnapshot, TransportError> {
        let generation = self.generation.load(Ordering::SeqCst);
        let address = self.state_tx.borrow().address.clone();

        let assets = self.api.list_assets().await?;
        let balance = match &address {
            Some(address) => self.fetch_balance(address).await?,
            None => None,
        };

        let applied = self.state_tx.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            state.assets = assets.asset_list;
            state.total = assets.total_in_market;
            state.balance = balance;
            true
        });
        if applied {
            debug!(positions = self.state_tx.borrow().assets.len(), "Account projection refreshed");
        } else {
            debug!("Account changed during refresh, result discarded");
        }
        Ok(self.snapshot())
    }

    async fn fetch_balance(&self, address: &str) -> Result<Option<Decimal>, TransportError> {
        match &self.source {
            BalanceSource::Server => {
                let info = self.api.account_info().await?;
                Ok(Some(Decimal::new(info.balance, NANOTON_SCALE)))
            }
            BalanceSource::Wallet(provider) => provider.balance(address).await.map(Some),
            BalanceSource::Disabled => Ok(None),
        }
    }

    /// Unlink the wallet on the server.
    ///
    /// Local state is reset even when the server call fails; the error is
    /// still returned.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        let result = self.api.disconnect_wallet().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state_tx.send_replace(AccountSnapshot::default());
        info!(server_ack = result.is_ok(), "Wallet disconnected");
        result
    }
}
