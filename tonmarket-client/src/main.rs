//! TON Market client
//!
//! Keeps a live view of the prediction market catalog and the user's account,
//! and drives deposits through the payment workflow.

mod app;
mod config;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use app::{App, Running};
use clap::{Parser, Subcommand};
use config::ConfigLoader;
use config::file::LogFormat;
use rust_decimal::Decimal;
use shutdown::{shutdown_signal, spawn_config_reload_handler};
use tokio::sync::watch;
use tonmarket_sdk::objects::catalog::TagId;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Number of events logged after each catalog change.
const TOP_EVENTS: usize = 10;

/// TON Market - prediction market client
#[derive(Parser, Debug)]
#[command(name = "tonmarket-client")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "TONMARKET_CONFIG", default_value = "./tonmarket.toml")]
    config: PathBuf,

    /// Override the tag loaded on startup (0 Politics .. 5 All)
    #[arg(short, long)]
    tag: Option<i32>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the catalog and the account until interrupted (default)
    Watch {
        /// Additional pages to load after the first one
        #[arg(long, default_value_t = 0)]
        pages: u32,
    },
    /// Request a payment intent and wait for its verdict
    Pay {
        #[arg(long)]
        event: String,
        /// Collateral in TON
        #[arg(long)]
        collateral: Decimal,
        /// Settlement token of the chosen wager (e.g. TokenA)
        #[arg(long)]
        token: String,
    },
    /// Unlink the wallet on the server
    Disconnect,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.tag.map(TagId)));
    let loaded_config = config_loader.load()?;
    init_tracing(loaded_config.log_format);

    tracing::info!("Starting tonmarket-client v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Configuration loaded from {:?}", args.config);

    let default_tag = loaded_config.engine.feed.default_tag;
    let app = App::new(loaded_config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let running = app.spawn_processors(shutdown_rx);

    let result = match args.command.unwrap_or(Command::Watch { pages: 0 }) {
        Command::Watch { pages } => watch_market(&running, config_loader, default_tag, pages).await,
        Command::Pay {
            event,
            collateral,
            token,
        } => pay(&running, event, collateral, token).await,
        Command::Disconnect => running.account.disconnect().await.map_err(Into::into),
    };

    let _ = shutdown_tx.send(true);
    running.join().await;
    tracing::info!("Client shutdown complete");
    result
}

async fn watch_market(
    running: &Running,
    config_loader: Arc<ConfigLoader>,
    tag: TagId,
    extra_pages: u32,
) -> anyhow::Result<()> {
    if let Err(e) = running.feed.load_tags().await {
        tracing::warn!(error = %e, "Failed to load tags");
    }
    running.feed.change_tag(tag).await;
    for _ in 0..extra_pages {
        if running.feed.next_page().await.is_none() {
            break;
        }
    }
    log_ranked(running);

    if let Err(e) = running.account.refresh().await {
        tracing::warn!(error = %e, "Failed to load account");
    }
    log_account(running);

    let reload_notify = spawn_config_reload_handler(running.feed.clone(), config_loader)?;
    let mut catalog_watcher = running.catalog.subscribe();
    let mut account_rx = running.account.subscribe();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal?;
                break;
            }
            Ok(()) = catalog_watcher.changed() => log_ranked(running),
            Ok(()) = account_rx.changed() => log_account(running),
        }
    }

    reload_notify.notify_one();
    Ok(())
}

async fn pay(
    running: &Running,
    event: String,
    collateral: Decimal,
    token: String,
) -> anyhow::Result<()> {
    let handle = running
        .workflow
        .request_payment_intent(event, collateral, token)
        .await?;
    let instructions = handle.instructions();
    tracing::info!(
        deposit_id = %handle.deposit_id(),
        address = %instructions.address,
        amount_nanotons = %instructions.amount,
        payload = %instructions.payload,
        "Send this transfer from your wallet, then wait for the verdict"
    );

    tokio::select! {
        outcome = handle.wait() => {
            let record = outcome?;
            tracing::info!(deposit_id = %record.deposit_id, "Deposit approved");
        }
        signal = shutdown_signal() => {
            signal?;
            tracing::warn!("Interrupted before the deposit was settled");
        }
    }
    Ok(())
}

fn log_ranked(running: &Running) {
    let feed = running.catalog.feed();
    for (rank, event) in running.catalog.ranked().iter().take(TOP_EVENTS).enumerate() {
        tracing::info!(
            rank = rank + 1,
            id = %event.id,
            collateral = %event.collateral,
            title = %event.title,
            "Event"
        );
    }
    tracing::info!(
        tag = %feed.tag,
        page = feed.page,
        pages = feed.pages,
        failed = feed.failed,
        "Catalog"
    );
}

fn log_account(running: &Running) {
    let snapshot = running.account.snapshot();
    tracing::info!(
        address = ?snapshot.address,
        balance = ?snapshot.balance,
        positions = snapshot.assets.len(),
        total = %snapshot.total,
        "Account"
    );
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,tokio_tungstenite=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}
