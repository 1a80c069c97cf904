//! Signal handling for graceful shutdown and config reload.

use std::sync::Arc;

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Notify;

use crate::app::MarketFeed;
use crate::config::ConfigLoader;

/// Completes when SIGTERM or SIGINT (Ctrl+C) is received.
pub async fn shutdown_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
    Ok(())
}

/// Spawns a task that reloads the configuration on SIGHUP.
///
/// Only the feed tag is applied live; endpoint, account and log settings
/// need a restart. Returns a Notify that stops the task.
pub fn spawn_config_reload_handler(
    feed: Arc<MarketFeed>,
    config_loader: Arc<ConfigLoader>,
) -> std::io::Result<Arc<Notify>> {
    let shutdown_notify = Arc::new(Notify::new());
    let shutdown_notify_clone = shutdown_notify.clone();
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    tracing::info!(path = ?config_loader.config_path(), "Received SIGHUP, reloading configuration");
                    match config_loader.reload() {
                        Ok(loaded) => {
                            let tag = loaded.engine.feed.default_tag;
                            if feed.catalog().feed().tag != tag {
                                let outcome = feed.change_tag(tag).await;
                                tracing::info!(%tag, ?outcome, "Feed switched to reloaded tag");
                            }
                            tracing::info!("Configuration reloaded successfully");
                        }
                        Err(e) => {
                            tracing::error!("Failed to reload configuration: {}", e);
                        }
                    }
                }
                _ = shutdown_notify_clone.notified() => {
                    tracing::debug!("Config reload handler shutting down");
                    break;
                }
            }
        }
    });

    Ok(shutdown_notify)
}
