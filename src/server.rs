//! Runtime setup for the `mail-tracker` binary.
//!
//! Builds the tracker from environment configuration and serves until
//! Ctrl-C / SIGTERM.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::domain::open_handler::OpenHandler;
use crate::tracker::Tracker;

/// Runs the tracker with the given configuration and callback.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration is rejected by [`Tracker::new`]
/// - The listener cannot be bound
/// - The server fails while running
pub async fn run<H>(config: &Config, handler: H) -> Result<()>
where
    H: OpenHandler + Send + Sync + 'static,
{
    let tracker = Tracker::new(config.tracker_config(), handler)
        .context("Failed to build tracker")?;

    tracker
        .start_with_shutdown(shutdown_signal())
        .await
        .context("Tracker stopped with an error")?;

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
