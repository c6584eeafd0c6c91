//! `orderbot serve`: webhook server plus the idle-conversation sweeper.

use std::time::Duration;

use anyhow::Result;
use console::style;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use orderbot_core::conversation::ConversationStore;

use crate::http::router::build_router;
use crate::state::AppState;

pub async fn serve(state: AppState, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} orderbot listening on {}",
        style("⚡").bold(),
        style(format!("http://{addr}")).cyan()
    );
    println!("  {}", style("Press Ctrl+C to stop").dim());
    info!(%addr, provider = state.orchestrator.provider().name(), "Server started");

    let sweep_every = Duration::from_secs(state.config.conversation.sweep_interval_secs.max(1));
    let sweeper = spawn_idle_sweeper(state.orchestrator.store().clone(), sweep_every);

    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    println!("\n  Server stopped.");
    Ok(())
}

/// Periodically drop conversations idle past the store's TTL.
pub fn spawn_idle_sweeper(store: ConversationStore, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = store.evict_idle();
            if evicted > 0 {
                info!(evicted, remaining = store.len(), "Evicted idle conversations");
            }
        }
    })
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use orderbot_core::conversation::StoreConfig;
    use orderbot_types::conversation::Turn;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_idle_conversations() {
        let store = ConversationStore::new(StoreConfig {
            max_conversations: 10,
            idle_ttl: Duration::from_secs(60),
            max_history: 20,
        });
        store.append("u1", Turn::user("hi")).await;

        let sweeper = spawn_idle_sweeper(store.clone(), Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(store.contains("u1"));

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(!store.contains("u1"));

        sweeper.abort();
    }
}
