use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use agora_engine::EngineConfig;
use agora_server::{AppState, router};
use agora_types::SystemClock;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state_dir = std::env::var("AGORA_STATE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    let config = EngineConfig::load(&state_dir)?;

    let state = AppState::new(config.clone(), Arc::new(SystemClock));
    let engine = state.engine.clone();
    let shutdown = state.shutdown.clone();

    let cadence = Duration::from_secs(config.min_tick_interval_secs.max(1) as u64);
    let loop_handle = tokio::spawn(async move { engine.run(cadence).await });

    let addr: SocketAddr = std::env::var("AGORA_LISTEN_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "agora server listening");

    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    let _ = shutdown.send(true);
    let _ = loop_handle.await;
    Ok(())
}
