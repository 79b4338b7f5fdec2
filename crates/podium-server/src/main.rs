//! Podium server entry point.

use std::sync::Arc;

use podium_core::clock::SystemClock;
use podium_orchestration::{PodiumRuntime, RuntimeOptions};
use podium_server::bootstrap::demo_matchmaking;
use podium_server::config::ServerConfig;
use podium_server::error::AppError;
use podium_server::{stores, telemetry};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = ServerConfig::from_env()?;
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Podium session orchestrator");

    let stores = stores::open(&config).await?;
    let runtime = PodiumRuntime::start(
        stores,
        Arc::new(SystemClock),
        RuntimeOptions {
            timings: config.timings,
            ..RuntimeOptions::default()
        },
        CancellationToken::new(),
    )?;
    runtime.recover().await?;

    if config.demo_players > 0 {
        demo_matchmaking(&runtime, config.demo_players).await?;
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    runtime.shutdown().await;
    telemetry.shutdown()
}
