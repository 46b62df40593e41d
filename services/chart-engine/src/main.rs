//!
//! src/main.rs  Andrew Belles  Oct 9th, 2026
//!
//! Daemon entry point: warms the FLO cache then refreshes it at the top
//! of every hour until ctrl-c
//!

use std::sync::Arc;

use chart_engine::{config, logging, scheduler, ChartEngine, ChartError};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), ChartError> {
    let cfgs   = config::load_config()?;
    let _guard = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service="chart-engine",
        version=%env!("CARGO_PKG_VERSION"),
        "starting"
    );
    tracing::debug!(config=?cfgs, "configuration");

    let engine = Arc::new(ChartEngine::new(&cfgs)?);

    match engine.flo_chart(None).await {
        Ok(entries) => tracing::info!(entries = entries.len(), "flo.warm"),
        Err(e) => tracing::warn!(error = %e, "flo.warm.failed")
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "signal.listen.failed");
        }
        tracing::info!("shutdown requested");
        signal.cancel();
    });

    scheduler::run_hourly(engine, shutdown).await;
    Ok(())
}
