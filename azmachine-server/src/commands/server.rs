use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::api::{self, AppState};
use crate::backend::Backend;
use crate::config::Config;

pub async fn run_serve_mode(port: Option<u16>) -> Result<()> {
    let config = Config::load()?;
    let port = port.unwrap_or(config.server_port);

    tracing::info!("Starting azmachine API");
    tracing::info!("Backend: {:?}", config.backend);
    tracing::info!("API port: {}", port);

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    let shutdown = CancellationToken::new();
    let state = AppState {
        backend: Backend::from_config(&config)?,
        shutdown: shutdown.clone(),
        metrics,
    };

    tracing::info!("✓ azmachine server ready");
    tracing::info!("  API: http://{}:{}", config.server_host, port);
    tracing::info!("  Press Ctrl+C to stop");

    api::start_server(&config.server_host, port, state, shutdown_signal(shutdown)).await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM after cancelling every in-flight request
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }

    tracing::info!("Shutting down, cancelling in-flight requests...");
    cancel.cancel();
}
