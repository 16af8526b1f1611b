mod app;
mod config;
mod dataset;
mod routes;
mod state;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::dataset::DamageDataset;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let data_dir = config::data_dir();
    tracing::info!(data_dir = %data_dir.display(), "Loading damage dataset...");
    let dataset = match tokio::task::spawn_blocking(move || DamageDataset::load(&data_dir)).await {
        Ok(Ok(dataset)) => dataset,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "failed to load damage dataset");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "dataset loader task panicked");
            return;
        }
    };

    let summary = dataset.summary();
    if summary.has_discrepancy() {
        tracing::warn!(
            total_buildings = summary.total_buildings,
            counted = summary.counted_total(),
            "category counts do not add up to the building total"
        );
    }

    let app = app::build_app(AppState::new(dataset));

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!("Dominica damage API listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
