//! bonusmart: loyalty points back-office
//!
//! Long-running service that:
//! - registers users and authenticates them with a cookie-bound JWT
//! - admits purchase order numbers into a per-user points ledger
//! - reconciles unfinished orders against the external accrual system
//! - pays points out against new order numbers, never below zero

mod accrual;
mod api;
mod auth;
mod config;
mod db;
mod error;
mod luhn;
mod models;
mod service;
mod state;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use accrual::AccrualClient;
use config::Config;
use state::AppState;
use worker::ReconcileWorker;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How long in-flight work may keep draining after the shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = Config::load()?;

    tracing::info!(
        env = %config.environment,
        address = %config.address,
        "starting bonusmart"
    );

    let state = AppState::new(&config).await?;
    let accrual: Arc<dyn accrual::AccrualApi> =
        Arc::new(AccrualClient::new(config.accrual_system_address.clone())?);

    // Root cancellation token: signal handler, HTTP server and the
    // reconciliation pool all hang off it.
    let shutdown = CancellationToken::new();

    let reconciler = ReconcileWorker::new(
        state.pool.clone(),
        Arc::clone(&accrual),
        config.poll_interval,
        config.worker_count,
        shutdown.clone(),
    );
    let reconciler_handle = tokio::spawn(reconciler.run());

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");
        signal_token.cancel();
    });

    let listener = tokio::net::TcpListener::bind(&config.address).await?;
    tracing::info!("listening on {}", config.address);

    let server_token = shutdown.clone();
    let result = axum::serve(listener, api::create_router(state))
        .with_graceful_shutdown(async move { server_token.cancelled().await })
        .await;

    // A server error takes the reconciliation pool down with it.
    shutdown.cancel();
    if tokio::time::timeout(SHUTDOWN_GRACE, reconciler_handle)
        .await
        .is_err()
    {
        tracing::warn!("reconciliation pool did not stop within the grace period");
    }

    tracing::info!("shutdown complete");
    result.map_err(Into::into)
}

fn init_tracing() {
    let development = std::env::var("ENV")
        .map(|env| env == "development")
        .unwrap_or(true);
    let default_filter = if development {
        "bonusmart=debug,tower_http=info"
    } else {
        "bonusmart=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
