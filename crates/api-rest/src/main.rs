//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development when the environment is already set; the workspace's main
//! `referrals-run` binary also loads a `.env` file before serving.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState, DEFAULT_REST_ADDR, REST_ADDR_ENV};
use referrals_core::config::core_config_from_env;
use referrals_core::ReferralService;

/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - a required environment variable is missing,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var(REST_ADDR_ENV).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    let cfg = Arc::new(core_config_from_env()?);
    tracing::info!(
        "-- Starting Referrals REST API on {} (data dir {})",
        addr,
        cfg.referral_data_dir().display()
    );

    let state = AppState::new(ReferralService::file_backed(cfg));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
