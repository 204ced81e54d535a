use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, DEFAULT_REST_ADDR, REST_ADDR_ENV, router};
use referrals_core::ReferralService;
use referrals_core::config::core_config_from_env;

/// Main entry point for the referrals service
///
/// Loads `.env` if present, resolves configuration once, and serves the REST API.
///
/// # Environment Variables
/// - `REFERRALS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `REFERRAL_DATA_DIR`: Directory for referral documents (default: "referral_data")
/// - `EREFERRALS_BASE_URL`, `EREFERRALS_CREATE_REFERRAL_ENDPOINT`, `DENTAL_UI_BASE_URL`:
///   endpoints written into synthesized bundles (required)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("referrals=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("referrals_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var(REST_ADDR_ENV).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    let cfg = Arc::new(core_config_from_env()?);
    std::fs::create_dir_all(cfg.referral_data_dir())?;

    tracing::info!("++ Starting Referrals REST on {}", rest_addr);
    tracing::info!(
        "++ Storing referrals under {}",
        cfg.referral_data_dir().display()
    );

    let app = router(AppState::new(ReferralService::file_backed(cfg)));

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
