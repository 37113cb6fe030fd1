use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use dcf_valuation::api::{build_router, AppState};
use dcf_valuation::config::AppConfig;
use dcf_valuation::services::make_financial_data_provider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    // Initialize services
    let provider = make_financial_data_provider(&config.data_source)?;
    let address = config.server.bind_address();
    let app = build_router(AppState::new(provider, config));

    // Start server
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("DCF valuation service starting on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
