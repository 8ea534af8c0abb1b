use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use shopee_scrape_web::{
    config::Config,
    api::routes::create_router,
    scraper::ShopeeScraper,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config = Config::load()?;
    let server_addr = config.server_addr;

    let scraper = Arc::new(ShopeeScraper::new(config.shopee_base_url.clone()));
    let app_state = AppState::new(config, scraper)?;
    tracing::info!(dir = %app_state.store.root().display(), "result store ready");

    // Build the router with routes
    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;
    tracing::info!(%server_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
