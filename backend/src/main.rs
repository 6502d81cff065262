use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use brainquest_backend::{config::ServerConfig, create_router, initialize_backend};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::load()?;
    let app_state = initialize_backend(&config).await?;

    match config.purge_interval() {
        Some(interval) => {
            app_state.sweeper().spawn(interval);
        }
        None => info!("Expiry sweeper disabled"),
    }

    let app = create_router(app_state, &config.cors_origin)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
