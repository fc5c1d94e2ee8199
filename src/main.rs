use copyworx_api::config::config;
use copyworx_api::{app, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, ANTHROPIC_API_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config().clone();
    tracing::info!("Starting CopyWorx API in {:?} mode", config.environment);
    if config.auth.jwt_secret.is_none() {
        tracing::warn!("AUTH_JWT_SECRET not set; every protected route will answer 401");
    }

    let port = config.server.port;
    let state = AppState::from_config(config)?;
    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("CopyWorx API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
