use anyhow::{Context, Result};
use tracing::info;
use tuneshelf::app::build_router;
use tuneshelf::config::AppConfig;
use tuneshelf::credentials::TokenCipher;
use tuneshelf::db;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tuneshelf=info".into()),
        )
        .init();

    info!("Tuneshelf starting...");

    let config = AppConfig::load()?;

    let encryption_key = std::env::var("TUNESHELF_ENCRYPTION_KEY")
        .context("TUNESHELF_ENCRYPTION_KEY is required (base64-encoded 32-byte key)")?;
    let cipher = TokenCipher::from_base64_key(&encryption_key)
        .context("Invalid TUNESHELF_ENCRYPTION_KEY")?;

    if config.spotify.client_id.is_empty() || config.spotify.client_secret.is_empty() {
        tracing::warn!("Spotify client credentials not configured, OAuth exchange will fail");
    }

    info!(
        bind_addr = %config.server.bind_addr,
        db_path = %config.database.path,
        api_base_url = %config.spotify.api_base_url,
        "Configuration loaded"
    );

    let conn = db::open(&config.database.path).context("Failed to open database")?;
    info!("Database initialized");

    let router = build_router(&config, conn, cipher)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(bind_addr = %config.server.bind_addr, "HTTP API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("Tuneshelf stopped");

    Ok(())
}
