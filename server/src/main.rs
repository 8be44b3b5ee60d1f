use std::sync::Arc;

use shortlinks::{config, create_router, db, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent — env vars may already be set)
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shortlinks=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting shortlinks on {}:{}", config.host, config.port);
    tracing::info!("Domains: {:?}", config.domains);
    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; suggestions will fail");
    }

    // Open SQLite connection pool and apply migrations
    let db = db::connect(&config.database_url).await?;

    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(db, config));
    let app = create_router(state);

    // ── Serve ──────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
