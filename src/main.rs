use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shortly::registry::Registry;
use shortly::store::PgLinkStore;
use shortly::{config, db, routes, AppState};

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent — env vars may already be set)
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shortly=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting Shortly on {}:{}", config.host, config.port);
    tracing::info!("Base URL: {}", config.base_url);

    // Open the Postgres pool; the database may still be coming up, so this
    // retries within the configured budget and is fatal past it.
    let pool = db::connect_with_retry(&config).await?;

    // Idempotent schema setup — safe for concurrently starting workers
    let store = PgLinkStore::new(pool);
    store.ensure_schema().await?;
    tracing::info!("Database schema ready");

    // Build shared state
    let registry = Registry::new(Arc::new(store));
    let state = Arc::new(AppState {
        registry,
        config: config.clone(),
    });

    let app = routes::build_router(state);

    // ── Serve ──────────────────────────────────────────────────────────────
    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
