//! Tourbook server: loads `.env`, builds the store and payment client, serves the API.

use std::sync::Arc;
use tokio::net::TcpListener;
use tourbook::{
    app, apply_migrations, AppState, Config, DocumentStore, MemoryStore, Models, PgStore,
    StorageKind, StripeClient,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tourbook=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let store = build_store(&config).await?;
    if config.stripe_secret_key.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY is not set; checkout sessions will fail");
    }
    let payments = StripeClient::new(
        config.stripe_api_base.clone(),
        config.stripe_secret_key.clone(),
        config.stripe_timeout_seconds,
    )?;
    let state = AppState::new(store, Arc::new(payments));
    let router = app(state, config.body_limit_bytes);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn build_store(config: &Config) -> Result<Arc<dyn DocumentStore>, Box<dyn std::error::Error>> {
    match config.storage {
        StorageKind::Memory => {
            tracing::info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageKind::Postgres => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(&config.database_url)
                .await?;
            let models = Models::new();
            let schemas: Vec<_> = models.all().into_iter().map(|s| &**s).collect();
            apply_migrations(&pool, &config.database_schema, &schemas).await?;
            tracing::info!(schema = %config.database_schema, "migrations applied");
            Ok(Arc::new(PgStore::new(pool, config.database_schema.clone())))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
