use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wayfarer_api::{app, AppState};
use wayfarer_core::DocumentStore;
use wayfarer_store::{app_config::Config, MemoryDocumentStore, PgDocumentStore, RedisClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfarer_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting Wayfarer API on port {}", config.server.port);

    // Document store
    let store: Arc<dyn DocumentStore> = match config.database.url.as_deref() {
        Some(url) => {
            let store = PgDocumentStore::connect(url, config.database.max_connections)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            tracing::info!("Connected to Postgres");
            Arc::new(store)
        }
        None => {
            tracing::warn!("database.url not set, using the in-memory store; data will not survive a restart");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    // Redis connection, optional
    let redis = match config.redis.url.as_deref() {
        Some(url) => match RedisClient::new(url).await {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!("Redis unavailable, rate limiting disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let app = app(AppState::from_config(store, redis, &config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
