use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kdrama_api::api::{create_router, AppState, SearchSettings};
use kdrama_api::config::{Config, TrendingBackend};
use kdrama_api::db::{
    create_pool, create_redis_client, run_migrations, AppwriteSettings, AppwriteTrendingStore,
    MemoryTrendingStore, PgTrendingStore, RedisTrendingStore, TrendingStore,
};
use kdrama_api::services::{TmdbProvider, TrendingRecorder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kdrama_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(backend = ?config.trending_backend, "Configuration loaded");

    let store = build_store(&config).await?;
    tracing::info!(store = store.name(), "Trending store ready");

    let provider = TmdbProvider::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_timeout(),
    )?;

    let (recorder, recorder_handle) =
        TrendingRecorder::new(store.clone(), config.tmdb_image_base_url.clone());

    let settings = SearchSettings {
        debounce: config.search_debounce(),
        trending_limit: config.trending_limit,
        session_idle: config.session_idle(),
    };
    let state = AppState::new(Arc::new(provider), store, recorder, settings);
    let sweeper = state.spawn_session_sweeper();
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    recorder_handle.shutdown().await;
    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn TrendingStore>> {
    let store: Arc<dyn TrendingStore> = match config.trending_backend {
        TrendingBackend::Memory => Arc::new(MemoryTrendingStore::new()),
        TrendingBackend::Redis => {
            let client = create_redis_client(&config.redis_url)?;
            Arc::new(RedisTrendingStore::new(client))
        }
        TrendingBackend::Postgres => {
            let pool = create_pool(&config.database_url).await?;
            run_migrations(&pool).await?;
            Arc::new(PgTrendingStore::new(pool))
        }
        TrendingBackend::Appwrite => {
            // validate() guarantees the ids are present
            let settings = AppwriteSettings {
                endpoint: config.appwrite_endpoint.clone(),
                project_id: config.appwrite_project_id.clone().unwrap_or_default(),
                database_id: config.appwrite_database_id.clone().unwrap_or_default(),
                collection_id: config.appwrite_collection_id.clone().unwrap_or_default(),
                api_key: config.appwrite_api_key.clone(),
            };
            Arc::new(AppwriteTrendingStore::new(settings))
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
