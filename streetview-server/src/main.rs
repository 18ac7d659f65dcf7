//! Streetview Server - HTTP API for street-level imagery by coordinate
//!
//! - GET /v1/street-view - JPEG for a latitude/longitude pair
//! - GET /health - Health check
//! - GET /api-docs/openapi.json - OpenAPI document

use std::sync::Arc;

use streetview_core::{
    CachedImages, ConnectionFactory, ElasticsearchSink, FileSink, GetStreetViewImageHandler,
    LogBackend, LoggingChain, MemoryConnectionFactory, RedisConnectionFactory, ReqwestTransport,
    StreetViewClient,
};
use streetview_server::{create_router, AppState, CacheStore, Config};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("streetview_server=info,streetview_core=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(?config, "Configuration loaded");

    let elasticsearch = ElasticsearchSink::new(config.elasticsearch.clone(), &config.env)?;
    let backup = FileSink::open(&config.backup_log_file, &config.env)?;
    tracing::info!(path = %backup.path().display(), "Backup log file opened");

    let logger = Arc::new(LoggingChain::new(vec![
        Arc::new(elasticsearch) as Arc<dyn LogBackend>,
        Arc::new(backup) as Arc<dyn LogBackend>,
    ]));

    let factory: Arc<dyn ConnectionFactory> = match config.cache_store {
        CacheStore::Redis => Arc::new(RedisConnectionFactory::new(config.redis.clone())),
        CacheStore::Memory => {
            tracing::warn!("Cache store: in-process memory, entries are lost on restart");
            Arc::new(MemoryConnectionFactory::new())
        }
    };
    let images = CachedImages::new(factory, Arc::clone(&logger));

    let client = StreetViewClient::new(
        config.streetview.clone(),
        Arc::new(ReqwestTransport::new()?),
        Arc::clone(&logger),
    );

    let handler =
        GetStreetViewImageHandler::new(Arc::new(images), Arc::new(client), Arc::clone(&logger));
    let app = create_router(AppState::new(handler, Arc::clone(&logger)));

    let addr = config.socket_addr();
    let listener = match config.retry.execute(|| TcpListener::bind(addr)).await {
        Ok(listener) => listener,
        Err(exhausted) => {
            logger
                .error(&format!("Unable to start server on {addr}: {exhausted}"))
                .await;
            return Err(exhausted.into());
        }
    };

    logger.info(&format!("Server listening on http://{addr}")).await;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
