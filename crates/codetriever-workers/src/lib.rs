//! Shared bootstrap for the four worker binaries (SPEC_FULL.md §6).
//!
//! Each `setup_*` function builds one collaborator from [`ApplicationConfig`];
//! each binary composes only the subset it actually touches, mirroring
//! `codetriever-api`'s `bootstrap.rs` `setup_*`/`initialize_*` split.

use std::sync::Arc;

use codetriever_broker::{QueueBroker, RedisBroker};
use codetriever_config::ApplicationConfig;
use codetriever_embeddings::{DefaultEmbeddingService, EmbeddingService};
use codetriever_extraction::{DocumentConverter, PdfConverter};
use codetriever_status::{SqliteStatusStore, StatusStore, initialize_database};
use codetriever_vector_data::{QdrantStorage, VectorStorage};
use tracing::info;

/// Result type for bootstrap functions: anything here is an unrecoverable
/// startup failure (SPEC_FULL.md §6: non-zero exit, the supervisor restarts
/// the process rather than the pipeline retrying internally).
pub type BootstrapResult<T> = anyhow::Result<T>;

/// Connects to the configured Redis broker.
///
/// # Errors
/// Returns an error if the connection cannot be established.
pub async fn setup_broker(config: &ApplicationConfig) -> BootstrapResult<Arc<dyn QueueBroker>> {
    info!(url = %config.broker.redis_url, "connecting to queue broker");
    let broker = RedisBroker::connect(&config.broker.redis_url).await?;
    Ok(Arc::new(broker))
}

/// Opens (and migrates, if needed) the SQLite status store.
///
/// # Errors
/// Returns an error if the database file cannot be created or opened.
pub async fn setup_status_store(config: &ApplicationConfig) -> BootstrapResult<Arc<dyn StatusStore>> {
    info!(db_path = %config.status_store.db_path.display(), "opening status store");
    let pool = initialize_database(&config.status_store).await?;
    Ok(Arc::new(SqliteStatusStore::new(pool)))
}

/// Builds the base document converter (PDF today; other formats plug in
/// behind the same trait later).
#[must_use]
pub fn setup_converter() -> Arc<dyn DocumentConverter> {
    Arc::new(PdfConverter::new())
}

/// Builds the embedding service and warms it up, downloading the model if
/// needed, so the first real job doesn't pay the cold-start cost.
///
/// # Errors
/// Returns an error if the model fails to load.
pub async fn setup_embedding_service(config: &ApplicationConfig) -> BootstrapResult<Arc<dyn EmbeddingService>> {
    info!(model = %config.embedding.model.id, "initializing embedding service");
    let service: Arc<dyn EmbeddingService> = Arc::new(DefaultEmbeddingService::new(config.embedding.clone()));
    info!("warming up embedding model (downloading if needed)");
    service.provider().ensure_ready().await?;
    info!("embedding model ready");
    Ok(service)
}

/// Connects to Qdrant and ensures the configured collection exists at the
/// embedding model's dimensionality.
///
/// # Errors
/// Returns an error if the client cannot be constructed, or the collection
/// cannot be created.
pub async fn setup_vector_storage(
    config: &ApplicationConfig,
    dimensions: usize,
) -> BootstrapResult<Arc<dyn VectorStorage>> {
    info!(url = %config.vector_storage.qdrant_url, collection = %config.vector_storage.collection_name, "initializing vector storage");
    let storage = QdrantStorage::new(&config.vector_storage.qdrant_url, config.vector_storage.collection_name.clone())?;
    storage.ensure_collection(dimensions).await?;
    Ok(Arc::new(storage))
}

/// Installs a `tracing_subscriber` formatting layer. Workers log to stdout;
/// the supervisor is the one redirecting that stream to a per-child log
/// file (SPEC_FULL.md §4.1), so no file appender lives here.
pub fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Blocks until `SIGINT` or `SIGTERM`, for the worker binaries' shutdown
/// trigger (the supervisor's own shutdown sequence lives in
/// `codetriever-supervisor`, which handles the same signals itself).
///
/// # Errors
/// Returns an error if the signal handlers cannot be installed.
pub async fn wait_for_shutdown_signal() -> BootstrapResult<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }
    Ok(())
}
