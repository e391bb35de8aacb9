//! Centralized configuration management for the ingestion fabric.
//!
//! Configuration follows the same hierarchy the platform has always used:
//! 1. Safe defaults (defined as constants)
//! 2. Environment variable overrides
//! 3. Runtime validation

pub mod error;
pub mod profile;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use profile::Profile;
use validation::Validate;

// =============================================================================
// SAFE DEFAULTS - mirror the original platform's `config/config.py` /
// `config/worker_config.py` getenv(..., default) pattern.
// =============================================================================

const DEFAULT_MASTER_LIBRARY: &str = "./data/master_library";
const DEFAULT_PROCESSED_DIR: &str = "./data/processed";
const DEFAULT_STATUS_DB_PATH: &str = "./data/local_dbs/documents.db";
const DEFAULT_LOG_DIR: &str = "./logs";

const DEFAULT_MAX_TOKENS: usize = 8191;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_EXTRACTION_JOBS_QUEUE: &str = "extraction_jobs";
const DEFAULT_CHUNK_JOBS_QUEUE: &str = "document_processing_queue";
const DEFAULT_EMBED_JOBS_QUEUE: &str = "embedding_queue";

const DEFAULT_EXTRACTION_LOCK_TTL_SECONDS: u64 = 300;
const DEFAULT_MANAGER_SCAN_INTERVAL_SECONDS: u64 = 30;
const DEFAULT_MANAGER_ERROR_BACKOFF_SECONDS: u64 = 5;
const DEFAULT_SHUTDOWN_GRACE_PERIOD_SECONDS: u64 = 60;
const DEFAULT_QUEUE_POP_TIMEOUT_SECONDS: u64 = 5;

const DEFAULT_EXTRACTION_WORKERS: usize = 3;
const DEFAULT_CHUNKING_WORKERS: usize = 2;
const DEFAULT_EMBEDDING_WORKERS: usize = 2;
const DEFAULT_SUPERVISOR_POLL_INTERVAL_SECONDS: u64 = 15;

const DEFAULT_EMBEDDING_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;
const DEFAULT_EMBEDDING_POOL_SIZE: usize = 2;
const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 32;
const DEFAULT_EMBEDDING_BATCH_TIMEOUT_MS: u64 = 100;

const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
const DEFAULT_VECTOR_COLLECTION: &str = "document_chunks";

const DEFAULT_TELEMETRY_ENABLED: bool = false;
const DEFAULT_TRACING_LEVEL: &str = "info";

/// Core configuration for the ingestion fabric.
///
/// All settings have safe defaults and can be overridden via environment
/// variables. See each nested config's doc comment for its variable names.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApplicationConfig {
    /// Which deployment profile produced this config (dev/staging/prod/test).
    pub profile: Profile,

    /// Watched library directory and admission rules.
    pub library: LibraryConfig,

    /// Extraction manager scan cadence and claim-lock lifetime.
    pub manager: ManagerConfig,

    /// Queue broker connection and queue/lock naming.
    pub broker: BrokerConfig,

    /// Document status store (SQLite-backed).
    pub status_store: StatusStoreConfig,

    /// Hybrid chunker token budget and staging directory.
    pub chunking: ChunkingConfig,

    /// Embedding model configuration.
    pub embedding: EmbeddingConfig,

    /// Vector storage configuration.
    pub vector_storage: VectorStorageConfig,

    /// Worker pool sizes per stage.
    pub workers: WorkerPoolConfig,

    /// Supervisor process-management configuration.
    pub supervisor: SupervisorConfig,

    /// Telemetry and observability configuration.
    pub telemetry: TelemetryConfig,
}

/// Watched library directory and file admission.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LibraryConfig {
    /// Directory scanned by the extraction manager (`MASTER_LIBRARY`).
    pub master_library: std::path::PathBuf,

    /// File extensions (without the dot) eligible for ingestion.
    pub supported_extensions: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            master_library: DEFAULT_MASTER_LIBRARY.into(),
            supported_extensions: vec!["pdf".to_string()],
        }
    }
}

/// Extraction manager cadence.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManagerConfig {
    /// Seconds between master library scans (`MANAGER_SCAN_INTERVAL_SECONDS`).
    pub scan_interval_secs: u64,

    /// Seconds to back off after an error mid-scan, distinct from the regular
    /// scan cadence.
    pub error_backoff_secs: u64,

    /// Claim-lock TTL in seconds (`EXTRACTION_LOCK_TTL_SECONDS`).
    pub lock_ttl_secs: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: DEFAULT_MANAGER_SCAN_INTERVAL_SECONDS,
            error_backoff_secs: DEFAULT_MANAGER_ERROR_BACKOFF_SECONDS,
            lock_ttl_secs: DEFAULT_EXTRACTION_LOCK_TTL_SECONDS,
        }
    }
}

/// Queue broker connection and naming.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BrokerConfig {
    /// Redis connection string (`REDIS_URL`).
    pub redis_url: String,

    /// Extract-stage input queue name (`EXTRACTION_JOBS_QUEUE`).
    pub extraction_jobs_queue: String,

    /// Chunk-stage input queue name (`CHUNK_JOBS_QUEUE`).
    pub chunk_jobs_queue: String,

    /// Embed-stage input queue name (`EMBED_JOBS_QUEUE`).
    pub embed_jobs_queue: String,

    /// Blocking-pop timeout in seconds before a worker re-checks shutdown.
    pub pop_timeout_secs: u64,
}

impl BrokerConfig {
    /// Per-stage dead-letter queue name, reserved but unpopulated by the
    /// base design (see SPEC_FULL.md §9 "DLQ wiring").
    #[must_use]
    pub fn dead_letter_queue(stage: &str) -> String {
        format!("{stage}_dlq")
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            extraction_jobs_queue: DEFAULT_EXTRACTION_JOBS_QUEUE.to_string(),
            chunk_jobs_queue: DEFAULT_CHUNK_JOBS_QUEUE.to_string(),
            embed_jobs_queue: DEFAULT_EMBED_JOBS_QUEUE.to_string(),
            pop_timeout_secs: DEFAULT_QUEUE_POP_TIMEOUT_SECONDS,
        }
    }
}

/// Document status store configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StatusStoreConfig {
    /// SQLite database file path (`STATUS_DB_PATH`).
    pub db_path: std::path::PathBuf,
}

impl Default for StatusStoreConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_STATUS_DB_PATH.into(),
        }
    }
}

/// Hybrid chunker configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChunkingConfig {
    /// Token budget per chunk (`MAX_TOKENS`).
    pub max_tokens: usize,

    /// Whether adjacent sibling chunks may be coalesced within budget.
    pub merge_peers: bool,

    /// Staging directory for `<basename>_chunks.json` artifacts (`PROCESSED_DIR`).
    pub processed_dir: std::path::PathBuf,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            merge_peers: true,
            processed_dir: DEFAULT_PROCESSED_DIR.into(),
        }
    }
}

/// Embedding model identity and token budget.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmbeddingModelConfig {
    /// `HuggingFace` model id for the local embedding backend (`EMBEDDING_MODEL_ID`).
    pub id: String,

    /// Maximum tokens the model accepts per input, validated against the
    /// model's own `max_position_embeddings` on load.
    pub max_tokens: usize,
}

/// Embedding model pool sizing and batching.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmbeddingPerformanceConfig {
    /// Number of model instances kept warm in the round-robin pool
    /// (`EMBEDDING_POOL_SIZE`).
    pub pool_size: usize,

    /// Maximum texts submitted to the model in one inference call
    /// (`EMBEDDING_BATCH_SIZE`).
    pub batch_size: usize,

    /// Milliseconds the dispatcher waits to fill a batch before submitting
    /// a partial one (`EMBEDDING_BATCH_TIMEOUT_MS`).
    pub batch_timeout_ms: u64,
}

/// Embedding model configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmbeddingConfig {
    /// Model identity and token budget.
    pub model: EmbeddingModelConfig,

    /// Pool sizing and batching behavior.
    pub performance: EmbeddingPerformanceConfig,

    /// Embedding dimensions produced by this model.
    pub dimensions: usize,

    /// Whether to use GPU acceleration if available (Metal/CUDA).
    pub use_gpu: bool,
}

impl EmbeddingConfig {
    /// The canonical default model id.
    ///
    /// The original platform's `config/config.py` defaults `EMBEDDING_MODEL`
    /// to `all-MiniLM-L6-v2`, while its `Embedder` class defaults to the
    /// larger `all-mpnet-base-v2` when no override is passed. These disagree
    /// in the original; the config-level default is the one an operator
    /// actually controls, so it wins here.
    #[must_use]
    pub fn default_model_id() -> String {
        DEFAULT_EMBEDDING_MODEL_ID.to_string()
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: EmbeddingModelConfig {
                id: Self::default_model_id(),
                max_tokens: DEFAULT_MAX_TOKENS,
            },
            performance: EmbeddingPerformanceConfig {
                pool_size: DEFAULT_EMBEDDING_POOL_SIZE,
                batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
                batch_timeout_ms: DEFAULT_EMBEDDING_BATCH_TIMEOUT_MS,
            },
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            use_gpu: true,
        }
    }
}

/// Vector storage configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VectorStorageConfig {
    /// Qdrant connection URL (`QDRANT_URL`).
    pub qdrant_url: String,

    /// Collection name used for document chunks.
    pub collection_name: String,
}

impl Default for VectorStorageConfig {
    fn default() -> Self {
        Self {
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection_name: DEFAULT_VECTOR_COLLECTION.to_string(),
        }
    }
}

/// Per-stage worker pool sizes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WorkerPoolConfig {
    /// Extract worker pool size (`EXTRACTION_WORKERS`).
    pub extraction_workers: usize,

    /// Chunk worker pool size (`CHUNKING_WORKERS`).
    pub chunking_workers: usize,

    /// Embed worker pool size (`EMBEDDING_WORKERS`).
    pub embedding_workers: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            extraction_workers: DEFAULT_EXTRACTION_WORKERS,
            chunking_workers: DEFAULT_CHUNKING_WORKERS,
            embedding_workers: DEFAULT_EMBEDDING_WORKERS,
        }
    }
}

/// Supervisor process-management configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SupervisorConfig {
    /// Directory for per-child append-mode logs (`LOG_DIR`).
    pub log_dir: std::path::PathBuf,

    /// Seconds to wait for a child to exit gracefully before a hard kill
    /// (`SHUTDOWN_GRACE_PERIOD_SECONDS`).
    pub shutdown_grace_period_secs: u64,

    /// Seconds between child liveness polls.
    pub poll_interval_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            log_dir: DEFAULT_LOG_DIR.into(),
            shutdown_grace_period_secs: DEFAULT_SHUTDOWN_GRACE_PERIOD_SECONDS,
            poll_interval_secs: DEFAULT_SUPERVISOR_POLL_INTERVAL_SECONDS,
        }
    }
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetryConfig {
    /// Whether structured tracing export is enabled (opt-in).
    pub enabled: bool,

    /// `tracing-subscriber` filter directive (`LOG_LEVEL`).
    pub level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_TELEMETRY_ENABLED,
            level: DEFAULT_TRACING_LEVEL.to_string(),
        }
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Development,
            library: LibraryConfig::default(),
            manager: ManagerConfig::default(),
            broker: BrokerConfig::default(),
            status_store: StatusStoreConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            vector_storage: VectorStorageConfig::default(),
            workers: WorkerPoolConfig::default(),
            supervisor: SupervisorConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl ApplicationConfig {
    /// Build a default configuration for the given profile, then apply
    /// environment variable overrides on top of it.
    #[must_use]
    pub fn with_profile(profile: Profile) -> Self {
        let mut config = Self {
            profile,
            ..Self::default()
        };
        config.apply_env_overrides();
        config
    }

    /// Load configuration the way every binary's `main()` should: profile
    /// from `CODETRIEVER_PROFILE` (default `development`), then individual
    /// env var overrides, then validation.
    ///
    /// # Errors
    /// Returns a `ConfigError` if validation fails.
    pub fn from_env() -> ConfigResult<Self> {
        let profile: Profile = std::env::var("CODETRIEVER_PROFILE")
            .unwrap_or_else(|_| "development".to_string())
            .parse()?;
        let config = Self::with_profile(profile);
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("MASTER_LIBRARY") {
            self.library.master_library = v.into();
        }
        if let Ok(v) = std::env::var("PROCESSED_DIR") {
            self.chunking.processed_dir = v.into();
        }
        if let Ok(v) = std::env::var("STATUS_DB_PATH") {
            self.status_store.db_path = v.into();
        }
        if let Ok(v) = std::env::var("LOG_DIR") {
            self.supervisor.log_dir = v.into();
        }
        if let Some(v) = parse_env("MAX_TOKENS") {
            self.chunking.max_tokens = v;
        }
        if let Ok(v) = std::env::var("REDIS_URL") {
            self.broker.redis_url = v;
        }
        if let Ok(v) = std::env::var("EXTRACTION_JOBS_QUEUE") {
            self.broker.extraction_jobs_queue = v;
        }
        if let Ok(v) = std::env::var("CHUNK_JOBS_QUEUE") {
            self.broker.chunk_jobs_queue = v;
        }
        if let Ok(v) = std::env::var("EMBED_JOBS_QUEUE") {
            self.broker.embed_jobs_queue = v;
        }
        if let Some(v) = parse_env("EXTRACTION_LOCK_TTL_SECONDS") {
            self.manager.lock_ttl_secs = v;
        }
        if let Some(v) = parse_env("MANAGER_SCAN_INTERVAL_SECONDS") {
            self.manager.scan_interval_secs = v;
        }
        if let Some(v) = parse_env("SHUTDOWN_GRACE_PERIOD_SECONDS") {
            self.supervisor.shutdown_grace_period_secs = v;
        }
        if let Some(v) = parse_env("EXTRACTION_WORKERS") {
            self.workers.extraction_workers = v;
        }
        if let Some(v) = parse_env("CHUNKING_WORKERS") {
            self.workers.chunking_workers = v;
        }
        if let Some(v) = parse_env("EMBEDDING_WORKERS") {
            self.workers.embedding_workers = v;
        }
        if let Ok(v) = std::env::var("EMBEDDING_MODEL_ID") {
            self.embedding.model.id = v;
        }
        if let Some(v) = parse_env("EMBEDDING_MAX_TOKENS") {
            self.embedding.model.max_tokens = v;
        }
        if let Some(v) = parse_env("EMBEDDING_POOL_SIZE") {
            self.embedding.performance.pool_size = v;
        }
        if let Some(v) = parse_env("EMBEDDING_BATCH_SIZE") {
            self.embedding.performance.batch_size = v;
        }
        if let Some(v) = parse_env("EMBEDDING_BATCH_TIMEOUT_MS") {
            self.embedding.performance.batch_timeout_ms = v;
        }
        if let Ok(v) = std::env::var("QDRANT_URL") {
            self.vector_storage.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            self.telemetry.level = v;
        }
    }

    /// Create `MASTER_LIBRARY`, `PROCESSED_DIR`, the status-store parent
    /// directory, and `LOG_DIR` idempotently. Matches the original's
    /// scattered `os.makedirs(..., exist_ok=True)` calls, consolidated into
    /// one call per binary's `main()`.
    ///
    /// # Errors
    /// Returns an IO error if a directory cannot be created.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.library.master_library)?;
        std::fs::create_dir_all(&self.chunking.processed_dir)?;
        if let Some(parent) = self.status_store.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.supervisor.log_dir)?;
        Ok(())
    }
}

impl Validate for ApplicationConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.embedding.model.id, "embedding.model.id")?;
        validation::validate_range(self.chunking.max_tokens as u64, 1, 1_000_000, "chunking.max_tokens")?;
        validation::validate_range(self.embedding.model.max_tokens as u64, 1, 1_000_000, "embedding.model.max_tokens")?;
        validation::validate_range(self.embedding.performance.pool_size as u64, 1, 256, "embedding.performance.pool_size")?;
        validation::validate_range(
            self.embedding.performance.batch_size as u64,
            1,
            10_000,
            "embedding.performance.batch_size",
        )?;
        validation::validate_range(
            self.workers.extraction_workers as u64,
            1,
            256,
            "workers.extraction_workers",
        )?;
        validation::validate_range(
            self.workers.chunking_workers as u64,
            1,
            256,
            "workers.chunking_workers",
        )?;
        validation::validate_range(
            self.workers.embedding_workers as u64,
            1,
            256,
            "workers.embedding_workers",
        )?;
        validation::validate_range(self.manager.lock_ttl_secs, 1, 86_400, "manager.lock_ttl_secs")?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ApplicationConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_embedding_model_matches_config_level_default() {
        assert_eq!(
            EmbeddingConfig::default_model_id(),
            "sentence-transformers/all-MiniLM-L6-v2"
        );
    }

    #[test]
    fn dead_letter_queue_name_is_derived_per_stage() {
        assert_eq!(BrokerConfig::dead_letter_queue("extraction"), "extraction_dlq");
        assert_eq!(BrokerConfig::dead_letter_queue("embedding"), "embedding_dlq");
    }

    #[test]
    fn zero_workers_fails_validation() {
        let mut config = ApplicationConfig::default();
        config.workers.extraction_workers = 0;
        assert!(config.validate().is_err());
    }
}
