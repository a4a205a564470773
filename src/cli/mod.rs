pub mod backfill;
pub mod consolidate;
pub mod context;
pub mod patterns;
pub mod remember;
pub mod search;
pub mod session;

use anyhow::{Context, Result};

use recollect::config::RecollectConfig;
use recollect::db::migrations;
use recollect::embedding::EmbeddingService;
use recollect::storage::SqliteStore;

/// Open the configured database, warning when its stored vectors were
/// produced by a different embedding model than the configured one.
pub fn open_store(config: &RecollectConfig) -> Result<SqliteStore> {
    let db_path = config.resolved_db_path();
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    let configured = &config.embedding.model;
    let stored = store.with_connection(|conn| {
        Ok(migrations::embedding_model_mismatch(conn, configured)?)
    })?;
    if let Some(stored) = stored {
        tracing::warn!(
            stored = %stored,
            configured = %configured,
            "embedding model changed; similarity against existing vectors is unreliable"
        );
    }
    Ok(store)
}

/// Build the embedding service. Disabled when no credential is set.
pub fn embedding_service(config: &RecollectConfig) -> Result<EmbeddingService> {
    EmbeddingService::from_config(&config.embedding)
        .context("failed to create embedding provider")
}
