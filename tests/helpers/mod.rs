#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use recollect::embedding::{EmbeddingProvider, EmbeddingService, EMBEDDING_DIM};
use recollect::error::{EmbeddingError, StorageError, StorageResult};
use recollect::memory::types::{
    Memory, MemoryType, NewMemory, PatternSummary, PatternSummaryData, Session, SessionStatus,
    SessionUpdate, TypeCount,
};
use recollect::storage::{InMemoryStore, MemoryStore, SqliteStore};

/// Open a fresh in-memory SQLite store with schema and migrations applied.
pub fn test_store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

/// Generate a deterministic 1536-dim embedding with a spike at position `seed`.
/// Distinct seeds are orthogonal.
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    v[seed % EMBEDDING_DIM] = 1.0;
    v
}

/// An embedding with cosine similarity `similarity` to `test_embedding(seed)`.
pub fn embedding_near(seed: usize, similarity: f32) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    v[seed % EMBEDDING_DIM] = similarity;
    v[(seed + 1) % EMBEDDING_DIM] = (1.0 - similarity * similarity).sqrt();
    v
}

/// A memory created `days_ago` days in the past.
pub fn aged(memory_type: MemoryType, content: &str, days_ago: i64) -> NewMemory {
    NewMemory::new(memory_type, content).created_at(Utc::now() - Duration::days(days_ago))
}

/// Session writes are inherent on each backend; this lets tests drive both.
pub trait SessionWriter {
    fn start(&self, minutes_ago: i64) -> Session;
    fn finish(&self, id: &str, update: SessionUpdate) -> Session;
}

impl SessionWriter for SqliteStore {
    fn start(&self, minutes_ago: i64) -> Session {
        self.create_session_at(None, Utc::now() - Duration::minutes(minutes_ago))
            .unwrap()
    }

    fn finish(&self, id: &str, update: SessionUpdate) -> Session {
        self.update_session(id, &update).unwrap()
    }
}

impl SessionWriter for InMemoryStore {
    fn start(&self, minutes_ago: i64) -> Session {
        self.create_session_at(None, Utc::now() - Duration::minutes(minutes_ago))
            .unwrap()
    }

    fn finish(&self, id: &str, update: SessionUpdate) -> Session {
        self.update_session(id, &update).unwrap()
    }
}

/// Record `n` completed sessions, oldest first, all with the given avoidance type.
pub fn completed_sessions(store: &impl SessionWriter, n: usize, avoidance_type: &str) {
    for i in 0..n {
        let s = store.start((n - i) as i64);
        store.finish(
            &s.id,
            SessionUpdate {
                status: Some(SessionStatus::Completed),
                avoidance_type: Some(avoidance_type.to_string()),
                timer_completed: Some(true),
                ..Default::default()
            },
        );
    }
}

/// Embedder returning a fixed vector per exact input text.
///
/// Unknown text maps to `fallback`. Counts calls.
pub struct ScriptedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    calls: AtomicUsize,
}

impl ScriptedEmbedder {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Embedder that fails for any text containing `trigger` and succeeds otherwise.
pub struct FlakyEmbedder {
    pub trigger: String,
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.contains(&self.trigger) {
            return Err(EmbeddingError::Provider {
                status: 500,
                body: "upstream exploded".into(),
            });
        }
        Ok(test_embedding(0))
    }

    fn model(&self) -> &str {
        "flaky"
    }
}

/// Embedder that always fails.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Provider {
            status: 429,
            body: "rate limited".into(),
        })
    }

    fn model(&self) -> &str {
        "failing"
    }
}

pub fn service(provider: impl EmbeddingProvider + 'static) -> EmbeddingService {
    EmbeddingService::new(Arc::new(provider))
}

/// In-memory store whose `fail_on`-th importance discount (1-based, counted
/// across the store's lifetime) fails with a disk I/O error.
///
/// Keeps the trait's default consolidation write, so each discount is its own
/// call and a failure lands between them.
pub struct DiscountFailingStore {
    pub inner: InMemoryStore,
    fail_on: usize,
    discounts: AtomicUsize,
}

impl DiscountFailingStore {
    pub fn new(fail_on: usize) -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_on,
            discounts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MemoryStore for DiscountFailingStore {
    async fn create_memory(&self, memory: NewMemory) -> StorageResult<Memory> {
        self.inner.create_memory(memory).await
    }

    async fn get_all_memories(&self) -> StorageResult<Vec<Memory>> {
        self.inner.get_all_memories().await
    }

    async fn get_memories_with_embeddings(&self) -> StorageResult<Vec<Memory>> {
        self.inner.get_memories_with_embeddings().await
    }

    async fn increment_memory_access(&self, id: &str, at: DateTime<Utc>) -> StorageResult<()> {
        self.inner.increment_memory_access(id, at).await
    }

    async fn reduce_memory_importance(&self, id: &str, factor: f64) -> StorageResult<()> {
        let n = self.discounts.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(StorageError::Sqlite(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR),
                Some("disk I/O error".into()),
            )));
        }
        self.inner.reduce_memory_importance(id, factor).await
    }

    async fn update_memory_embedding(&self, id: &str, embedding: &[f32]) -> StorageResult<()> {
        self.inner.update_memory_embedding(id, embedding).await
    }

    async fn create_pattern_summary(
        &self,
        summary_text: &str,
        data: &PatternSummaryData,
    ) -> StorageResult<PatternSummary> {
        self.inner.create_pattern_summary(summary_text, data).await
    }

    async fn get_latest_pattern_summary(&self) -> StorageResult<Option<PatternSummary>> {
        self.inner.get_latest_pattern_summary().await
    }

    async fn get_session_count(&self) -> StorageResult<u64> {
        self.inner.get_session_count().await
    }

    async fn get_completed_session_count(&self) -> StorageResult<u64> {
        self.inner.get_completed_session_count().await
    }

    async fn get_timer_completion_rate(&self) -> StorageResult<f64> {
        self.inner.get_timer_completion_rate().await
    }

    async fn get_avoidance_type_stats(&self) -> StorageResult<Vec<TypeCount>> {
        self.inner.get_avoidance_type_stats().await
    }
}
