//! Write path: auto-tagging, embedding, and storage.
//!
//! [`store_memory`] is the single entry point for new memories. Tags are
//! merged with keywords extracted from the content, and an embedding is
//! attached when a provider is configured. Embedding failures never block
//! the write; the returned [`EmbeddingStatus`] says what happened so the
//! memory can be picked up later by [`backfill_embeddings`].

use serde::Serialize;

use crate::embedding::EmbeddingService;
use crate::error::StorageResult;
use crate::memory::keywords::extract_keywords;
use crate::memory::types::{Memory, MemoryType, NewMemory};
use crate::storage::MemoryStore;

/// At most this many extracted keywords are added as tags.
pub const MAX_AUTO_TAGS: usize = 10;

pub const DEFAULT_BACKFILL_BATCH: usize = 50;

/// Caller-supplied fields for a new memory.
#[derive(Debug, Clone)]
pub struct StoreMemoryInput {
    pub session_id: Option<String>,
    pub memory_type: MemoryType,
    pub content: String,
    pub avoidance_type: Option<String>,
    /// Starting weight; negative values are stored as 0.
    pub importance: f64,
    pub tags: Vec<String>,
}

impl StoreMemoryInput {
    pub fn new(memory_type: MemoryType, content: impl Into<String>) -> Self {
        Self {
            session_id: None,
            memory_type,
            content: content.into(),
            avoidance_type: None,
            importance: 1.0,
            tags: Vec::new(),
        }
    }
}

/// Whether the stored memory carries a vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum EmbeddingStatus {
    Embedded,
    /// No provider configured.
    Unavailable,
    /// The provider was called and failed.
    Failed(String),
}

/// Result returned from a store operation.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMemory {
    pub memory: Memory,
    pub embedding: EmbeddingStatus,
}

/// Merge caller tags with extracted keywords, keeping first occurrence.
pub fn merge_tags(tags: &[String], content: &str) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(tags.len() + MAX_AUTO_TAGS);
    let keywords = extract_keywords(content);
    for tag in tags.iter().chain(keywords.iter().take(MAX_AUTO_TAGS)) {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

/// Store a memory, embedding it when possible.
///
/// Only storage errors are returned; an embedding failure is reported in
/// [`StoredMemory::embedding`] and the memory is stored without a vector.
pub async fn store_memory(
    store: &dyn MemoryStore,
    embeddings: &EmbeddingService,
    input: StoreMemoryInput,
) -> StorageResult<StoredMemory> {
    // 1. Auto-tag
    let tags = merge_tags(&input.tags, &input.content);

    // 2. Embed
    let (vector, status) = if embeddings.is_available() {
        match embeddings.embed(&input.content).await {
            Ok(v) => (Some(v), EmbeddingStatus::Embedded),
            Err(e) => {
                tracing::warn!(error = %e, "embedding failed, storing without vector");
                (None, EmbeddingStatus::Failed(e.to_string()))
            }
        }
    } else {
        (None, EmbeddingStatus::Unavailable)
    };

    // 3. Insert
    let mut new = NewMemory::new(input.memory_type, input.content)
        .importance(input.importance)
        .tags(tags);
    new.session_id = input.session_id;
    new.avoidance_type = input.avoidance_type;
    new.embedding = vector;

    let memory = store.create_memory(new).await?;
    tracing::debug!(
        id = %memory.id,
        memory_type = %memory.memory_type,
        tags = memory.tags.len(),
        embedded = memory.embedding.is_some(),
        "memory stored"
    );

    Ok(StoredMemory {
        memory,
        embedding: status,
    })
}

/// Outcome of one backfill pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Memories without a vector before this pass.
    pub missing: usize,
    pub attempted: usize,
    pub embedded: usize,
    pub failed: usize,
}

impl BackfillReport {
    /// Memories still without a vector after this pass.
    pub fn remaining(&self) -> usize {
        self.missing - self.embedded
    }
}

/// Embed up to `batch_size` memories that have no vector yet.
///
/// Returns an empty report when no provider is configured. Individual
/// failures are counted and skipped.
pub async fn backfill_embeddings(
    store: &dyn MemoryStore,
    embeddings: &EmbeddingService,
    batch_size: usize,
) -> StorageResult<BackfillReport> {
    backfill_embeddings_with_progress(store, embeddings, batch_size, |_, _| {}).await
}

/// [`backfill_embeddings`] calling `on_progress(done, total)` after each memory.
pub async fn backfill_embeddings_with_progress<F>(
    store: &dyn MemoryStore,
    embeddings: &EmbeddingService,
    batch_size: usize,
    mut on_progress: F,
) -> StorageResult<BackfillReport>
where
    F: FnMut(usize, usize),
{
    if !embeddings.is_available() {
        return Ok(BackfillReport::default());
    }

    let pending: Vec<Memory> = store
        .get_all_memories()
        .await?
        .into_iter()
        .filter(|m| m.embedding.is_none())
        .collect();

    let mut report = BackfillReport {
        missing: pending.len(),
        ..BackfillReport::default()
    };
    let batch: Vec<&Memory> = pending.iter().take(batch_size).collect();
    let total = batch.len();

    for (i, memory) in batch.into_iter().enumerate() {
        report.attempted += 1;
        match embeddings.embed(&memory.content).await {
            Ok(vector) => {
                store.update_memory_embedding(&memory.id, &vector).await?;
                report.embedded += 1;
            }
            Err(e) => {
                tracing::warn!(id = %memory.id, error = %e, "backfill embedding failed, skipping");
                report.failed += 1;
            }
        }
        on_progress(i + 1, total);
    }

    tracing::info!(
        embedded = report.embedded,
        failed = report.failed,
        remaining = report.remaining(),
        "embedding backfill complete"
    );
    Ok(report)
}
