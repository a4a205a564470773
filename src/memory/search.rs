//! Embedding-based similarity search over stored memories.

use serde::Serialize;

use crate::embedding::EmbeddingService;
use crate::error::MemoryError;
use crate::memory::types::Memory;
use crate::storage::MemoryStore;

/// Search configuration knobs.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub limit: usize,
    /// Results below this cosine similarity are dropped.
    pub min_similarity: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_similarity: 0.3,
        }
    }
}

/// A memory paired with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMemory {
    pub memory: Memory,
    pub similarity: f64,
}

/// Cosine similarity in `[-1, 1]`.
///
/// Returns 0 when the lengths differ or either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    dot / denominator
}

/// Find the memories most similar to `query`, best first.
///
/// Embedding the query happens first, so an unavailable or failing provider
/// is reported even when nothing has been embedded yet. Read-only.
pub async fn search_similar_memories(
    store: &dyn MemoryStore,
    embeddings: &EmbeddingService,
    query: &str,
    options: SearchOptions,
) -> Result<Vec<ScoredMemory>, MemoryError> {
    // 1. Embed the query
    let query_embedding = embeddings.embed(query).await?;

    // 2. Candidates
    let candidates = store.get_memories_with_embeddings().await?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let candidate_count = candidates.len();

    // 3. Score, filter, rank
    let mut scored: Vec<ScoredMemory> = candidates
        .into_iter()
        .map(|memory| {
            let similarity = memory
                .embedding
                .as_deref()
                .map(|e| cosine_similarity(&query_embedding, e))
                .unwrap_or(0.0);
            ScoredMemory { memory, similarity }
        })
        .filter(|s| s.similarity >= options.min_similarity)
        .collect();
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(options.limit);

    tracing::debug!(
        candidates = candidate_count,
        returned = scored.len(),
        "semantic search complete"
    );
    Ok(scored)
}
