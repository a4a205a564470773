//! The storage port every engine component reads and writes through.
//!
//! [`MemoryStore`] is the only persistence surface the engine depends on. Two
//! backends implement it: [`SqliteStore`] for on-disk use and [`InMemoryStore`]
//! for tests and ephemeral sessions. Handles are always passed explicitly;
//! there is no process-wide connection.
//!
//! Apart from [`MemoryStore::apply_consolidation`] on the bundled backends,
//! none of the read-then-write sequences built on top of this trait are
//! atomic. Two callers racing on the same memory can lose an access-count
//! increment or apply an importance discount twice.

pub mod in_memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StorageResult;
use crate::memory::types::{
    AgenticTurn, Memory, NewMemory, PatternSummary, PatternSummaryData, TypeCount,
};

#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Persist a new memory and return the stored record. A `session_id`
    /// that names no existing session is rejected.
    async fn create_memory(&self, memory: NewMemory) -> StorageResult<Memory>;

    /// All memories, newest first.
    async fn get_all_memories(&self) -> StorageResult<Vec<Memory>>;

    /// Memories that carry an embedding, newest first.
    async fn get_memories_with_embeddings(&self) -> StorageResult<Vec<Memory>>;

    /// Bump `access_count` by one and set `last_accessed_at`.
    async fn increment_memory_access(&self, id: &str, at: DateTime<Utc>) -> StorageResult<()>;

    /// Multiply a memory's importance by `factor`.
    async fn reduce_memory_importance(&self, id: &str, factor: f64) -> StorageResult<()>;

    async fn update_memory_embedding(&self, id: &str, embedding: &[f32]) -> StorageResult<()>;

    async fn create_pattern_summary(
        &self,
        summary_text: &str,
        data: &PatternSummaryData,
    ) -> StorageResult<PatternSummary>;

    async fn get_latest_pattern_summary(&self) -> StorageResult<Option<PatternSummary>>;

    async fn get_session_count(&self) -> StorageResult<u64>;

    async fn get_completed_session_count(&self) -> StorageResult<u64>;

    /// Completed sessions whose timer also finished, over all completed sessions.
    /// Zero when nothing has been completed.
    async fn get_timer_completion_rate(&self) -> StorageResult<f64>;

    /// Session counts per avoidance type, highest count first. Ties keep the
    /// order in which each type was first seen.
    async fn get_avoidance_type_stats(&self) -> StorageResult<Vec<TypeCount>>;

    /// Discount every listed memory by `factor`, then record the summary.
    ///
    /// The summary goes in last, so a failure never leaves one behind for
    /// memories that were not discounted. This default issues one call per
    /// memory: after a failure partway through, the memories already handled
    /// stay discounted and a retry discounts them again. [`SqliteStore`] and
    /// [`InMemoryStore`] override it to apply all or nothing.
    async fn apply_consolidation(
        &self,
        memory_ids: &[String],
        factor: f64,
        summary_text: &str,
        data: &PatternSummaryData,
    ) -> StorageResult<PatternSummary> {
        for id in memory_ids {
            self.reduce_memory_importance(id, factor).await?;
        }
        self.create_pattern_summary(summary_text, data).await
    }
}

/// Decode a JSON `tags` column. Malformed input yields `None` so the caller
/// decides how to degrade.
pub fn decode_tags(raw: &str) -> Option<Vec<String>> {
    if raw.trim().is_empty() {
        return Some(Vec::new());
    }
    serde_json::from_str(raw).ok()
}

/// Decode a JSON `data` column of a pattern summary.
pub fn decode_summary_data(raw: &str) -> Option<PatternSummaryData> {
    if raw.trim().is_empty() {
        return Some(PatternSummaryData::default());
    }
    serde_json::from_str(raw).ok()
}

/// Decode a session's JSON `agentic_log` column.
pub fn decode_agentic_log(raw: &str) -> Option<Vec<AgenticTurn>> {
    if raw.trim().is_empty() {
        return Some(Vec::new());
    }
    serde_json::from_str(raw).ok()
}
