//! In-process backend for the storage port.
//!
//! Holds everything in a mutex-guarded `Vec`. Used as a test double and for
//! ephemeral runs where nothing should touch disk. Ordering and integrity
//! rules match the SQLite backend: memories newest first, avoidance-type ties
//! by first seen, and a memory's `session_id` must name a known session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

use super::MemoryStore;
use crate::error::{StorageError, StorageResult};
use crate::memory::types::{
    Memory, NewMemory, PatternSummary, PatternSummaryData, Session, SessionStatus, SessionUpdate,
    TypeCount,
};

#[derive(Default)]
struct State {
    memories: Vec<Memory>,
    summaries: Vec<PatternSummary>,
    sessions: Vec<Session>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn with_memory<T>(&self, id: &str, f: impl FnOnce(&mut Memory) -> T) -> StorageResult<T> {
        let mut state = self.lock()?;
        let memory = state
            .memories
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StorageError::NotFound {
                kind: "memory",
                id: id.to_string(),
            })?;
        Ok(f(memory))
    }

    /// Fetch a memory by id, bypassing ranking and access bookkeeping.
    pub fn get_memory(&self, id: &str) -> StorageResult<Option<Memory>> {
        Ok(self.lock()?.memories.iter().find(|m| m.id == id).cloned())
    }

    pub fn pattern_summary_count(&self) -> StorageResult<usize> {
        Ok(self.lock()?.summaries.len())
    }

    pub fn create_session(&self, task: Option<&str>) -> StorageResult<Session> {
        self.create_session_at(task, Utc::now())
    }

    pub fn create_session_at(
        &self,
        task: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> StorageResult<Session> {
        let session = Session {
            id: uuid::Uuid::now_v7().to_string(),
            created_at,
            updated_at: created_at,
            status: SessionStatus::InProgress,
            task: task.map(str::to_string),
            avoidance_type: None,
            timer_completed: false,
            agentic_log: Vec::new(),
        };
        self.lock()?.sessions.push(session.clone());
        Ok(session)
    }

    pub fn update_session(&self, id: &str, update: &SessionUpdate) -> StorageResult<Session> {
        let mut state = self.lock()?;
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StorageError::NotFound {
                kind: "session",
                id: id.to_string(),
            })?;
        if let Some(status) = update.status {
            session.status = status;
        }
        if let Some(task) = &update.task {
            session.task = Some(task.clone());
        }
        if let Some(avoidance_type) = &update.avoidance_type {
            session.avoidance_type = Some(avoidance_type.clone());
        }
        if let Some(timer_completed) = update.timer_completed {
            session.timer_completed = timer_completed;
        }
        if let Some(log) = &update.agentic_log {
            session.agentic_log = log.clone();
        }
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    fn newest_first(memories: impl Iterator<Item = Memory>) -> Vec<Memory> {
        let mut out: Vec<Memory> = memories.collect();
        // Insertion order is the tiebreak, so reverse before the stable sort.
        out.reverse();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn create_memory(&self, memory: NewMemory) -> StorageResult<Memory> {
        let mut state = self.lock()?;
        if let Some(session_id) = &memory.session_id {
            if !state.sessions.iter().any(|s| &s.id == session_id) {
                return Err(StorageError::NotFound {
                    kind: "session",
                    id: session_id.clone(),
                });
            }
        }
        let stored = Memory {
            id: uuid::Uuid::now_v7().to_string(),
            created_at: memory.created_at,
            session_id: memory.session_id,
            memory_type: memory.memory_type,
            content: memory.content,
            avoidance_type: memory.avoidance_type,
            importance: memory.importance,
            access_count: 0,
            last_accessed_at: None,
            tags: memory.tags,
            embedding: memory.embedding,
        };
        state.memories.push(stored.clone());
        Ok(stored)
    }

    async fn get_all_memories(&self) -> StorageResult<Vec<Memory>> {
        let state = self.lock()?;
        Ok(Self::newest_first(state.memories.iter().cloned()))
    }

    async fn get_memories_with_embeddings(&self) -> StorageResult<Vec<Memory>> {
        let state = self.lock()?;
        Ok(Self::newest_first(
            state
                .memories
                .iter()
                .filter(|m| m.embedding.is_some())
                .cloned(),
        ))
    }

    async fn increment_memory_access(&self, id: &str, at: DateTime<Utc>) -> StorageResult<()> {
        self.with_memory(id, |m| {
            m.access_count += 1;
            m.last_accessed_at = Some(at);
        })
    }

    async fn reduce_memory_importance(&self, id: &str, factor: f64) -> StorageResult<()> {
        self.with_memory(id, |m| m.importance *= factor)
    }

    async fn update_memory_embedding(&self, id: &str, embedding: &[f32]) -> StorageResult<()> {
        self.with_memory(id, |m| m.embedding = Some(embedding.to_vec()))
    }

    async fn create_pattern_summary(
        &self,
        summary_text: &str,
        data: &PatternSummaryData,
    ) -> StorageResult<PatternSummary> {
        let summary = PatternSummary {
            id: uuid::Uuid::now_v7().to_string(),
            created_at: Utc::now(),
            summary_text: summary_text.to_string(),
            data: data.clone(),
        };
        self.lock()?.summaries.push(summary.clone());
        Ok(summary)
    }

    async fn get_latest_pattern_summary(&self) -> StorageResult<Option<PatternSummary>> {
        // Appended in creation order, so the last one is the latest.
        Ok(self.lock()?.summaries.last().cloned())
    }

    async fn get_session_count(&self) -> StorageResult<u64> {
        Ok(self.lock()?.sessions.len() as u64)
    }

    async fn get_completed_session_count(&self) -> StorageResult<u64> {
        let state = self.lock()?;
        Ok(state
            .sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Completed)
            .count() as u64)
    }

    async fn get_timer_completion_rate(&self) -> StorageResult<f64> {
        let state = self.lock()?;
        let completed: Vec<&Session> = state
            .sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Completed)
            .collect();
        if completed.is_empty() {
            return Ok(0.0);
        }
        let with_timer = completed.iter().filter(|s| s.timer_completed).count();
        Ok(with_timer as f64 / completed.len() as f64)
    }

    async fn get_avoidance_type_stats(&self) -> StorageResult<Vec<TypeCount>> {
        let state = self.lock()?;
        let mut sessions: Vec<&Session> = state.sessions.iter().collect();
        sessions.sort_by_key(|s| s.created_at);

        let mut stats: Vec<TypeCount> = Vec::new();
        for label in sessions.iter().filter_map(|s| s.avoidance_type.as_deref()) {
            match stats.iter_mut().find(|t| t.avoidance_type == label) {
                Some(entry) => entry.count += 1,
                None => stats.push(TypeCount {
                    avoidance_type: label.to_string(),
                    count: 1,
                }),
            }
        }
        // Stable: equal counts stay in first-seen order.
        stats.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(stats)
    }

    async fn apply_consolidation(
        &self,
        memory_ids: &[String],
        factor: f64,
        summary_text: &str,
        data: &PatternSummaryData,
    ) -> StorageResult<PatternSummary> {
        let mut state = self.lock()?;
        // Check every id before touching anything.
        if let Some(missing) = memory_ids
            .iter()
            .find(|id| !state.memories.iter().any(|m| &m.id == *id))
        {
            return Err(StorageError::NotFound {
                kind: "memory",
                id: missing.clone(),
            });
        }
        for memory in state
            .memories
            .iter_mut()
            .filter(|m| memory_ids.contains(&m.id))
        {
            memory.importance *= factor;
        }
        let summary = PatternSummary {
            id: uuid::Uuid::now_v7().to_string(),
            created_at: Utc::now(),
            summary_text: summary_text.to_string(),
            data: data.clone(),
        };
        state.summaries.push(summary.clone());
        Ok(summary)
    }
}
