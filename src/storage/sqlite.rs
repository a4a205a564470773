//! SQLite backend for the storage port.
//!
//! The free functions take a plain `&Connection` and do the actual SQL; the
//! [`SqliteStore`] wrapper owns the connection behind a mutex and exposes them
//! through [`MemoryStore`]. The lock is never held across an `.await`.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{decode_agentic_log, decode_summary_data, decode_tags, MemoryStore};
use crate::embedding::{bytes_to_embedding, embedding_to_bytes};
use crate::error::{StorageError, StorageResult};
use crate::memory::types::{
    Memory, MemoryType, NewMemory, PatternSummary, PatternSummaryData, Session, SessionStatus,
    SessionUpdate, TypeCount,
};

const MEMORY_COLUMNS: &str = "id, created_at, session_id, type, content, avoidance_type, \
     importance, access_count, last_accessed_at, tags, embedding";

const SESSION_COLUMNS: &str =
    "id, created_at, updated_at, status, task, avoidance_type, timer_completed, agentic_log";

/// Fixed-width RFC 3339 so lexicographic order in SQL matches time order.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("invalid timestamp {raw:?}: {e}")))
}

fn row_to_memory(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(1)?;
    let memory_type: String = row.get(3)?;
    let last_accessed_at: Option<String> = row.get(8)?;
    let raw_tags: Option<String> = row.get(9)?;
    let embedding: Option<Vec<u8>> = row.get(10)?;

    let tags = match raw_tags.as_deref() {
        None => Vec::new(),
        Some(raw) => decode_tags(raw).unwrap_or_else(|| {
            tracing::warn!(memory_id = %id, "malformed tags column, treating as empty");
            Vec::new()
        }),
    };

    Ok(Memory {
        created_at: parse_ts(1, &created_at)?,
        session_id: row.get(2)?,
        memory_type: memory_type
            .parse::<MemoryType>()
            .map_err(|e| conversion_error(3, e))?,
        content: row.get(4)?,
        avoidance_type: row.get(5)?,
        importance: row.get(6)?,
        access_count: row.get(7)?,
        last_accessed_at: last_accessed_at
            .as_deref()
            .map(|raw| parse_ts(8, raw))
            .transpose()?,
        tags,
        embedding: embedding.map(|bytes| bytes_to_embedding(&bytes)),
        id,
    })
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(1)?;
    let updated_at: String = row.get(2)?;
    let status: String = row.get(3)?;
    let raw_log: Option<String> = row.get(7)?;

    let agentic_log = match raw_log.as_deref() {
        None => Vec::new(),
        Some(raw) => decode_agentic_log(raw).unwrap_or_else(|| {
            tracing::warn!(session_id = %id, "malformed agentic_log column, treating as empty");
            Vec::new()
        }),
    };

    Ok(Session {
        created_at: parse_ts(1, &created_at)?,
        updated_at: parse_ts(2, &updated_at)?,
        status: status
            .parse::<SessionStatus>()
            .map_err(|e| conversion_error(3, e))?,
        task: row.get(4)?,
        avoidance_type: row.get(5)?,
        timer_completed: row.get(6)?,
        agentic_log,
        id,
    })
}

fn query_memories(conn: &Connection, where_clause: &str) -> StorageResult<Vec<Memory>> {
    let sql = format!(
        "SELECT {MEMORY_COLUMNS} FROM memories {where_clause} ORDER BY created_at DESC, rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], row_to_memory)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Insert a memory row and read it back in domain form.
pub fn insert_memory(conn: &Connection, memory: NewMemory) -> StorageResult<Memory> {
    let id = uuid::Uuid::now_v7().to_string();
    let tags_json = serde_json::to_string(&memory.tags)?;
    let embedding_blob = memory.embedding.as_deref().map(embedding_to_bytes);

    conn.execute(
        "INSERT INTO memories (id, created_at, session_id, type, content, avoidance_type, \
             importance, access_count, tags, embedding) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)",
        params![
            id,
            format_ts(&memory.created_at),
            memory.session_id,
            memory.memory_type.as_str(),
            memory.content,
            memory.avoidance_type,
            memory.importance,
            tags_json,
            embedding_blob,
        ],
    )?;

    Ok(Memory {
        id,
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
    })
}

pub fn all_memories(conn: &Connection) -> StorageResult<Vec<Memory>> {
    query_memories(conn, "")
}

pub fn memories_with_embeddings(conn: &Connection) -> StorageResult<Vec<Memory>> {
    query_memories(conn, "WHERE embedding IS NOT NULL")
}

fn require_updated(rows: usize, kind: &'static str, id: &str) -> StorageResult<()> {
    if rows == 0 {
        return Err(StorageError::NotFound {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn increment_access(conn: &Connection, id: &str, at: &DateTime<Utc>) -> StorageResult<()> {
    let rows = conn.execute(
        "UPDATE memories SET access_count = access_count + 1, last_accessed_at = ?1 WHERE id = ?2",
        params![format_ts(at), id],
    )?;
    require_updated(rows, "memory", id)
}

pub fn reduce_importance(conn: &Connection, id: &str, factor: f64) -> StorageResult<()> {
    let rows = conn.execute(
        "UPDATE memories SET importance = importance * ?1 WHERE id = ?2",
        params![factor, id],
    )?;
    require_updated(rows, "memory", id)
}

pub fn set_embedding(conn: &Connection, id: &str, embedding: &[f32]) -> StorageResult<()> {
    let rows = conn.execute(
        "UPDATE memories SET embedding = ?1 WHERE id = ?2",
        params![embedding_to_bytes(embedding), id],
    )?;
    require_updated(rows, "memory", id)
}

pub fn insert_pattern_summary(
    conn: &Connection,
    summary_text: &str,
    data: &PatternSummaryData,
) -> StorageResult<PatternSummary> {
    let id = uuid::Uuid::now_v7().to_string();
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO pattern_summaries (id, created_at, summary_text, data) \
         VALUES (?1, ?2, ?3, ?4)",
        params![id, format_ts(&created_at), summary_text, serde_json::to_string(data)?],
    )?;
    Ok(PatternSummary {
        id,
        created_at,
        summary_text: summary_text.to_string(),
        data: data.clone(),
    })
}

pub fn latest_pattern_summary(conn: &Connection) -> StorageResult<Option<PatternSummary>> {
    let row = conn
        .query_row(
            "SELECT id, created_at, summary_text, data FROM pattern_summaries \
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            [],
            |row| {
                let created_at: String = row.get(1)?;
                Ok((
                    row.get::<_, String>(0)?,
                    parse_ts(1, &created_at)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    Ok(row.map(|(id, created_at, summary_text, raw_data)| {
        let data = decode_summary_data(&raw_data).unwrap_or_else(|| {
            tracing::warn!(summary_id = %id, "malformed pattern summary data, using defaults");
            PatternSummaryData::default()
        });
        PatternSummary {
            id,
            created_at,
            summary_text,
            data,
        }
    }))
}

/// Discount the memories and insert the summary in one transaction.
pub fn record_consolidation(
    conn: &Connection,
    memory_ids: &[String],
    factor: f64,
    summary_text: &str,
    data: &PatternSummaryData,
) -> StorageResult<PatternSummary> {
    let tx = conn.unchecked_transaction()?;
    for id in memory_ids {
        reduce_importance(&tx, id, factor)?;
    }
    let summary = insert_pattern_summary(&tx, summary_text, data)?;
    tx.commit()?;
    Ok(summary)
}

fn count(conn: &Connection, sql: &str) -> StorageResult<u64> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(n.max(0) as u64)
}

pub fn session_count(conn: &Connection) -> StorageResult<u64> {
    count(conn, "SELECT COUNT(*) FROM sessions")
}

pub fn completed_session_count(conn: &Connection) -> StorageResult<u64> {
    count(conn, "SELECT COUNT(*) FROM sessions WHERE status = 'completed'")
}

pub fn timer_completion_rate(conn: &Connection) -> StorageResult<f64> {
    let completed = completed_session_count(conn)?;
    if completed == 0 {
        return Ok(0.0);
    }
    let with_timer = count(
        conn,
        "SELECT COUNT(*) FROM sessions WHERE status = 'completed' AND timer_completed = 1",
    )?;
    Ok(with_timer as f64 / completed as f64)
}

pub fn avoidance_type_stats(conn: &Connection) -> StorageResult<Vec<TypeCount>> {
    let mut stmt = conn.prepare(
        "SELECT avoidance_type, COUNT(*) AS n FROM sessions \
         WHERE avoidance_type IS NOT NULL \
         GROUP BY avoidance_type \
         ORDER BY n DESC, MIN(created_at) ASC, MIN(rowid) ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let n: i64 = row.get(1)?;
            Ok(TypeCount {
                avoidance_type: row.get(0)?,
                count: n.max(0) as u64,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_session(
    conn: &Connection,
    task: Option<&str>,
    created_at: &DateTime<Utc>,
) -> StorageResult<Session> {
    let id = uuid::Uuid::now_v7().to_string();
    let ts = format_ts(created_at);
    conn.execute(
        "INSERT INTO sessions (id, created_at, updated_at, status, task) \
         VALUES (?1, ?2, ?2, 'in_progress', ?3)",
        params![id, ts, task],
    )?;
    Ok(Session {
        id,
        created_at: *created_at,
        updated_at: *created_at,
        status: SessionStatus::InProgress,
        task: task.map(str::to_string),
        avoidance_type: None,
        timer_completed: false,
        agentic_log: Vec::new(),
    })
}

pub fn get_session(conn: &Connection, id: &str) -> StorageResult<Option<Session>> {
    let session = conn
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
            params![id],
            row_to_session,
        )
        .optional()?;
    Ok(session)
}

pub fn apply_session_update(
    conn: &Connection,
    id: &str,
    update: &SessionUpdate,
) -> StorageResult<Session> {
    let log_json = update
        .agentic_log
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let rows = conn.execute(
        "UPDATE sessions SET updated_at = ?1, \
             status = COALESCE(?2, status), \
             task = COALESCE(?3, task), \
             avoidance_type = COALESCE(?4, avoidance_type), \
             timer_completed = COALESCE(?5, timer_completed), \
             agentic_log = COALESCE(?6, agentic_log) \
         WHERE id = ?7",
        params![
            format_ts(&Utc::now()),
            update.status.map(|s| s.as_str()),
            update.task,
            update.avoidance_type,
            update.timer_completed,
            log_json,
            id,
        ],
    )?;
    require_updated(rows, "session", id)?;
    get_session(conn, id)?.ok_or_else(|| StorageError::NotFound {
        kind: "session",
        id: id.to_string(),
    })
}

/// [`MemoryStore`] over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open (or create) the database file with schema and migrations applied.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(crate::db::open_database(path)?))
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(crate::db::open_memory_database()?))
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    /// Run a closure against the raw connection.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    pub fn create_session(&self, task: Option<&str>) -> StorageResult<Session> {
        self.create_session_at(task, Utc::now())
    }

    pub fn create_session_at(
        &self,
        task: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> StorageResult<Session> {
        insert_session(&*self.lock()?, task, &created_at)
    }

    pub fn get_session(&self, id: &str) -> StorageResult<Option<Session>> {
        get_session(&*self.lock()?, id)
    }

    pub fn update_session(&self, id: &str, update: &SessionUpdate) -> StorageResult<Session> {
        apply_session_update(&*self.lock()?, id, update)
    }
}

#[async_trait]
impl MemoryStore for SqliteStore {
    async fn create_memory(&self, memory: NewMemory) -> StorageResult<Memory> {
        insert_memory(&*self.lock()?, memory)
    }

    async fn get_all_memories(&self) -> StorageResult<Vec<Memory>> {
        all_memories(&*self.lock()?)
    }

    async fn get_memories_with_embeddings(&self) -> StorageResult<Vec<Memory>> {
        memories_with_embeddings(&*self.lock()?)
    }

    async fn increment_memory_access(&self, id: &str, at: DateTime<Utc>) -> StorageResult<()> {
        increment_access(&*self.lock()?, id, &at)
    }

    async fn reduce_memory_importance(&self, id: &str, factor: f64) -> StorageResult<()> {
        reduce_importance(&*self.lock()?, id, factor)
    }

    async fn update_memory_embedding(&self, id: &str, embedding: &[f32]) -> StorageResult<()> {
        set_embedding(&*self.lock()?, id, embedding)
    }

    async fn create_pattern_summary(
        &self,
        summary_text: &str,
        data: &PatternSummaryData,
    ) -> StorageResult<PatternSummary> {
        insert_pattern_summary(&*self.lock()?, summary_text, data)
    }

    async fn get_latest_pattern_summary(&self) -> StorageResult<Option<PatternSummary>> {
        latest_pattern_summary(&*self.lock()?)
    }

    async fn get_session_count(&self) -> StorageResult<u64> {
        session_count(&*self.lock()?)
    }

    async fn get_completed_session_count(&self) -> StorageResult<u64> {
        completed_session_count(&*self.lock()?)
    }

    async fn get_timer_completion_rate(&self) -> StorageResult<f64> {
        timer_completion_rate(&*self.lock()?)
    }

    async fn get_avoidance_type_stats(&self) -> StorageResult<Vec<TypeCount>> {
        avoidance_type_stats(&*self.lock()?)
    }

    async fn apply_consolidation(
        &self,
        memory_ids: &[String],
        factor: f64,
        summary_text: &str,
        data: &PatternSummaryData,
    ) -> StorageResult<PatternSummary> {
        record_consolidation(&*self.lock()?, memory_ids, factor, summary_text, data)
    }
}
