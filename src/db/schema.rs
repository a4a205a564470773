//! SQL DDL for all recollect tables.
//!
//! Defines the `sessions`, `memories`, `pattern_summaries`, and `schema_meta`
//! tables. All DDL uses `IF NOT EXISTS` for idempotent initialization. The
//! `embedding` column on `memories` is added by migration v2 and the
//! `agentic_log` column on `sessions` by migration v3.

use rusqlite::Connection;

/// All schema DDL statements for the version-1 tables.
const SCHEMA_SQL: &str = r#"
-- Coaching sessions, owned by the application
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'in_progress' CHECK(status IN ('in_progress','completed','abandoned')),
    task TEXT,
    avoidance_type TEXT,
    timer_completed INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status);

-- Atomic recallable facts
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    session_id TEXT REFERENCES sessions(id),
    type TEXT NOT NULL CHECK(type IN ('observation','pattern','insight','summary')),
    content TEXT NOT NULL,
    avoidance_type TEXT,
    importance REAL NOT NULL DEFAULT 1.0 CHECK(importance >= 0.0),
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed_at TEXT,
    tags TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_memories_session ON memories(session_id);
CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(type);
CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);

-- Consolidation artifacts
CREATE TABLE IF NOT EXISTS pattern_summaries (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    summary_text TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}'
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
