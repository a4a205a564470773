//! Adaptive memory for a behavioral-coaching assistant.
//!
//! recollect records what a coaching assistant learns about a user across
//! sessions (observations, patterns, insights, and periodic summaries) and
//! turns it back into a compact prompt context for the next conversation.
//!
//! | Type | Purpose |
//! |------|---------|
//! | **Observation** | Something noticed during a session |
//! | **Pattern** | A recurring behavior across sessions |
//! | **Insight** | A conclusion from the coaching loop |
//! | **Summary** | A consolidated digest, never consolidated again |
//!
//! # Architecture
//!
//! - **Ranking**: exponential time decay (half-life ≈ 13.9 days) plus bounded
//!   bonuses for access, tags, keywords, and avoidance type
//! - **Consolidation**: every 10th session, memories older than 30 days are
//!   digested into a pattern summary and their importance drops to 30%
//! - **Semantic search**: OpenAI-compatible embeddings (1536 dims), cosine
//!   similarity computed in process
//! - **Storage**: an async [`storage::MemoryStore`] port with SQLite and
//!   in-memory backends
//!
//! # Modules
//!
//! - [`config`]: configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, and migrations
//! - [`embedding`]: embedding provider trait, HTTP provider, and blob codec
//! - [`error`]: storage and embedding error types
//! - [`memory`]: scoring, consolidation, search, context assembly, and the write path
//! - [`storage`]: the storage port and its backends

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod storage;
