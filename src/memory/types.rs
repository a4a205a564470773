//! Core record definitions.
//!
//! Defines [`MemoryType`] (the four memory categories), [`Memory`] (a full
//! record), [`NewMemory`] (a creation payload), [`PatternSummary`] (the
//! consolidation artifact), and the [`Session`] view the engine aggregates
//! over, with its [`AgenticTurn`] log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The four memory categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Something noticed about the user during a session.
    Observation,
    /// A recurring behavior surfaced across sessions.
    Pattern,
    /// A conclusion produced by the agentic coaching loop.
    Insight,
    /// A compacted digest. Never consolidated again.
    Summary,
}

impl MemoryType {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Observation => "observation",
            Self::Pattern => "pattern",
            Self::Insight => "insight",
            Self::Summary => "summary",
        }
    }

    /// Short label used when rendering a memory into prompt context.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Observation => "Obs",
            Self::Pattern => "Pattern",
            Self::Insight => "Insight",
            Self::Summary => "Summary",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "observation" => Ok(Self::Observation),
            "pattern" => Ok(Self::Pattern),
            "insight" => Ok(Self::Insight),
            "summary" => Ok(Self::Summary),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

/// A memory record, matching the `memories` table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Session that produced this memory. Not an ownership link.
    pub session_id: Option<String>,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub content: String,
    /// Classification label, e.g. `"Perfectionism"`.
    pub avoidance_type: Option<String>,
    /// Ranking weight. Starts at 1.0 and only ever shrinks through consolidation.
    pub importance: f64,
    /// Number of times this memory was surfaced by top-K selection.
    pub access_count: u32,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    /// 1536-dim vector, `None` until an embedding has been generated.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

/// Payload for creating a memory through the storage port.
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub session_id: Option<String>,
    pub memory_type: MemoryType,
    pub content: String,
    pub avoidance_type: Option<String>,
    pub importance: f64,
    pub tags: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl NewMemory {
    /// A memory created now with default importance, no tags, and no embedding.
    pub fn new(memory_type: MemoryType, content: impl Into<String>) -> Self {
        Self {
            session_id: None,
            memory_type,
            content: content.into(),
            avoidance_type: None,
            importance: 1.0,
            tags: Vec::new(),
            embedding: None,
            created_at: Utc::now(),
        }
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn avoidance_type(mut self, avoidance_type: impl Into<String>) -> Self {
        self.avoidance_type = Some(avoidance_type.into());
        self
    }

    /// Set the starting weight. Negative and NaN values are stored as 0.
    pub fn importance(mut self, importance: f64) -> Self {
        self.importance = importance.max(0.0);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Structured snapshot stored alongside a pattern summary's text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatternSummaryData {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub type_distribution: BTreeMap<String, u64>,
    pub timer_completion_rate: f64,
    pub consolidated_memory_count: usize,
}

/// A consolidation artifact, matching the `pattern_summaries` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub summary_text: String,
    pub data: PatternSummaryData,
}

/// Lifecycle state of a coaching session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "abandoned" => Ok(Self::Abandoned),
            _ => Err(format!("unknown session status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    Ai,
    User,
}

/// What the coaching loop decided to do on an AI turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    AskFollowup,
    SurfacePattern,
    RefineTask,
    SuggestAction,
    OfferTimer,
    EndSession,
}

/// One exchange in a session's coaching log, stored in `sessions.agentic_log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgenticTurn {
    pub role: TurnRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<AgentAction>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// The slice of an application session the engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub task: Option<String>,
    pub avoidance_type: Option<String>,
    pub timer_completed: bool,
    /// Coaching turns in order. Empty when the stored log is missing or unreadable.
    pub agentic_log: Vec<AgenticTurn>,
}

/// Field updates applied to an existing session. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub status: Option<SessionStatus>,
    pub task: Option<String>,
    pub avoidance_type: Option<String>,
    pub timer_completed: Option<bool>,
    /// Replaces the whole log.
    pub agentic_log: Option<Vec<AgenticTurn>>,
}

/// One histogram bucket: how many sessions were classified with a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    pub avoidance_type: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_type_round_trips_through_str() {
        for t in [
            MemoryType::Observation,
            MemoryType::Pattern,
            MemoryType::Insight,
            MemoryType::Summary,
        ] {
            assert_eq!(t.as_str().parse::<MemoryType>().unwrap(), t);
        }
        assert!("episodic".parse::<MemoryType>().is_err());
    }

    #[test]
    fn new_memory_defaults() {
        let m = NewMemory::new(MemoryType::Observation, "put off the tax forms");
        assert_eq!(m.importance, 1.0);
        assert!(m.tags.is_empty());
        assert!(m.embedding.is_none());
        assert!(m.session_id.is_none());
    }

    #[test]
    fn importance_is_clamped_at_zero() {
        let m = NewMemory::new(MemoryType::Insight, "x").importance(-2.5);
        assert_eq!(m.importance, 0.0);
        let m = NewMemory::new(MemoryType::Insight, "x").importance(f64::NAN);
        assert_eq!(m.importance, 0.0);
        let m = NewMemory::new(MemoryType::Insight, "x").importance(0.7);
        assert_eq!(m.importance, 0.7);
    }

    #[test]
    fn agentic_turn_uses_snake_case_labels() {
        let json = r#"{"role":"ai","action":"offer_timer","message":"Try two minutes?",
            "timestamp":"2025-03-01T09:30:00.000Z"}"#;
        let turn: AgenticTurn = serde_json::from_str(json).unwrap();
        assert_eq!(turn.role, TurnRole::Ai);
        assert_eq!(turn.action, Some(AgentAction::OfferTimer));

        let user: AgenticTurn = serde_json::from_str(
            r#"{"role":"user","message":"ok","timestamp":"2025-03-01T09:31:00Z"}"#,
        )
        .unwrap();
        assert!(user.action.is_none());
        assert!(!serde_json::to_string(&user).unwrap().contains("action"));
    }

    #[test]
    fn summary_data_tolerates_missing_fields() {
        let data: PatternSummaryData = serde_json::from_str(r#"{"totalSessions": 20}"#).unwrap();
        assert_eq!(data.total_sessions, 20);
        assert!(data.type_distribution.is_empty());
        assert_eq!(data.consolidated_memory_count, 0);
    }
}
