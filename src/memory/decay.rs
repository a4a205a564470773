//! Time-decay relevance scoring and top-K selection.
//!
//! A memory's score is its importance decayed exponentially by age, plus
//! bounded bonuses for past access, tag overlap, keyword overlap, and a
//! matching avoidance type. [`get_top_memories`] ranks every stored memory
//! by that score and records an access on each one it returns, so surfaced
//! memories drift slightly upward over time (bounded by the access cap).

use chrono::{DateTime, Utc};

use crate::error::StorageResult;
use crate::memory::keywords::extract_keywords;
use crate::memory::types::{Memory, MemoryType};
use crate::storage::MemoryStore;

// ── Decay parameters ─────────────────────────────────────────────────────────

/// Decay rate per day.
pub const LAMBDA: f64 = 0.05;
pub const ACCESS_BONUS_PER: f64 = 0.1;
pub const ACCESS_BONUS_CAP: u32 = 5;
pub const TAG_MATCH_BONUS: f64 = 0.15;
pub const MAX_TAG_BONUS: f64 = 0.6;
pub const KEYWORD_MATCH_BONUS: f64 = 0.1;
pub const MAX_KEYWORD_BONUS: f64 = 0.5;
pub const TYPE_MATCH_BONUS: f64 = 0.2;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Optional boosts applied on top of the decayed base score.
#[derive(Debug, Clone, Default)]
pub struct RelevanceHints {
    pub tags: Vec<String>,
    /// Matched as lowercase substrings of the memory content.
    pub keywords: Vec<String>,
    pub avoidance_type: Option<String>,
}

impl RelevanceHints {
    /// Hints whose keywords are extracted from a free-text task description.
    pub fn from_task_text(text: &str) -> Self {
        Self {
            keywords: extract_keywords(text),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_avoidance_type(mut self, avoidance_type: Option<String>) -> Self {
        self.avoidance_type = avoidance_type;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.keywords.is_empty() && self.avoidance_type.is_none()
    }
}

/// Half-life of the base score in days: ln 2 / λ.
pub fn half_life_days() -> f64 {
    std::f64::consts::LN_2 / LAMBDA
}

/// Fractional days between `created_at` and `now`.
fn days_since(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - created_at).num_milliseconds() as f64 / MS_PER_DAY
}

/// Score a single memory at `now`.
pub fn calculate_decay_score(memory: &Memory, now: DateTime<Utc>, hints: &RelevanceHints) -> f64 {
    let decay_factor = (-LAMBDA * days_since(memory.created_at, now)).exp();

    let access_bonus = ACCESS_BONUS_PER * memory.access_count.min(ACCESS_BONUS_CAP) as f64;

    let tag_bonus = if hints.tags.is_empty() {
        0.0
    } else {
        let matched = hints
            .tags
            .iter()
            .filter(|tag| memory.tags.iter().any(|mt| mt.to_lowercase() == tag.to_lowercase()))
            .count();
        (matched as f64 * TAG_MATCH_BONUS).min(MAX_TAG_BONUS)
    };

    let keyword_bonus = if hints.keywords.is_empty() {
        0.0
    } else {
        let content = memory.content.to_lowercase();
        let matched = hints
            .keywords
            .iter()
            .filter(|kw| content.contains(&kw.to_lowercase()))
            .count();
        (matched as f64 * KEYWORD_MATCH_BONUS).min(MAX_KEYWORD_BONUS)
    };

    let type_bonus = match (&hints.avoidance_type, &memory.avoidance_type) {
        (Some(wanted), Some(actual)) if wanted.to_lowercase() == actual.to_lowercase() => {
            TYPE_MATCH_BONUS
        }
        _ => 0.0,
    };

    memory.importance * decay_factor + access_bonus + tag_bonus + keyword_bonus + type_bonus
}

/// Score and rank, keeping fetch order (newest first) for equal scores.
fn rank(memories: Vec<Memory>, now: DateTime<Utc>, hints: &RelevanceHints) -> Vec<Memory> {
    let mut scored: Vec<(Memory, f64)> = memories
        .into_iter()
        .map(|m| {
            let score = calculate_decay_score(&m, now, hints);
            (m, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.into_iter().map(|(m, _)| m).collect()
}

// ── Selection ────────────────────────────────────────────────────────────────

/// Return the `limit` highest-scoring memories and record an access on each.
pub async fn get_top_memories(
    store: &dyn MemoryStore,
    limit: usize,
    hints: &RelevanceHints,
) -> StorageResult<Vec<Memory>> {
    get_top_memories_at(store, limit, hints, Utc::now()).await
}

/// [`get_top_memories`] with an explicit clock.
///
/// The returned copies already reflect the access increment.
pub async fn get_top_memories_at(
    store: &dyn MemoryStore,
    limit: usize,
    hints: &RelevanceHints,
    now: DateTime<Utc>,
) -> StorageResult<Vec<Memory>> {
    let all = store.get_all_memories().await?;
    let candidates = all.len();

    let mut top = rank(all, now, hints);
    top.truncate(limit);

    for memory in &mut top {
        store.increment_memory_access(&memory.id, now).await?;
        memory.access_count += 1;
        memory.last_accessed_at = Some(now);
    }

    tracing::debug!(candidates, returned = top.len(), "top memories selected");
    Ok(top)
}

/// Rank memories of one type. Read-only: no access is recorded.
pub async fn get_memories_by_type(
    store: &dyn MemoryStore,
    memory_type: MemoryType,
    limit: usize,
    hints: &RelevanceHints,
) -> StorageResult<Vec<Memory>> {
    let filtered: Vec<Memory> = store
        .get_all_memories()
        .await?
        .into_iter()
        .filter(|m| m.memory_type == memory_type)
        .collect();

    let mut ranked = rank(filtered, Utc::now(), hints);
    ranked.truncate(limit);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn memory(days_old: i64, now: DateTime<Utc>) -> Memory {
        Memory {
            id: format!("m-{days_old}"),
            created_at: now - Duration::days(days_old),
            session_id: None,
            memory_type: MemoryType::Observation,
            content: "Stalled on the quarterly budget spreadsheet".into(),
            avoidance_type: Some("Perfectionism".into()),
            importance: 1.0,
            access_count: 0,
            last_accessed_at: None,
            tags: vec!["Work".into(), "finance".into()],
            embedding: None,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn fresh_memory_scores_its_importance() {
        let now = Utc::now();
        let m = memory(0, now);
        assert!(close(calculate_decay_score(&m, now, &RelevanceHints::default()), 1.0));
    }

    #[test]
    fn score_halves_after_half_life() {
        assert!((half_life_days() - 13.8629).abs() < 1e-3);
        let now = Utc::now();
        let mut m = memory(0, now);
        m.created_at = now - Duration::milliseconds((half_life_days() * MS_PER_DAY) as i64);
        let score = calculate_decay_score(&m, now, &RelevanceHints::default());
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn score_strictly_decreases_with_age() {
        let now = Utc::now();
        let hints = RelevanceHints::default();
        let scores: Vec<f64> = [0, 1, 10, 40, 365]
            .iter()
            .map(|d| calculate_decay_score(&memory(*d, now), now, &hints))
            .collect();
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn access_bonus_is_capped_at_five() {
        let now = Utc::now();
        let mut m = memory(0, now);
        m.access_count = 3;
        assert!(close(calculate_decay_score(&m, now, &RelevanceHints::default()), 1.3));
        m.access_count = 50;
        assert!(close(calculate_decay_score(&m, now, &RelevanceHints::default()), 1.5));
    }

    #[test]
    fn tag_match_is_case_insensitive_and_capped() {
        let now = Utc::now();
        let mut m = memory(0, now);
        let one = RelevanceHints::default().with_tags(["WORK"]);
        assert!(close(calculate_decay_score(&m, now, &one), 1.15));

        m.tags = (0..10).map(|i| format!("t{i}")).collect();
        let many = RelevanceHints::default().with_tags((0..10).map(|i| format!("T{i}")));
        assert!(close(calculate_decay_score(&m, now, &many), 1.6));
    }

    #[test]
    fn keyword_bonus_uses_substrings_and_caps() {
        let now = Utc::now();
        let m = memory(0, now);
        let hints = RelevanceHints::from_task_text("finish the budget spreadsheet");
        // "finish" misses; "budget" and "spreadsheet" hit.
        assert!(close(calculate_decay_score(&m, now, &hints), 1.2));

        let hints = RelevanceHints {
            keywords: ["sta", "quar", "bud", "spr", "lled", "the"]
                .map(String::from)
                .to_vec(),
            ..RelevanceHints::default()
        };
        assert!(close(calculate_decay_score(&m, now, &hints), 1.5));
    }

    #[test]
    fn avoidance_type_bonus_requires_both_sides() {
        let now = Utc::now();
        let mut m = memory(0, now);
        let hints = RelevanceHints::default().with_avoidance_type(Some("perfectionism".into()));
        assert!(close(calculate_decay_score(&m, now, &hints), 1.2));

        m.avoidance_type = None;
        assert!(close(calculate_decay_score(&m, now, &hints), 1.0));
    }

    #[test]
    fn rank_keeps_fetch_order_on_ties() {
        let now = Utc::now();
        let mut a = memory(0, now);
        a.id = "newer".into();
        let mut b = memory(0, now);
        b.id = "older".into();
        let ranked = rank(vec![a, b], now, &RelevanceHints::default());
        assert_eq!(ranked[0].id, "newer");
        assert_eq!(ranked[1].id, "older");
    }
}
