//! Periodic compaction of aged memories into a pattern summary.
//!
//! Every [`CONSOLIDATION_INTERVAL`] sessions, memories older than the
//! configured age window are digested into one [`PatternSummary`] and their
//! importance is multiplied down so that fresher material outranks them.
//! Summaries themselves are never consolidated again.
//!
//! [`PatternSummary`]: crate::memory::types::PatternSummary

use chrono::{DateTime, Duration, Utc};

use crate::config::ConsolidationConfig;
use crate::error::StorageResult;
use crate::memory::patterns::{analyze_patterns, PatternAnalysis};
use crate::memory::truncate_chars;
use crate::memory::types::{Memory, MemoryType, PatternSummaryData};
use crate::storage::MemoryStore;

/// Consolidate on every exact multiple of this many sessions.
pub const CONSOLIDATION_INTERVAL: u64 = 10;

/// Observation excerpts longer than this are cut in the summary text.
const EXCERPT_MAX_CHARS: usize = 240;

/// What a consolidation attempt did.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsolidationOutcome {
    /// Session count is not a multiple of the interval.
    NotDue { session_count: u64 },
    /// The latest summary already covers this session count.
    AlreadyConsolidated { session_count: u64 },
    /// No sessions recorded yet; nothing was written.
    NoSessions,
    /// No memory is old enough; nothing was written.
    NothingToConsolidate,
    Consolidated {
        summary_id: String,
        consolidated_memory_count: usize,
    },
}

impl ConsolidationOutcome {
    pub fn wrote_summary(&self) -> bool {
        matches!(self, Self::Consolidated { .. })
    }
}

/// `true` iff `session_count` is a positive exact multiple of the interval.
pub fn consolidation_due(session_count: u64) -> bool {
    due_every(session_count, CONSOLIDATION_INTERVAL)
}

fn due_every(session_count: u64, interval: u64) -> bool {
    interval > 0 && session_count > 0 && session_count % interval == 0
}

/// Check the trigger against the store's current session count.
pub async fn should_consolidate(
    store: &dyn MemoryStore,
    config: &ConsolidationConfig,
) -> StorageResult<bool> {
    let session_count = store.get_session_count().await?;
    Ok(due_every(session_count, config.session_interval))
}

/// Digest every non-summary memory older than the age window.
///
/// Scales each candidate's importance by `config.importance_factor` and
/// records one pattern summary, through [`MemoryStore::apply_consolidation`].
/// The summary is written last, so a failed run leaves nothing that
/// [`maybe_consolidate`] would mistake for a finished one. Does nothing when
/// no sessions exist or no memory is old enough.
pub async fn consolidate_memories(
    store: &dyn MemoryStore,
    config: &ConsolidationConfig,
    now: DateTime<Utc>,
) -> StorageResult<ConsolidationOutcome> {
    // 1. Session statistics
    let analysis = analyze_patterns(store).await?;
    if analysis.total_sessions == 0 {
        return Ok(ConsolidationOutcome::NoSessions);
    }

    // 2. Candidates: aged, non-summary
    let cutoff = now - Duration::days(config.age_days);
    let candidates: Vec<Memory> = store
        .get_all_memories()
        .await?
        .into_iter()
        .filter(|m| m.created_at < cutoff && m.memory_type != MemoryType::Summary)
        .collect();

    if candidates.is_empty() {
        tracing::debug!(age_days = config.age_days, "no memories old enough to consolidate");
        return Ok(ConsolidationOutcome::NothingToConsolidate);
    }

    // 3. Build the digest
    let text = summary_text(&analysis, &candidates, config.max_observation_excerpts);
    let data = PatternSummaryData {
        total_sessions: analysis.total_sessions,
        completed_sessions: analysis.completed_sessions,
        type_distribution: analysis
            .type_distribution
            .iter()
            .map(|t| (t.avoidance_type.clone(), t.count))
            .collect(),
        timer_completion_rate: analysis.timer_completion_rate,
        consolidated_memory_count: candidates.len(),
    };

    // 4. Discount the candidates, then record the summary
    let ids: Vec<String> = candidates.iter().map(|m| m.id.clone()).collect();
    let summary = store
        .apply_consolidation(&ids, config.importance_factor, &text, &data)
        .await?;

    tracing::info!(
        summary_id = %summary.id,
        consolidated = candidates.len(),
        total_sessions = analysis.total_sessions,
        "memories consolidated"
    );

    Ok(ConsolidationOutcome::Consolidated {
        summary_id: summary.id,
        consolidated_memory_count: candidates.len(),
    })
}

/// Consolidate if the trigger fires and this session count has not already
/// been consolidated.
///
/// The check and the write are separate store calls; two processes racing
/// here can still both consolidate.
pub async fn maybe_consolidate(
    store: &dyn MemoryStore,
    config: &ConsolidationConfig,
    now: DateTime<Utc>,
) -> StorageResult<ConsolidationOutcome> {
    let session_count = store.get_session_count().await?;
    if !due_every(session_count, config.session_interval) {
        return Ok(ConsolidationOutcome::NotDue { session_count });
    }

    if let Some(latest) = store.get_latest_pattern_summary().await? {
        if latest.data.total_sessions == session_count {
            tracing::debug!(session_count, "consolidation already ran for this session count");
            return Ok(ConsolidationOutcome::AlreadyConsolidated { session_count });
        }
    }

    consolidate_memories(store, config, now).await
}

/// Build the human-readable digest, sentences separated by a space.
fn summary_text(analysis: &PatternAnalysis, candidates: &[Memory], max_excerpts: usize) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(most_common) = &analysis.most_common_type {
        parts.push(format!(
            "Most common avoidance type: {} ({}% of sessions).",
            most_common,
            analysis.percentage_of(most_common)
        ));
    }

    parts.push(format!(
        "{} total sessions, {} completed.",
        analysis.total_sessions, analysis.completed_sessions
    ));

    if analysis.timer_completion_rate > 0.0 {
        parts.push(format!(
            "Timer completion rate: {}%.",
            analysis.timer_completion_percent()
        ));
    }

    if analysis.type_percentages.len() > 1 {
        parts.push(format!("Type breakdown: {}.", analysis.breakdown()));
    }

    let excerpts: Vec<String> = candidates
        .iter()
        .filter(|m| m.memory_type == MemoryType::Observation)
        .take(max_excerpts)
        .map(|m| truncate_chars(&m.content, EXCERPT_MAX_CHARS))
        .collect();
    if !excerpts.is_empty() {
        parts.push(format!("Key past observations: {}", excerpts.join("; ")));
    }

    parts.join(" ")
}
