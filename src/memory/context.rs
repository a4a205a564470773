//! Prompt context assembly.
//!
//! [`build_memory_context`] renders everything the engine knows about the
//! user into one block of text for an LLM prompt. Sections appear in a fixed
//! order and are omitted when empty:
//!
//! 1. `--- User History ---`: session totals and avoidance-type statistics
//! 2. `--- Consolidated Patterns ---`: the latest pattern summary
//! 3. `--- Recent Memories (by relevance) ---`: decay-ranked top-K
//! 4. `--- Semantically Related Memories ---`: embedding matches not already
//!    listed in section 3
//!
//! Sections are separated by a blank line. A due consolidation runs before
//! anything is read. A semantic search failure only drops its section;
//! storage failures anywhere, consolidation included, abort the build.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::config::RecollectConfig;
use crate::embedding::EmbeddingService;
use crate::error::StorageResult;
use crate::memory::consolidate::{maybe_consolidate, ConsolidationOutcome};
use crate::memory::decay::{get_top_memories_at, RelevanceHints};
use crate::memory::patterns::analyze_patterns;
use crate::memory::search::{search_similar_memories, ScoredMemory, SearchOptions};
use crate::memory::types::Memory;
use crate::storage::MemoryStore;

/// Returned when no section has any content.
pub const FIRST_SESSION_FALLBACK: &str =
    "This is the user's first session. No prior history available.";

/// Relevance hints for the current request.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// What the user is working on now. Drives keyword boosts and semantic search.
    pub task_text: Option<String>,
    pub match_tags: Vec<String>,
    pub match_avoidance_type: Option<String>,
}

impl ContextOptions {
    fn task_text(&self) -> Option<&str> {
        self.task_text.as_deref().filter(|t| !t.trim().is_empty())
    }

    fn hints(&self) -> RelevanceHints {
        let base = match self.task_text() {
            Some(text) => RelevanceHints::from_task_text(text),
            None => RelevanceHints::default(),
        };
        base.with_tags(self.match_tags.iter().cloned())
            .with_avoidance_type(self.match_avoidance_type.clone())
    }
}

/// What happened to the semantic section.
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticStatus {
    /// The section was rendered with this many entries.
    Included(usize),
    /// Search ran but found nothing new above the threshold.
    Empty,
    /// No task text, or no embedding provider configured.
    Skipped,
    /// Search failed; the section was omitted.
    Failed(String),
}

/// Rendered context plus the degraded states observed while building it.
#[derive(Debug, Clone)]
pub struct MemoryContext {
    pub text: String,
    pub semantic: SemanticStatus,
    pub consolidation: ConsolidationOutcome,
    /// Ids listed in the recent-memories section.
    pub top_memory_ids: Vec<String>,
}

impl MemoryContext {
    pub fn is_first_session(&self) -> bool {
        self.text == FIRST_SESSION_FALLBACK
    }
}

/// Build the prompt context string.
pub async fn build_memory_context(
    store: &dyn MemoryStore,
    embeddings: &EmbeddingService,
    config: &RecollectConfig,
    options: &ContextOptions,
) -> StorageResult<String> {
    Ok(build_memory_context_report(store, embeddings, config, options)
        .await?
        .text)
}

/// [`build_memory_context`] that also reports what was degraded.
pub async fn build_memory_context_report(
    store: &dyn MemoryStore,
    embeddings: &EmbeddingService,
    config: &RecollectConfig,
    options: &ContextOptions,
) -> StorageResult<MemoryContext> {
    let now = Utc::now();

    // 0. Consolidation, if due
    let consolidation = maybe_consolidate(store, &config.consolidation, now).await?;

    let mut sections: Vec<Vec<String>> = Vec::new();

    // 1. User history
    let analysis = analyze_patterns(store).await?;
    if analysis.total_sessions > 0 {
        let mut lines = vec![
            "--- User History ---".to_string(),
            format!(
                "Sessions: {} total, {} completed.",
                analysis.total_sessions, analysis.completed_sessions
            ),
        ];
        if analysis.timer_completion_rate > 0.0 {
            lines.push(format!(
                "Timer completion rate: {}%.",
                analysis.timer_completion_percent()
            ));
        }
        if let Some(most_common) = &analysis.most_common_type {
            lines.push(format!(
                "Most common avoidance pattern: {} ({}%).",
                most_common,
                analysis.percentage_of(most_common)
            ));
        }
        if analysis.type_percentages.len() > 1 {
            lines.push(format!("Full breakdown: {}.", analysis.breakdown()));
        }
        sections.push(lines);
    }

    // 2. Consolidated patterns
    if let Some(summary) = store.get_latest_pattern_summary().await? {
        sections.push(vec![
            "--- Consolidated Patterns ---".to_string(),
            summary.summary_text,
        ]);
    }

    // 3. Decay-ranked memories
    let top = get_top_memories_at(store, config.retrieval.top_k, &options.hints(), now).await?;
    if !top.is_empty() {
        let mut lines = vec!["--- Recent Memories (by relevance) ---".to_string()];
        lines.extend(top.iter().map(format_recent));
        sections.push(lines);
    }
    let top_memory_ids: Vec<String> = top.into_iter().map(|m| m.id).collect();

    // 4. Semantic matches
    let semantic = match options.task_text() {
        Some(task) if embeddings.is_available() => {
            let search = SearchOptions {
                limit: config.retrieval.semantic_limit,
                min_similarity: config.retrieval.semantic_min_similarity,
            };
            match search_similar_memories(store, embeddings, task, search).await {
                Ok(similar) => {
                    let shown: HashSet<&str> = top_memory_ids.iter().map(String::as_str).collect();
                    let fresh: Vec<&ScoredMemory> = similar
                        .iter()
                        .filter(|s| !shown.contains(s.memory.id.as_str()))
                        .collect();
                    if fresh.is_empty() {
                        SemanticStatus::Empty
                    } else {
                        let mut lines = vec!["--- Semantically Related Memories ---".to_string()];
                        lines.extend(fresh.iter().map(|s| format_similar(s)));
                        sections.push(lines);
                        SemanticStatus::Included(fresh.len())
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "semantic search failed, section omitted");
                    SemanticStatus::Failed(e.to_string())
                }
            }
        }
        _ => SemanticStatus::Skipped,
    };

    let text = if sections.is_empty() {
        FIRST_SESSION_FALLBACK.to_string()
    } else {
        sections
            .iter()
            .map(|lines| lines.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    tracing::debug!(
        sections = sections.len(),
        recent = top_memory_ids.len(),
        ?semantic,
        "memory context built"
    );

    Ok(MemoryContext {
        text,
        semantic,
        consolidation,
        top_memory_ids,
    })
}

/// `M/D/YYYY`, no zero padding.
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%-m/%-d/%Y").to_string()
}

fn format_recent(memory: &Memory) -> String {
    format!(
        "[{} {}] {}",
        memory.memory_type.label(),
        format_date(memory.created_at),
        memory.content
    )
}

fn format_similar(scored: &ScoredMemory) -> String {
    format!(
        "[{}% match, {}] {}",
        (scored.similarity * 100.0).round() as i64,
        format_date(scored.memory.created_at),
        scored.memory.content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::MemoryType;
    use chrono::TimeZone;

    fn memory_at(memory_type: MemoryType, content: &str, at: DateTime<Utc>) -> Memory {
        Memory {
            id: "m1".into(),
            created_at: at,
            session_id: None,
            memory_type,
            content: content.into(),
            avoidance_type: None,
            importance: 1.0,
            access_count: 0,
            last_accessed_at: None,
            tags: Vec::new(),
            embedding: None,
        }
    }

    #[test]
    fn date_has_no_zero_padding() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(format_date(at), "3/7/2024");
        let at = Utc.with_ymd_and_hms(2024, 11, 23, 0, 0, 0).unwrap();
        assert_eq!(format_date(at), "11/23/2024");
    }

    #[test]
    fn recent_lines_use_type_labels() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(
            format_recent(&memory_at(MemoryType::Observation, "skipped standup", at)),
            "[Obs 3/7/2024] skipped standup"
        );
        assert_eq!(
            format_recent(&memory_at(MemoryType::Summary, "digest", at)),
            "[Summary 3/7/2024] digest"
        );
    }

    #[test]
    fn similar_lines_round_percentage() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let scored = ScoredMemory {
            memory: memory_at(MemoryType::Insight, "walks help", at),
            similarity: 0.8251,
        };
        assert_eq!(format_similar(&scored), "[83% match, 1/2/2024] walks help");
    }

    #[test]
    fn blank_task_text_is_ignored() {
        let options = ContextOptions {
            task_text: Some("   ".into()),
            ..Default::default()
        };
        assert!(options.task_text().is_none());
        assert!(options.hints().keywords.is_empty());
    }

    #[test]
    fn hints_merge_all_sources() {
        let options = ContextOptions {
            task_text: Some("finish quarterly taxes".into()),
            match_tags: vec!["finance".into()],
            match_avoidance_type: Some("Overwhelm".into()),
        };
        let hints = options.hints();
        assert_eq!(hints.keywords, vec!["finish", "quarterly", "taxes"]);
        assert_eq!(hints.tags, vec!["finance"]);
        assert_eq!(hints.avoidance_type.as_deref(), Some("Overwhelm"));
    }
}
