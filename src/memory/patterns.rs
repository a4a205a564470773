//! Aggregate behavioral statistics over recorded sessions.

use serde::Serialize;

use crate::error::StorageResult;
use crate::memory::types::TypeCount;
use crate::storage::MemoryStore;

/// One avoidance type's share of all classified sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypePercentage {
    pub avoidance_type: String,
    /// Whole percent, rounded half up.
    pub percentage: u32,
}

/// Response from analyze_patterns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternAnalysis {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    /// Fraction in `[0, 1]` of completed sessions whose timer also finished.
    pub timer_completion_rate: f64,
    pub most_common_type: Option<String>,
    /// Ordered by count descending, ties in first-seen order.
    pub type_distribution: Vec<TypeCount>,
    /// Same order as `type_distribution`.
    pub type_percentages: Vec<TypePercentage>,
}

impl PatternAnalysis {
    pub fn percentage_of(&self, avoidance_type: &str) -> u32 {
        self.type_percentages
            .iter()
            .find(|p| p.avoidance_type == avoidance_type)
            .map(|p| p.percentage)
            .unwrap_or(0)
    }

    /// `"a: x%, b: y%"` in distribution order.
    pub fn breakdown(&self) -> String {
        self.type_percentages
            .iter()
            .map(|p| format!("{}: {}%", p.avoidance_type, p.percentage))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Timer completion rate as a whole percent.
    pub fn timer_completion_percent(&self) -> u32 {
        (self.timer_completion_rate * 100.0).round() as u32
    }
}

/// Integer percentage of `count` in `total`, rounded half up.
pub fn percent(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count * 200 + total) / (2 * total)) as u32
}

/// Compute session statistics. Pure read.
pub async fn analyze_patterns(store: &dyn MemoryStore) -> StorageResult<PatternAnalysis> {
    let total_sessions = store.get_session_count().await?;
    let completed_sessions = store.get_completed_session_count().await?;
    let timer_completion_rate = store.get_timer_completion_rate().await?;
    let type_distribution = store.get_avoidance_type_stats().await?;

    let mut most_common_type: Option<String> = None;
    let mut max_count = 0;
    for entry in &type_distribution {
        if entry.count > max_count {
            max_count = entry.count;
            most_common_type = Some(entry.avoidance_type.clone());
        }
    }

    let total_typed: u64 = type_distribution.iter().map(|t| t.count).sum();
    let type_percentages = type_distribution
        .iter()
        .map(|t| TypePercentage {
            avoidance_type: t.avoidance_type.clone(),
            percentage: percent(t.count, total_typed),
        })
        .collect();

    Ok(PatternAnalysis {
        total_sessions,
        completed_sessions,
        timer_completion_rate,
        most_common_type,
        type_distribution,
        type_percentages,
    })
}
