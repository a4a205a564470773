//! CLI `consolidate` command: digest aged memories into a pattern summary.

use anyhow::Result;
use chrono::Utc;

use recollect::config::RecollectConfig;
use recollect::memory::consolidate::{consolidate_memories, maybe_consolidate, ConsolidationOutcome};

/// Consolidate if due, or unconditionally with `force`.
pub async fn consolidate(config: &RecollectConfig, force: bool) -> Result<()> {
    let store = super::open_store(config)?;
    let now = Utc::now();

    let outcome = if force {
        consolidate_memories(&store, &config.consolidation, now).await?
    } else {
        maybe_consolidate(&store, &config.consolidation, now).await?
    };

    match outcome {
        ConsolidationOutcome::NotDue { session_count } => println!(
            "Not due: {session_count} sessions recorded, consolidation runs every {}. \
             Use --force to run anyway.",
            config.consolidation.session_interval
        ),
        ConsolidationOutcome::AlreadyConsolidated { session_count } => {
            println!("Already consolidated at {session_count} sessions.")
        }
        ConsolidationOutcome::NoSessions => println!("No sessions recorded yet."),
        ConsolidationOutcome::NothingToConsolidate => println!(
            "No memories older than {} days.",
            config.consolidation.age_days
        ),
        ConsolidationOutcome::Consolidated {
            summary_id,
            consolidated_memory_count,
        } => println!(
            "Consolidated {consolidated_memory_count} memories into summary {summary_id}."
        ),
    }

    Ok(())
}
