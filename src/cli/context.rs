//! CLI `context` command: print the prompt context for the next coaching turn.

use anyhow::Result;

use recollect::config::RecollectConfig;
use recollect::memory::context::{build_memory_context_report, ContextOptions, SemanticStatus};

/// Build the context and write it to stdout.
pub async fn context(
    config: &RecollectConfig,
    task: Option<String>,
    tags: Vec<String>,
    avoidance_type: Option<String>,
) -> Result<()> {
    let store = super::open_store(config)?;
    let embeddings = super::embedding_service(config)?;

    let options = ContextOptions {
        task_text: task,
        match_tags: tags,
        match_avoidance_type: avoidance_type,
    };
    let report = build_memory_context_report(&store, &embeddings, config, &options).await?;

    if let SemanticStatus::Failed(reason) = &report.semantic {
        eprintln!("note: semantic section omitted ({reason})");
    }

    println!("{}", report.text);
    Ok(())
}
