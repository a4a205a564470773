use anyhow::{bail, Result};

use recollect::config::RecollectConfig;
use recollect::memory::context::format_date;
use recollect::memory::search::{search_similar_memories, SearchOptions};
use recollect::memory::truncate_chars;

/// Run a semantic search from the terminal.
pub async fn search(
    config: &RecollectConfig,
    query: &str,
    limit: usize,
    min_similarity: f64,
) -> Result<()> {
    let store = super::open_store(config)?;
    let embeddings = super::embedding_service(config)?;

    if !embeddings.is_available() {
        bail!(
            "semantic search needs an embedding credential; set {}",
            config.embedding.api_key_env
        );
    }

    let options = SearchOptions {
        limit,
        min_similarity,
    };
    let results = search_similar_memories(&store, &embeddings, query, options).await?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());

    for (i, result) in results.iter().enumerate() {
        println!(
            "  {}. [{}] {} (similarity: {:.2}, {})",
            i + 1,
            result.memory.memory_type,
            result.memory.id,
            result.similarity,
            format_date(result.memory.created_at),
        );
        println!("     {}", truncate_chars(&result.memory.content, 120));
        println!();
    }

    Ok(())
}
