//! CLI `remember` command: store a single memory.

use anyhow::Result;

use recollect::config::RecollectConfig;
use recollect::memory::store::{store_memory, EmbeddingStatus, StoreMemoryInput};

pub async fn remember(config: &RecollectConfig, input: StoreMemoryInput) -> Result<()> {
    let store = super::open_store(config)?;
    let embeddings = super::embedding_service(config)?;

    let stored = store_memory(&store, &embeddings, input).await?;

    println!("Stored {} {}", stored.memory.memory_type, stored.memory.id);
    if !stored.memory.tags.is_empty() {
        println!("  tags: {}", stored.memory.tags.join(", "));
    }
    match &stored.embedding {
        EmbeddingStatus::Embedded => println!("  embedding: stored"),
        EmbeddingStatus::Unavailable => {
            println!("  embedding: skipped (no provider credential)")
        }
        EmbeddingStatus::Failed(reason) => {
            println!("  embedding: failed ({reason}); run `recollect backfill` later")
        }
    }
    Ok(())
}
