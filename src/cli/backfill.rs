//! CLI `backfill` command: embed memories stored without a vector.

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};

use recollect::config::RecollectConfig;
use recollect::db::migrations;
use recollect::memory::store::backfill_embeddings_with_progress;
use recollect::storage::MemoryStore;

pub async fn backfill(config: &RecollectConfig, batch_size: usize) -> Result<()> {
    let store = super::open_store(config)?;
    let embeddings = super::embedding_service(config)?;

    if !embeddings.is_available() {
        bail!(
            "backfill needs an embedding credential; set {}",
            config.embedding.api_key_env
        );
    }

    println!(
        "Embedding up to {batch_size} memories with model '{}'...",
        config.embedding.model
    );

    // The recorded model only changes when no vector from another model remains.
    let had_vectors = !store.get_memories_with_embeddings().await?.is_empty();

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let report = backfill_embeddings_with_progress(&store, &embeddings, batch_size, |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })
    .await?;

    pb.finish_and_clear();

    if report.missing == 0 {
        println!("All memories already have embeddings.");
        return Ok(());
    }

    println!(
        "Embedded {} of {} attempted ({} failed). {} still without embeddings.",
        report.embedded,
        report.attempted,
        report.failed,
        report.remaining()
    );

    if !had_vectors && report.embedded > 0 {
        if let Some(model) = embeddings.model() {
            store.with_connection(|conn| Ok(migrations::set_embedding_model(conn, model)?))?;
        }
    }
    Ok(())
}
