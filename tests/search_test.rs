mod helpers;

use helpers::{
    aged, embedding_near, service, test_embedding, test_store, FailingEmbedder, FlakyEmbedder,
    ScriptedEmbedder,
};
use recollect::embedding::EmbeddingService;
use recollect::error::{EmbeddingError, MemoryError};
use recollect::memory::search::{search_similar_memories, SearchOptions};
use recollect::memory::store::{
    backfill_embeddings, store_memory, BackfillReport, EmbeddingStatus, StoreMemoryInput,
};
use recollect::memory::types::MemoryType;
use recollect::storage::MemoryStore;

#[tokio::test]
async fn results_are_filtered_sorted_and_limited() {
    let store = test_store();
    let scored = [("weak", 0.2f32), ("strong", 0.95), ("medium", 0.6), ("fair", 0.5)];
    for (content, similarity) in scored {
        store
            .create_memory(
                aged(MemoryType::Observation, content, 1).embedding(embedding_near(10, similarity)),
            )
            .await
            .unwrap();
    }
    // No vector: never a candidate.
    store
        .create_memory(aged(MemoryType::Observation, "unembedded", 1))
        .await
        .unwrap();

    let embeddings = service(ScriptedEmbedder::new(test_embedding(10)));
    let results = search_similar_memories(
        &store,
        &embeddings,
        "anything",
        SearchOptions {
            limit: 2,
            min_similarity: 0.3,
        },
    )
    .await
    .unwrap();

    let contents: Vec<&str> = results.iter().map(|r| r.memory.content.as_str()).collect();
    assert_eq!(contents, vec!["strong", "medium"]);
    assert!(results.iter().all(|r| r.similarity >= 0.3));
    assert!(results[0].similarity >= results[1].similarity);
}

#[tokio::test]
async fn empty_store_returns_no_results() {
    let store = test_store();
    let embeddings = service(ScriptedEmbedder::new(test_embedding(0)));
    let results = search_similar_memories(&store, &embeddings, "q", SearchOptions::default())
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn search_is_read_only() {
    let store = test_store();
    let m = store
        .create_memory(
            aged(MemoryType::Insight, "batching chores helps", 1).embedding(test_embedding(4)),
        )
        .await
        .unwrap();

    let embeddings = service(ScriptedEmbedder::new(test_embedding(4)));
    search_similar_memories(&store, &embeddings, "chores", SearchOptions::default())
        .await
        .unwrap();

    let after = store.get_all_memories().await.unwrap();
    assert_eq!(after[0].id, m.id);
    assert_eq!(after[0].access_count, 0);
}

#[tokio::test]
async fn provider_errors_propagate_from_search() {
    let store = test_store();
    let failing = service(FailingEmbedder);
    let err = search_similar_memories(&store, &failing, "q", SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MemoryError::Embedding(EmbeddingError::Provider { status: 429, .. })
    ));

    let disabled = EmbeddingService::disabled();
    let err = search_similar_memories(&store, &disabled, "q", SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::Embedding(EmbeddingError::Unavailable(_))));
}

#[tokio::test]
async fn store_memory_embeds_and_tags() {
    let store = test_store();
    let embedder = ScriptedEmbedder::new(test_embedding(0))
        .with("Drafted the cover letter finally", test_embedding(42));
    let embeddings = service(embedder);

    let mut input =
        StoreMemoryInput::new(MemoryType::Observation, "Drafted the cover letter finally");
    input.tags = vec!["career".into()];
    let stored = store_memory(&store, &embeddings, input).await.unwrap();

    assert_eq!(stored.embedding, EmbeddingStatus::Embedded);
    assert_eq!(
        stored.memory.tags,
        vec!["career", "drafted", "cover", "letter", "finally"]
    );

    let with_vectors = store.get_memories_with_embeddings().await.unwrap();
    assert_eq!(with_vectors.len(), 1);
    assert_eq!(with_vectors[0].embedding.as_deref(), Some(test_embedding(42).as_slice()));
}

#[tokio::test]
async fn store_memory_survives_embedding_failure() {
    let store = test_store();
    let stored = store_memory(
        &store,
        &service(FailingEmbedder),
        StoreMemoryInput::new(MemoryType::Insight, "two-minute starts lower the bar"),
    )
    .await
    .unwrap();

    assert!(matches!(
        stored.embedding,
        EmbeddingStatus::Failed(ref e) if e.contains("rate limited")
    ));
    assert!(stored.memory.embedding.is_none());
    assert_eq!(store.get_all_memories().await.unwrap().len(), 1);
    assert!(store.get_memories_with_embeddings().await.unwrap().is_empty());
}

#[tokio::test]
async fn store_memory_rejects_wrong_dimensions_softly() {
    let store = test_store();
    let stored = store_memory(
        &store,
        &service(ScriptedEmbedder::new(vec![1.0; 384])),
        StoreMemoryInput::new(MemoryType::Observation, "short vector"),
    )
    .await
    .unwrap();
    assert!(matches!(stored.embedding, EmbeddingStatus::Failed(_)));
    assert!(stored.memory.embedding.is_none());
}

#[tokio::test]
async fn backfill_embeds_pending_and_skips_failures() {
    let store = test_store();
    for content in ["first note", "poison note", "third note", "fourth note"] {
        store
            .create_memory(aged(MemoryType::Observation, content, 1))
            .await
            .unwrap();
    }
    store
        .create_memory(
            aged(MemoryType::Observation, "already done", 1).embedding(test_embedding(1)),
        )
        .await
        .unwrap();

    let embeddings = service(FlakyEmbedder {
        trigger: "poison".into(),
    });

    let report = backfill_embeddings(&store, &embeddings, 3).await.unwrap();
    assert_eq!(report.missing, 4);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.embedded, 2);
    assert_eq!(report.remaining(), 2);
    assert_eq!(store.get_memories_with_embeddings().await.unwrap().len(), 3);

    let second = backfill_embeddings(&store, &embeddings, 50).await.unwrap();
    assert_eq!(
        second,
        BackfillReport {
            missing: 2,
            attempted: 2,
            embedded: 1,
            failed: 1,
        }
    );
}
