mod helpers;

use helpers::{completed_sessions, test_store, SessionWriter};
use recollect::config::RecollectConfig;
use recollect::embedding::EmbeddingService;
use recollect::memory::context::{build_memory_context, ContextOptions};
use recollect::memory::types::{
    AgentAction, AgenticTurn, MemoryType, NewMemory, PatternSummaryData, SessionUpdate, TurnRole,
};
use recollect::storage::{InMemoryStore, MemoryStore};

#[tokio::test]
async fn malformed_tags_do_not_break_reads_or_context() {
    let store = test_store();
    let m = store
        .create_memory(
            NewMemory::new(MemoryType::Observation, "left laundry for days").tags(["home"]),
        )
        .await
        .unwrap();
    store
        .with_connection(|conn| {
            conn.execute("UPDATE memories SET tags = '[oops' WHERE id = ?1", [&m.id])?;
            Ok(())
        })
        .unwrap();

    let all = store.get_all_memories().await.unwrap();
    assert!(all[0].tags.is_empty());

    let text = build_memory_context(
        &store,
        &EmbeddingService::disabled(),
        &RecollectConfig::default(),
        &ContextOptions {
            match_tags: vec!["home".into()],
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(text.contains("left laundry for days"));
}

#[tokio::test]
async fn malformed_summary_data_keeps_the_text() {
    let store = test_store();
    completed_sessions(&store, 2, "Fear");
    let summary = store
        .create_pattern_summary("Digest survives.", &PatternSummaryData::default())
        .await
        .unwrap();
    store
        .with_connection(|conn| {
            conn.execute(
                "UPDATE pattern_summaries SET data = 'not json' WHERE id = ?1",
                [&summary.id],
            )?;
            Ok(())
        })
        .unwrap();

    let latest = store.get_latest_pattern_summary().await.unwrap().unwrap();
    assert_eq!(latest.summary_text, "Digest survives.");
    assert_eq!(latest.data, PatternSummaryData::default());
}

#[tokio::test]
async fn summary_data_round_trips_as_camel_case_json() {
    let store = test_store();
    let mut data = PatternSummaryData {
        total_sessions: 20,
        completed_sessions: 14,
        timer_completion_rate: 0.5,
        consolidated_memory_count: 6,
        ..Default::default()
    };
    data.type_distribution.insert("Fear".into(), 12);
    store.create_pattern_summary("x", &data).await.unwrap();

    let raw: String = store
        .with_connection(|conn| {
            Ok(conn.query_row("SELECT data FROM pattern_summaries", [], |row| row.get(0))?)
        })
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["totalSessions"], 20);
    assert_eq!(json["consolidatedMemoryCount"], 6);
    assert_eq!(json["typeDistribution"]["Fear"], 12);

    let latest = store.get_latest_pattern_summary().await.unwrap().unwrap();
    assert_eq!(latest.data, data);
}

#[tokio::test]
async fn storage_errors_propagate_from_the_context_builder() {
    let store = test_store();
    store
        .with_connection(|conn| {
            conn.execute_batch("DROP TABLE pattern_summaries;")?;
            Ok(())
        })
        .unwrap();

    let result = build_memory_context(
        &store,
        &EmbeddingService::disabled(),
        &RecollectConfig::default(),
        &ContextOptions::default(),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn malformed_agentic_log_reads_as_empty() {
    let store = test_store();
    let session = store.start(5);
    store.finish(
        &session.id,
        SessionUpdate {
            agentic_log: Some(vec![AgenticTurn {
                role: TurnRole::Ai,
                action: Some(AgentAction::AskFollowup),
                message: "What makes the first step hard?".into(),
                timestamp: chrono::Utc::now(),
            }]),
            ..Default::default()
        },
    );
    assert_eq!(
        store.get_session(&session.id).unwrap().unwrap().agentic_log.len(),
        1
    );

    store
        .with_connection(|conn| {
            conn.execute(
                "UPDATE sessions SET agentic_log = '{not a list' WHERE id = ?1",
                [&session.id],
            )?;
            Ok(())
        })
        .unwrap();

    let read = store.get_session(&session.id).unwrap().unwrap();
    assert!(read.agentic_log.is_empty());
    assert_eq!(read.id, session.id);
    assert_eq!(store.get_session_count().await.unwrap(), 1);
}

#[tokio::test]
async fn both_backends_reject_an_unknown_session_id() {
    let sqlite = test_store();
    let in_memory = InMemoryStore::new();
    let backends: [&dyn MemoryStore; 2] = [&sqlite, &in_memory];

    for store in backends {
        let orphan =
            NewMemory::new(MemoryType::Observation, "orphan").session_id("no-such-session");
        assert!(store.create_memory(orphan).await.is_err());
        assert!(store.get_all_memories().await.unwrap().is_empty());
    }

    let s = sqlite.start(0);
    let m = in_memory.start(0);
    assert!(sqlite
        .create_memory(NewMemory::new(MemoryType::Observation, "ok").session_id(s.id))
        .await
        .is_ok());
    assert!(in_memory
        .create_memory(NewMemory::new(MemoryType::Observation, "ok").session_id(m.id))
        .await
        .is_ok());
}
