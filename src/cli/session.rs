//! CLI `session` commands: record the lifecycle of a coaching session.

use anyhow::{Context, Result};

use recollect::config::RecollectConfig;
use recollect::memory::context::format_date;
use recollect::memory::types::{SessionStatus, SessionUpdate, TurnRole};

pub fn start(config: &RecollectConfig, task: Option<&str>) -> Result<()> {
    let store = super::open_store(config)?;
    let session = store.create_session(task)?;
    println!("{}", session.id);
    Ok(())
}

pub fn complete(
    config: &RecollectConfig,
    id: &str,
    avoidance_type: Option<String>,
    timer_completed: bool,
) -> Result<()> {
    let store = super::open_store(config)?;
    let session = store.update_session(
        id,
        &SessionUpdate {
            status: Some(SessionStatus::Completed),
            avoidance_type,
            timer_completed: Some(timer_completed),
            ..Default::default()
        },
    )?;
    println!("Session {} {}.", session.id, session.status);
    Ok(())
}

pub fn abandon(config: &RecollectConfig, id: &str) -> Result<()> {
    let store = super::open_store(config)?;
    let session = store.update_session(
        id,
        &SessionUpdate {
            status: Some(SessionStatus::Abandoned),
            ..Default::default()
        },
    )?;
    println!("Session {} {}.", session.id, session.status);
    Ok(())
}

pub fn show(config: &RecollectConfig, id: &str) -> Result<()> {
    let store = super::open_store(config)?;
    let session = store
        .get_session(id)?
        .with_context(|| format!("no session with id {id}"))?;

    println!("Session {} ({})", session.id, session.status);
    println!("  Started:   {}", format_date(session.created_at));
    println!("  Task:      {}", session.task.as_deref().unwrap_or("-"));
    println!("  Avoidance: {}", session.avoidance_type.as_deref().unwrap_or("-"));
    let timer = if session.timer_completed {
        "completed"
    } else {
        "not completed"
    };
    println!("  Timer:     {timer}");

    if session.agentic_log.is_empty() {
        return Ok(());
    }
    println!();
    for turn in &session.agentic_log {
        let who = match turn.role {
            TurnRole::Ai => "coach",
            TurnRole::User => "user",
        };
        println!("  [{}] {who}: {}", turn.timestamp.format("%H:%M"), turn.message);
    }
    Ok(())
}
