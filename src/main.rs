mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use recollect::config::RecollectConfig;
use recollect::memory::store::DEFAULT_BACKFILL_BATCH;
use recollect::memory::types::MemoryType;

#[derive(Parser)]
#[command(
    name = "recollect",
    version,
    about = "Adaptive memory engine for a behavioral-coaching assistant"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the prompt context for the next coaching turn
    Context {
        /// What the user is working on now
        #[arg(long)]
        task: Option<String>,
        /// Tag to boost (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Avoidance type to boost
        #[arg(long)]
        avoidance_type: Option<String>,
    },
    /// Store a new memory
    Remember {
        content: String,
        #[arg(long = "type", default_value = "observation", value_parser = parse_memory_type)]
        memory_type: MemoryType,
        /// Session that produced this memory
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        avoidance_type: Option<String>,
        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, default_value_t = 1.0)]
        importance: f64,
    },
    /// Search memories by semantic similarity
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0.3)]
        min_similarity: f64,
    },
    /// Show session statistics and avoidance-type breakdown
    Patterns {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Consolidate aged memories into a pattern summary
    Consolidate {
        /// Run even if the session count is not a multiple of the interval
        #[arg(long)]
        force: bool,
    },
    /// Generate embeddings for memories that have none
    Backfill {
        #[arg(long, default_value_t = DEFAULT_BACKFILL_BATCH)]
        batch_size: usize,
    },
    /// Record coaching session lifecycle events
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Start a new session and print its id
    Start {
        #[arg(long)]
        task: Option<String>,
    },
    /// Mark a session completed
    Complete {
        id: String,
        #[arg(long)]
        avoidance_type: Option<String>,
        /// The focus timer ran to completion
        #[arg(long)]
        timer: bool,
    },
    /// Mark a session abandoned
    Abandon { id: String },
    /// Print a session and its coaching log
    Show { id: String },
}

fn parse_memory_type(s: &str) -> Result<MemoryType, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = RecollectConfig::load()?;

    // Log to stderr so stdout stays clean for the context output.
    let filter =
        EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Context {
            task,
            tags,
            avoidance_type,
        } => cli::context::context(&config, task, tags, avoidance_type).await?,
        Command::Remember {
            content,
            memory_type,
            session,
            avoidance_type,
            tags,
            importance,
        } => {
            let mut input =
                recollect::memory::store::StoreMemoryInput::new(memory_type, content);
            input.session_id = session;
            input.avoidance_type = avoidance_type;
            input.tags = tags;
            input.importance = importance;
            cli::remember::remember(&config, input).await?
        }
        Command::Search {
            query,
            limit,
            min_similarity,
        } => cli::search::search(&config, &query, limit, min_similarity).await?,
        Command::Patterns { json } => cli::patterns::patterns(&config, json).await?,
        Command::Consolidate { force } => cli::consolidate::consolidate(&config, force).await?,
        Command::Backfill { batch_size } => cli::backfill::backfill(&config, batch_size).await?,
        Command::Session { action } => match action {
            SessionAction::Start { task } => cli::session::start(&config, task.as_deref())?,
            SessionAction::Complete {
                id,
                avoidance_type,
                timer,
            } => cli::session::complete(&config, &id, avoidance_type, timer)?,
            SessionAction::Abandon { id } => cli::session::abandon(&config, &id)?,
            SessionAction::Show { id } => cli::session::show(&config, &id)?,
        },
    }

    Ok(())
}
