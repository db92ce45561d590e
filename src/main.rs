//! Project Notes - command line front end
//!
//! Renders note markup and prints the discussions of a note snapshot.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use project_notes::notes::{Actor, NoteFilters, TargetRef, TargetType};
use project_notes::store::{MemoryNoteStore, NoteSnapshot};
use project_notes::{Config, NotesState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "notes")]
#[command(about = "Threaded notes on issues, merge requests, commits and snippets")]
struct Cli {
    /// Path to the YAML config file (defaults to notes.yaml)
    #[arg(short, long, env = "NOTES_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render note markup to HTML
    Preview {
        /// Raw note text
        text: String,
    },

    /// Load a note snapshot and print a target's notes and discussions
    Threads {
        /// JSON snapshot of a project's notes and targets
        #[arg(short, long)]
        file: PathBuf,

        /// Target type (issue, merge_request, commit, snippet)
        #[arg(long, default_value = "merge_request")]
        target_type: TargetType,

        /// Target id (or commit SHA)
        #[arg(long)]
        target_id: String,

        /// Only notes newer than this id
        #[arg(long)]
        after: Option<u64>,

        /// Only notes older than this id
        #[arg(long)]
        before: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,project_notes=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Preview { text } => {
            let state = NotesState::from_config(config);
            print!("{}", state.manager.preview_markup(&text));
            Ok(())
        }
        Commands::Threads {
            file,
            target_type,
            target_id,
            after,
            before,
        } => {
            let filters = NoteFilters {
                after_id: after,
                before_id: before,
            };
            run_threads(config, &file, TargetRef::new(target_type, target_id), filters).await
        }
    }
}

async fn run_threads(
    config: Config,
    file: &std::path::Path,
    target: TargetRef,
    filters: NoteFilters,
) -> Result<()> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read snapshot {}", file.display()))?;
    let snapshot: NoteSnapshot = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse snapshot {}", file.display()))?;
    let project_id = snapshot.project_id;

    tracing::info!(
        "Loading {} notes from {}",
        snapshot.notes.len(),
        file.display()
    );

    let store = Arc::new(MemoryNoteStore::from_snapshot(snapshot).await);
    let state = NotesState::with_store(config, store);

    // Snapshot readers see every note
    let reader = Actor::new(Uuid::nil(), "snapshot");
    let listing = state
        .manager
        .load_and_group(project_id, &reader, &target, &filters)
        .await?;

    tracing::info!(
        "{}: {} notes, {} discussions",
        target,
        listing.notes.len(),
        listing.discussions.as_ref().map_or(0, Vec::len)
    );

    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}
