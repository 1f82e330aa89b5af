use anyhow::Result;
use campus_query::ingestion::{ensure_store, IngestionOutcome};
use campus_query::store::PlacementStore;
use campus_query::{AppConfig, CollegeAssistant};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "campus-query")]
#[command(about = "Answer questions about the college and its placements")]
struct Args {
    /// The question in natural language
    #[arg(required_unless_present = "ingest_only")]
    question: Option<String>,

    /// Path to the placement SQLite store (or set PLACEMENT_DB_PATH)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Path to the placement CSV (or set PLACEMENT_CSV_PATH)
    #[arg(long)]
    csv_path: Option<PathBuf>,

    /// Path to the college information text (or set KNOWLEDGE_PATH)
    #[arg(long)]
    knowledge_path: Option<PathBuf>,

    /// Only build the placement store if it is missing, then exit
    #[arg(long)]
    ingest_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(path) = args.db_path {
        config.db_path = path;
    }
    if let Some(path) = args.csv_path {
        config.csv_path = path;
    }
    if let Some(path) = args.knowledge_path {
        config.knowledge_path = path;
    }

    if args.ingest_only {
        let store = PlacementStore::new(&config.db_path);
        match ensure_store(&config.csv_path, &store, config.csv_header_row)? {
            IngestionOutcome::AlreadyPresent => println!("Store already present at {}", config.db_path.display()),
            IngestionOutcome::Built { rows } => println!("Built {} with {} rows", config.db_path.display(), rows),
        }
        return Ok(());
    }

    let assistant = CollegeAssistant::from_config(&config)?;
    info!("Assistant ready");

    if let Some(question) = args.question {
        let answer = assistant.ask(&question).await;
        println!("{}", answer);
    }

    Ok(())
}
