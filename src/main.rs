use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use wordflow::analyzer::{DecodePolicy, Document, TextAnalyzer, TotalWordsMode};
use wordflow::app::{build_executor, handle_fatal_error, init_logging};
use wordflow::config::{load_config, AppConfig};
use wordflow::error::WordflowError;
use wordflow::server::{self, AppState};
use wordflow::workflow::{Journal, StorageEvent, WorkflowDefinition};

/// Count words in uploaded files and record the results
#[derive(Parser)]
#[command(name = "wordflow", version)]
#[command(about = "Word count and top-10 word frequency for uploaded files", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML or TOML configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Analyze a local file and print the result as JSON
    Analyze {
        /// File to analyze, or `-` for stdin
        path: PathBuf,

        /// How the total word count is computed
        #[arg(long, value_enum)]
        total_words: Option<TotalWordsMode>,

        /// Number of ranked words to report
        #[arg(long)]
        top_k: Option<usize>,

        /// Fail on invalid UTF-8 instead of substituting replacement characters
        #[arg(long)]
        strict: bool,
    },
    /// Run the workflow once for an object, as if it had just been uploaded
    Run {
        #[arg(long)]
        bucket: String,

        /// Object name within the bucket
        #[arg(long)]
        object: String,

        /// Idempotency key; reusing one replays the recorded outcome
        #[arg(long)]
        event_id: Option<String>,

        #[arg(long)]
        generation: Option<i64>,
    },
    /// Check a workflow definition without running it
    Validate {
        /// Workflow file (defaults to the configured or built-in workflow)
        workflow: Option<PathBuf>,
    },
    /// Show the journal entry recorded for an event, or list every event
    Status {
        /// Event to show; omit to list all journaled events
        event_id: Option<String>,
    },
    /// Drop an event's journal entry so its next delivery runs again
    Forget {
        event_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli.command, cli.config.as_deref()).await {
        handle_fatal_error(err, cli.verbose);
    }
}

async fn run(command: Commands, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path).await?;

    match command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            run_serve(config).await
        }
        Commands::Analyze {
            path,
            total_words,
            top_k,
            strict,
        } => {
            if let Some(mode) = total_words {
                config.analyzer.total_words = mode;
            }
            if let Some(top_k) = top_k {
                config.analyzer.top_k = top_k;
            }
            if strict {
                config.analyzer.decode = DecodePolicy::Strict;
            }
            config.validate()?;
            run_analyze(&config, &path).await
        }
        Commands::Run {
            bucket,
            object,
            event_id,
            generation,
        } => {
            let mut event = StorageEvent::new(bucket, object);
            if let Some(id) = event_id {
                event = event.with_id(id);
            }
            if let Some(generation) = generation {
                event = event.with_generation(generation);
            }
            let executor = build_executor(&config).await?;
            let report = executor.run(&event).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Validate { workflow } => {
            let path = workflow.or(config.workflow);
            let definition = WorkflowDefinition::load_or_default(path.as_deref()).await?;
            println!(
                "Workflow '{}' is valid ({} steps: {})",
                definition.name,
                definition.steps.len(),
                definition
                    .steps
                    .iter()
                    .map(|s| format!("{}={}", s.id, s.call))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            Ok(())
        }
        Commands::Status {
            event_id: Some(event_id),
        } => {
            let journal = Journal::new(config.state_dir.clone());
            match journal.load(&event_id).await? {
                Some(entry) => {
                    println!("{}", serde_json::to_string_pretty(&entry)?);
                    Ok(())
                }
                None => Err(unknown_event(&event_id).into()),
            }
        }
        Commands::Status { event_id: None } => {
            let journal = Journal::new(config.state_dir.clone());
            let summary: Vec<_> = journal
                .list()
                .await?
                .iter()
                .map(|entry| {
                    json!({
                        "event_id": entry.event.id,
                        "object": entry.event.object_ref(),
                        "status": entry.status,
                        "steps": entry.steps.len(),
                        "runs": entry.runs,
                        "updated_at": entry.updated_at,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::Forget { event_id } => {
            let journal = Journal::new(config.state_dir.clone());
            if !journal.remove(&event_id).await? {
                return Err(unknown_event(&event_id).into());
            }
            info!("Forgot event {}", event_id);
            Ok(())
        }
    }
}

fn unknown_event(event_id: &str) -> WordflowError {
    WordflowError::invalid_event(format!("no run recorded for event '{event_id}'"))
}

async fn run_serve(config: AppConfig) -> Result<()> {
    let addr = config.server.socket_addr()?;
    let executor = build_executor(&config).await?;
    let app = server::router(Arc::new(AppState::new(executor)), config.server.max_body_bytes);

    let listener = server::bind(addr).await?;
    server::serve(listener, app).await?;
    Ok(())
}

async fn run_analyze(config: &AppConfig, path: &Path) -> Result<()> {
    let document = if path == Path::new("-") {
        let mut content = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut content)
            .await
            .context("Failed to read stdin")?;
        Document::new("<stdin>", content)
    } else {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Document::new(path.display().to_string(), content)
    };
    debug!("Read {} bytes from {}", document.content.len(), document.name);

    let result = TextAnalyzer::new(config.analyzer.clone()).analyze_document(&document)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
