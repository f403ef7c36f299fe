use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reportflow::prelude::*;
use reportflow::report;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "reportflow",
    version,
    about = "Upload a data file, run the remote analysis pipeline and export the findings"
)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the whole pipeline on one file
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// File to analyse
    file: PathBuf,

    /// Base URL serving every stage
    #[arg(long, conflicts_with_all = ["sidecar_url", "backend_url"])]
    base_url: Option<String>,

    /// Sidecar URL serving upload, profile and execute
    #[arg(long, requires = "backend_url")]
    sidecar_url: Option<String>,

    /// Backend URL serving metadata and planning
    #[arg(long, requires = "sidecar_url")]
    backend_url: Option<String>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ask the services to avoid external model calls
    #[arg(long)]
    offline: bool,

    /// Write a Markdown report here
    #[arg(long)]
    export: Option<PathBuf>,

    /// Title of the exported report
    #[arg(long, default_value = report::DEFAULT_TITLE)]
    title: String,

    /// Tasks executed at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Retries per request after the first attempt
    #[arg(long)]
    max_retries: Option<u32>,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

async fn load_config(args: &RunArgs) -> Result<ServiceConfig> {
    let config = match &args.config {
        Some(path) => ServiceConfig::load(path)
            .await
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    let mut config = config.with_env_overrides(|key| std::env::var(key).ok())?;

    if let Some(base_url) = &args.base_url {
        config.topology = Topology::Single {
            base_url: base_url.clone(),
        };
    }
    if let (Some(sidecar_url), Some(backend_url)) = (&args.sidecar_url, &args.backend_url) {
        config.topology = Topology::Split {
            sidecar_url: sidecar_url.clone(),
            backend_url: backend_url.clone(),
        };
    }
    if let Some(concurrency) = args.concurrency {
        config.task_concurrency = concurrency;
    }
    if let Some(max_retries) = args.max_retries {
        config.retry.max_retries = max_retries;
    }
    config.validate()?;
    Ok(config)
}

async fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args).await?;
    let orchestrator =
        PipelineOrchestrator::from_config(&config)?.with_event_sink(Arc::new(LoggingEventSink::debug()));

    let input = InputFile::from_path(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    orchestrator.select_input(input)?;
    if args.offline {
        orchestrator.set_offline_mode(true)?;
    }

    let cancel = Arc::new(CancellationToken::new());
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling run");
                cancel.cancel("interrupted by user");
            }
        })
    };

    let outcome = orchestrator.run(&cancel).await;
    interrupt.abort();

    if let Some(path) = &args.export {
        orchestrator
            .export_to(path, &args.title)
            .await
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    let summary = outcome?;
    info!(
        run_id = %summary.run_id,
        tasks = summary.task_count,
        artifacts = summary.artifact_count,
        failed = summary.failed_tasks.len(),
        "Run finished"
    );
    println!("{}", serde_json::to_string_pretty(&orchestrator.snapshot().artifacts)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run(args) => run(args).await,
    }
}
