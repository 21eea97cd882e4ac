use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use jobsmith_core::app::{AppBuilder, StatusReport};
use jobsmith_core::config::SchedulerConfig;
use jobsmith_core::{Job, JobFilter, observability};

#[derive(Debug, Parser)]
#[command(name = "jobsmith", about = "Single-node background job scheduler")]
struct Cli {
    /// Path to the TOML config (defaults to ./jobsmith.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit every entry of a JSON array file, run the accepted jobs and wait for them.
    RunBatch {
        /// File containing `[{"taskName": ..., "payload": {...}, "priority": ...}, ...]`.
        file: PathBuf,
    },
    /// Print the effective configuration.
    ShowConfig,
}

#[derive(Debug, Serialize)]
struct BatchReport {
    rejected: Vec<Rejection>,
    jobs: Vec<Job>,
    status: StatusReport,
}

#[derive(Debug, Serialize)]
struct Rejection {
    index: usize,
    error: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SchedulerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    observability::init(config.log_format);

    match cli.command {
        Command::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::RunBatch { file } => {
            let report = run_batch(config, &file).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

async fn run_batch(config: SchedulerConfig, file: &Path) -> Result<BatchReport> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let submissions: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", file.display()))?;
    let Value::Array(submissions) = submissions else {
        bail!("{} must contain a JSON array", file.display());
    };

    let app = AppBuilder::new(config).build().context("building scheduler")?;

    let mut rejected = Vec::new();
    let mut accepted = Vec::new();
    for (index, body) in submissions.iter().enumerate() {
        match app.service.create(body).await {
            Ok(job) => accepted.push(job.id),
            Err(e) => {
                warn!(index, error = %e, "submission rejected");
                rejected.push(Rejection {
                    index,
                    error: e.to_string(),
                });
            }
        }
    }

    // With the dispatcher on, it may claim jobs first; those runs come back as Conflict.
    for id in accepted {
        if let Err(e) = app.engine.run(id).await {
            warn!(job_id = %id, error = %e, "run rejected");
        }
    }

    let engine = app.engine.clone();
    app.shutdown().await;

    let jobs = engine
        .list(JobFilter::all())
        .await
        .context("listing jobs")?;
    let status = engine.status().await.context("collecting status")?;

    Ok(BatchReport {
        rejected,
        jobs,
        status,
    })
}
