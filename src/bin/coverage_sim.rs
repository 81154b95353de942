//! Coverage simulation
//!
//! Seeds an in-memory pool, enrolls participants concurrently, optionally
//! extends each of them, and reports how evenly the pool was covered.
//!
//! Run with: cargo run --bin coverage_sim -- --trials 120 --participants 500

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dilemma_study::coverage::coverage_spread;
use dilemma_study::request::StartRequest;
use dilemma_study::store::{MemoryStudyStore, StudyStore};
use dilemma_study::{Error, Study, StudyConfig};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coverage_sim", about = "Simulate coverage-balanced trial assignment")]
#[command(version)]
struct Cli {
    /// Number of trials in the pool
    #[arg(long, default_value_t = 100)]
    trials: usize,

    /// Number of participants to enroll
    #[arg(long, default_value_t = 250)]
    participants: usize,

    /// Block size (overrides the config file)
    #[arg(long)]
    block_size: Option<usize>,

    /// Extend calls per participant after enrollment
    #[arg(long, default_value_t = 0)]
    extend_rounds: usize,

    /// Fixed balancer seed
    #[arg(long)]
    seed: Option<u64>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &cli.config {
        Some(path) => StudyConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => StudyConfig::from_env().context("invalid environment configuration")?,
    };
    if let Some(block_size) = cli.block_size {
        config = config.with_block_size(block_size);
    }

    let store = MemoryStudyStore::with_trials(
        (0..cli.trials).map(|i| json!({"dilemma_text": format!("synthetic dilemma {i}")})),
    );
    let mut builder = Study::builder(store).config(config);
    if let Some(seed) = cli.seed {
        builder = builder.seed(seed);
    }
    let study = Arc::new(builder.build()?);

    info!(
        trials = cli.trials,
        participants = cli.participants,
        block_size = study.config().block_size,
        extend_rounds = cli.extend_rounds,
        "simulation starting"
    );

    let mut handles = Vec::with_capacity(cli.participants);
    for _ in 0..cli.participants {
        let study = Arc::clone(&study);
        let extend_rounds = cli.extend_rounds;
        handles.push(tokio::spawn(async move { enroll(&study, extend_rounds).await }));
    }
    for handle in handles {
        handle.await.context("participant task panicked")??;
    }

    let counts = study.store().assignment_counts().await?;
    let min = counts.values().min().copied().unwrap_or(0);
    let max = counts.values().max().copied().unwrap_or(0);
    let total: u64 = counts.values().sum();
    info!(
        total_assignments = total,
        min,
        max,
        spread = coverage_spread(&counts).unwrap_or(0),
        "simulation finished"
    );

    Ok(())
}

async fn enroll(study: &Study<MemoryStudyStore>, extend_rounds: usize) -> dilemma_study::Result<()> {
    let started = study.start_session(StartRequest::default()).await?;
    for _ in 0..extend_rounds {
        match study.extend_session(started.participant_id).await {
            Ok(_) => {}
            Err(Error::PoolExhaustedForParticipant { participant_id }) => {
                warn!(%participant_id, "participant has seen every trial");
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
