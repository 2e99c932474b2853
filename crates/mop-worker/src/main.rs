//! mop-worker - Mopsync rule engine worker
//!
//! Reads device data notifications from stdin, one JSON object per line, and
//! evaluates the rules bound to each announced reading.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use mop_worker::{Dispatcher, Engine, Fixtures, WorkerConfig, logging, runtime};
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "mop-worker")]
#[command(about = "Mopsync rule engine worker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process notifications read from stdin
    Run {
        /// Path to config file
        #[arg(short, long, env = "MOP_WORKER_CONFIG")]
        config: Option<PathBuf>,

        /// Number of concurrent workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Fixture file seeding rules and telemetry
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },

    /// Validate every rule in a fixture file
    CheckRules {
        /// Fixture file to check
        file: PathBuf,
    },

    /// Process a single telemetry reading and print its alerts
    Evaluate {
        /// Fixture file seeding rules and telemetry
        #[arg(long)]
        fixtures: PathBuf,

        /// ID of the reading to process
        telemetry_id: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            workers,
            fixtures,
        } => {
            let mut config = match config {
                Some(path) => WorkerConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => WorkerConfig::default(),
            };
            if let Some(workers) = workers {
                config.workers = workers;
            }
            if fixtures.is_some() {
                config.fixtures = fixtures;
            }
            config.validate()?;

            logging::init(&config.log)?;
            runtime::block_on(run(config))??;
        }

        Commands::CheckRules { file } => {
            logging::init(&WorkerConfig::default().log)?;
            check_rules(&file)?;
        }

        Commands::Evaluate {
            fixtures,
            telemetry_id,
        } => {
            logging::init(&WorkerConfig::default().log)?;
            evaluate(&fixtures, &telemetry_id)?;
        }
    }

    Ok(())
}

async fn run(config: WorkerConfig) -> anyhow::Result<()> {
    info!(
        queue = %config.queue,
        workers = config.workers,
        "starting mop-worker"
    );

    let engine = match &config.fixtures {
        Some(path) => Engine::from_fixtures(&Fixtures::load(path)?)?,
        None => Engine::new(),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if matches!(tokio::signal::ctrl_c().await, Ok(())) {
            info!("received SIGINT, initiating shutdown");
            let _ = shutdown_tx.send(true);
        }
    });

    let dispatcher = Dispatcher::from_config(engine.listener(), &config);
    let stats = dispatcher
        .run(BufReader::new(tokio::io::stdin()), shutdown_rx)
        .await?;

    info!(
        alerts = engine.alerts.count(),
        processed = stats.processed,
        "mop-worker stopped"
    );
    Ok(())
}

fn check_rules(file: &Path) -> anyhow::Result<()> {
    let fixtures = Fixtures::load(file)?;
    let problems = fixtures.check_rules();

    for problem in &problems {
        error!(rule_id = %problem.rule_id, reason = %problem.reason, "invalid rule");
        println!("{}: {}", problem.rule_id, problem.reason);
    }

    if !problems.is_empty() {
        anyhow::bail!(
            "{} of {} rules are invalid",
            problems.len(),
            fixtures.rules.len()
        );
    }

    println!("{} rules OK", fixtures.rules.len());
    Ok(())
}

fn evaluate(fixtures: &Path, telemetry_id: &str) -> anyhow::Result<()> {
    let engine = Engine::from_fixtures(&Fixtures::load(fixtures)?)?;
    let report = engine.processor.process_telemetry(telemetry_id)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
