//! Weft daemon: drives the consensus task over a simulated gossip network.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use weft_consensus::{Consensus, ConsensusRound, Roster};
use weft_node::{
    init_logging, ConsensusMetrics, ConsensusTask, InMemorySnapshotStore, NodeConfig, NodeError,
    ShutdownController, SnapshotStore,
};
use weft_nullables::GraphGenerator;
use weft_types::{ConsensusSnapshot, EventData};

#[derive(Parser)]
#[command(name = "weft-daemon", about = "Weft hashgraph consensus daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "WEFT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "WEFT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "WEFT_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a gossip graph and run it through the consensus task.
    Simulate(SimulateArgs),
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Args)]
struct SimulateArgs {
    /// Number of equal-weight nodes.
    #[arg(long, default_value_t = 4)]
    nodes: usize,

    /// Per-node weights (comma-separated); overrides --nodes.
    #[arg(long, value_delimiter = ',')]
    weights: Vec<u64>,

    /// Number of events to generate.
    #[arg(long, default_value_t = 1000)]
    events: usize,

    #[arg(long, default_value_t = 0, env = "WEFT_SEED")]
    seed: u64,

    /// Upper bound on transactions per event.
    #[arg(long, default_value_t = 4)]
    max_transactions: usize,

    /// Index of a node that forks its own chain.
    #[arg(long)]
    forking_node: Option<usize>,

    /// Chance that the forking node builds on an older event.
    #[arg(long, default_value_t = 0.1)]
    fork_probability: f64,

    /// After the run, restart from this round's snapshot and check that the
    /// rounds decided afterwards match.
    #[arg(long)]
    restart_from: Option<u64>,

    /// Print decided rounds as JSON lines.
    #[arg(long)]
    json: bool,

    /// Collect Prometheus metrics and print them at the end.
    #[arg(long)]
    metrics: bool,
}

/// Everything one pass through the consensus task produced.
struct Pass {
    rounds: Vec<ConsensusRound>,
    store: InMemorySnapshotStore,
    consensus: Consensus,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    config.validate()?;

    match cli.command {
        Command::Config => print!("{}", config.to_toml_string()?),
        Command::Simulate(args) => {
            init_logging(config.log_format()?, &config.log_level)?;
            simulate(&config, &args).await?;
        }
    }
    Ok(())
}

async fn simulate(config: &NodeConfig, args: &SimulateArgs) -> anyhow::Result<()> {
    let weights = if args.weights.is_empty() {
        vec![1; args.nodes]
    } else {
        args.weights.clone()
    };
    if weights.is_empty() {
        bail!("a simulation needs at least one node");
    }
    let mut generator =
        GraphGenerator::new(args.seed, &weights).with_max_transactions(args.max_transactions);
    if let Some(index) = args.forking_node {
        if index >= weights.len() {
            bail!("forking node {index} is not one of the {} nodes", weights.len());
        }
        generator = generator.with_forking_node(index, args.fork_probability);
    }
    let events = generator.generate(args.events);
    let roster = Roster::new(generator.members());
    tracing::info!(
        nodes = weights.len(),
        events = events.len(),
        seed = args.seed,
        "simulating gossip"
    );

    let metrics = if args.metrics || config.enable_metrics {
        Some(Arc::new(ConsensusMetrics::new()?))
    } else {
        None
    };
    let shutdown = Arc::new(ShutdownController::new());
    let signals = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if let Err(e) = signals.wait_for_signal().await {
            tracing::warn!(error = %e, "could not listen for shutdown signals");
        }
    });

    let first = run_pass(
        config,
        &roster,
        &events,
        None,
        metrics.clone(),
        &shutdown,
        Some(args.json),
    )
    .await?;

    let stats = first.consensus.stats().snapshot();
    let mut stats: Vec<_> = stats.into_iter().collect();
    stats.sort();
    tracing::info!(
        rounds = first.rounds.len(),
        last_round = first.consensus.last_round_decided(),
        ordered = first.consensus.num_consensus(),
        ?stats,
        "simulation finished"
    );

    if let Some(from) = args.restart_from {
        let snapshot = first
            .store
            .get(from)?
            .with_context(|| format!("no snapshot kept for round {from}"))?;
        let second = run_pass(config, &roster, &events, Some(snapshot), None, &shutdown, None).await?;
        let expected: Vec<&ConsensusRound> = first.rounds.iter().filter(|r| r.round > from).collect();
        let compared = expected.len().min(second.rounds.len());
        let matched = expected
            .iter()
            .zip(&second.rounds)
            .take_while(|(a, b)| same_round(a, b))
            .count();
        if matched < compared {
            bail!(
                "restart from round {from} diverged at round {}",
                expected[matched].round
            );
        }
        println!("restart from round {from}: {matched} of {compared} rounds matched");
    }

    if let Some(metrics) = metrics {
        print!("{}", metrics.encode()?);
    }
    Ok(())
}

/// Feed `events` through a fresh consensus task, optionally restarting
/// from `snapshot` first. `print` selects per-round output: `Some(true)` for
/// JSON lines, `Some(false)` for text, `None` for silence.
async fn run_pass(
    config: &NodeConfig,
    roster: &Roster,
    events: &[EventData],
    snapshot: Option<ConsensusSnapshot>,
    metrics: Option<Arc<ConsensusMetrics>>,
    shutdown: &ShutdownController,
    print: Option<bool>,
) -> anyhow::Result<Pass> {
    let consensus = Consensus::new(config.consensus.clone(), roster.clone())?;
    let spawned = ConsensusTask::spawn(
        consensus,
        InMemorySnapshotStore::new(events.len()),
        metrics,
        config.event_queue_capacity,
        shutdown.subscribe(),
    );

    let handle = spawned.handle;
    let events = events.to_vec();
    let producer = tokio::spawn(async move {
        if let Some(snapshot) = snapshot {
            handle.load_snapshot(snapshot).await?;
        }
        for event in events {
            handle.submit_event(event).await?;
        }
        Ok::<_, NodeError>(())
    });

    let mut receiver = spawned.rounds;
    let mut rounds = Vec::new();
    while let Some(round) = receiver.recv().await {
        match print {
            Some(true) => println!("{}", round_json(&round)),
            Some(false) => println!("{}", round_line(&round)),
            None => {}
        }
        rounds.push(round);
    }

    let outcome = spawned.task.wait().await?;
    match producer.await? {
        Ok(()) => {}
        Err(NodeError::TaskStopped) => {
            tracing::warn!("consensus task stopped before every event was submitted")
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Pass {
        rounds,
        store: outcome.store,
        consensus: outcome.consensus,
    })
}

fn same_round(a: &ConsensusRound, b: &ConsensusRound) -> bool {
    a.round == b.round
        && a.judge_hashes() == b.judge_hashes()
        && a.consensus_events.len() == b.consensus_events.len()
        && a
            .consensus_events
            .iter()
            .zip(&b.consensus_events)
            .all(|(x, y)| x.hash() == y.hash() && x.consensus_order == y.consensus_order)
}

fn short_hash(bytes: &[u8; 32]) -> String {
    hex::encode(&bytes[..4])
}

fn round_line(round: &ConsensusRound) -> String {
    let judges: Vec<String> = round
        .judges
        .iter()
        .map(|j| short_hash(j.hash.as_bytes()))
        .collect();
    format!(
        "round {:>5}  events {:>4}  stale {:>3}  next order {:>6}  ancient < {:<6} judges {}",
        round.round,
        round.consensus_events.len(),
        round.stale_events.len(),
        round.snapshot.next_consensus_number,
        round.event_window.ancient_threshold,
        judges.join(" "),
    )
}

fn round_json(round: &ConsensusRound) -> serde_json::Value {
    json!({
        "round": round.round,
        "events": round
            .consensus_events
            .iter()
            .map(|e| json!({
                "hash": hex::encode(e.hash().as_bytes()),
                "order": e.consensus_order,
                "round_created": e.round_created,
                "timestamp_nanos": e.consensus_timestamp.as_nanos(),
            }))
            .collect::<Vec<_>>(),
        "judges": round
            .judges
            .iter()
            .map(|j| hex::encode(j.hash.as_bytes()))
            .collect::<Vec<_>>(),
        "stale": round.stale_events.len(),
        "event_window": round.event_window,
        "next_consensus_number": round.snapshot.next_consensus_number,
    })
}
