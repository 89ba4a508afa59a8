use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use tl_node::{
    protocol::{encode_response, respond},
    Node, NodeConfig, RequeuePolicy,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::mpsc,
    task::JoinSet,
    time,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// TruthLink ledger daemon.
#[derive(Parser, Debug)]
#[command(
    name = "tl-node",
    version,
    about = "TruthLink proof-of-work claim ledger",
    long_about = "Runs a TruthLink ledger. Reads one JSON request per line on stdin \
                  ({\"op\":\"submit\",...}, {\"op\":\"mine\"}, {\"op\":\"chain\"}, \
                  {\"op\":\"tip\"}, {\"op\":\"pending\"}) and writes one JSON \
                  response per line to stdout."
)]
struct Cli {
    /// Chain file to load from and save to.
    #[arg(short, long, default_value = tl_node::config::DEFAULT_CHAIN_PATH, env = "TRUTHLINK_CHAIN")]
    chain: PathBuf,

    /// Leading zero hex characters required of each block hash.
    #[arg(short, long, default_value_t = tl_chain::DEFAULT_DIFFICULTY, env = "TRUTHLINK_DIFFICULTY")]
    difficulty: usize,

    /// Nonces to try per mining attempt before giving up. 0 = unlimited.
    #[arg(long, default_value_t = tl_node::config::DEFAULT_MAX_ATTEMPTS, env = "TRUTHLINK_MAX_ATTEMPTS")]
    max_attempts: u64,

    /// Worker threads per proof-of-work search.
    #[arg(short = 't', long, default_value_t = 1, env = "TRUTHLINK_MINING_THREADS")]
    threads: usize,

    /// Where a claim goes when mining it fails.
    #[arg(long, default_value = "front", env = "TRUTHLINK_REQUEUE")]
    requeue: CliRequeue,

    /// Mine the oldest pending claim every N seconds. Omit to mine only on request.
    #[arg(long, env = "TRUTHLINK_MINE_INTERVAL")]
    mine_interval: Option<u64>,

    /// Suppress log output to stderr (run silently).
    #[arg(short, long, default_value_t = false, env = "TRUTHLINK_QUIET")]
    quiet: bool,
}

#[derive(ValueEnum, Debug, Clone)]
enum CliRequeue {
    /// Retry the failed claim before anything else.
    Front,
    /// Put the failed claim behind newer submissions.
    Back,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::from_default_env()
            .add_directive("tl_node=info".parse()?)
            .add_directive("tl_chain=info".parse()?)
    };
    // stdout carries responses, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = NodeConfig {
        chain_path: cli.chain,
        difficulty: cli.difficulty,
        max_attempts: (cli.max_attempts > 0).then_some(cli.max_attempts),
        mining_threads: cli.threads,
        requeue_policy: match cli.requeue {
            CliRequeue::Front => RequeuePolicy::Front,
            CliRequeue::Back => RequeuePolicy::Back,
        },
        auto_mine_interval: cli.mine_interval.map(Duration::from_secs),
        quiet: cli.quiet,
    };

    info!(
        chain = %config.chain_path.display(),
        difficulty = config.difficulty,
        threads = config.mining_threads,
        requeue = ?config.requeue_policy,
        "Starting TruthLink node"
    );

    let auto_mine_interval = config.auto_mine_interval;
    let (node, mut events) = Node::open(config)?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!("NodeEvent: {event:?}");
        }
    });

    // A single writer keeps concurrent responses from interleaving mid-line.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    // Raw bytes per line: a line that is not UTF-8 gets an error reply
    // instead of ending the stream.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let reader = tokio::spawn(async move {
        let mut stdin = BufReader::new(tokio::io::stdin());
        loop {
            let mut line = Vec::new();
            if stdin.read_until(b'\n', &mut line).await? == 0 {
                return Ok::<_, std::io::Error>(());
            }
            if line_tx.send(line).is_err() {
                return Ok(());
            }
        }
    });

    let mut in_flight = JoinSet::new();

    let mut ticker = auto_mine_interval.map(|period| {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        ticker
    });

    let mut interrupted = false;
    loop {
        tokio::select! {
            line = line_rx.recv() => {
                let Some(line) = line else {
                    info!("stdin closed");
                    break;
                };
                if line.trim_ascii().is_empty() {
                    continue;
                }
                let node = node.clone();
                let out_tx = out_tx.clone();
                in_flight.spawn(async move {
                    let response = respond(&node, &line).await;
                    match encode_response(&response) {
                        Ok(json) => {
                            let _ = out_tx.send(json);
                        }
                        Err(e) => warn!("Failed to encode response: {e}"),
                    }
                });
            }

            _ = tick(&mut ticker) => {
                let node = node.clone();
                in_flight.spawn(async move {
                    match node.mine().await {
                        Ok(outcome) => info!("Scheduled mining: {outcome:?}"),
                        Err(e) => warn!("Scheduled mining failed: {e}"),
                    }
                });
            }

            _ = tokio::signal::ctrl_c() => {
                node.shutdown();
                interrupted = true;
                break;
            }
        }
    }

    while in_flight.join_next().await.is_some() {}
    drop(out_tx);
    writer.await??;

    if interrupted {
        // Still blocked on stdin.
        reader.abort();
    } else {
        reader.await??;
    }

    Ok(())
}

/// Wait for the next auto-mine tick, or forever if auto-mining is off.
async fn tick(ticker: &mut Option<time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
