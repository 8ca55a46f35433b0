//! # powledger CLI
//!
//! A small demonstration driver around the ledger engine: mine a handful
//! of blocks into an in-process chain, then dump the resulting ledger.

use clap::{Parser, Subcommand};
use powledger::{Blockchain, ChainConfig, Node, WriteOptions};
use std::process;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "powledger")]
#[command(about = "A minimal embeddable proof-of-work ledger engine")]
#[command(version)]
struct Cli {
    /// Node name; the mining address is derived from it
    #[arg(short, long, default_value = "demo-node")]
    node: String,

    /// Genesis payload for the demo chain
    #[arg(short, long, default_value = "genesis")]
    genesis: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine a number of blocks and print the resulting chain
    Mine {
        /// Number of blocks to mine
        #[arg(short, long, default_value = "3")]
        blocks: u32,
        /// Worker threads per mining call; 1 mines serially
        #[arg(short, long, default_value_t = num_cpus::get())]
        workers: usize,
        /// Trailing-zero-bit difficulty to start from
        #[arg(short, long, default_value = "2")]
        difficulty: u64,
        /// Metadata tag stored on every mined block
        #[arg(short, long, default_value = "")]
        meta: String,
    },
    /// Print an empty chain (genesis only) as JSON
    Show,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("powledger=info")
        .init();

    let cli = Cli::parse();

    let node = Node::new(&cli.node);
    let chain = Blockchain::new(ChainConfig {
        genesis_data: cli.genesis.clone(),
        node_address: node.node_address().to_string(),
        ..ChainConfig::default()
    });

    let result = match cli.command {
        Commands::Mine {
            blocks,
            workers,
            difficulty,
            meta,
        } => mine(chain, &node, blocks, workers, difficulty, &meta),
        Commands::Show => show(&chain),
    };

    if let Err(e) = result {
        error!("error: {}", e);
        process::exit(1);
    }
}

fn mine(
    mut chain: Blockchain,
    node: &Node,
    blocks: u32,
    workers: usize,
    difficulty: u64,
    meta: &str,
) -> anyhow::Result<()> {
    chain.set_difficulty(difficulty);
    let options = WriteOptions {
        workers,
        meta_data: meta.to_string(),
        ..WriteOptions::default()
    };

    for i in 0..blocks {
        let payload = format!("payload #{}", i);
        if !node.write_data(&mut chain, &payload, &options) {
            anyhow::bail!("no solution found for block {} within the retry budget", i);
        }
        let tip = chain.last_block();
        info!(
            "block {} committed: nonce {}, hash {}",
            tip.block_id(),
            tip.nonce(),
            tip.block_hash()
        );
    }

    info!(
        "mined {} blocks; ledger size {}, difficulty now {}",
        blocks,
        chain.ledger_size(),
        chain.difficulty()
    );
    show(&chain)
}

fn show(chain: &Blockchain) -> anyhow::Result<()> {
    for block in chain.ledger().blocks() {
        println!("{}", serde_json::to_string_pretty(block)?);
    }
    Ok(())
}
