//! EmberChain full node binary.
//!
//! Starts a node with RocksDB-backed storage and the newline-framed TCP
//! gossip overlay, optionally dialing a set of bootstrap peers and mining.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use ember_core::constants::DEFAULT_DIFFICULTY;
use ember_core::NodeKind;
use ember_node::{Node, NodeConfig};
use tracing::{error, info, warn};

/// EmberChain full node.
#[derive(Parser, Debug)]
#[command(name = "ember-node", version, about = "EmberChain full node")]
struct Args {
    /// Data directory for chain storage (default: platform data dir / ember).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// P2P listen address.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// P2P listen port.
    #[arg(long, default_value_t = 9000)]
    port: u16,

    /// Run as a wallet-only node: does not mine, does not serve chain sync.
    #[arg(long)]
    wallet_only: bool,

    /// Mining difficulty for newly mined blocks, clamped to [1, 8].
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u8,

    /// Discard on-disk chain state and start fresh from Genesis.
    #[arg(long)]
    clean: bool,

    /// Bootstrap peers to dial at startup, as `host:port` (comma-separated).
    #[arg(long, value_delimiter = ',')]
    peers: Vec<String>,

    /// Address to credit mined blocks to. If unset, this node never mines.
    #[arg(long)]
    mine: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json").
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Maximum number of concurrent outbound dials triggered by PEER_LIST gossip.
    #[arg(long, default_value_t = 8)]
    max_outbound_dials: usize,
}

impl Args {
    fn into_config(self) -> NodeConfig {
        let data_dir = self
            .data_dir
            .unwrap_or_else(|| dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("ember"));

        NodeConfig {
            host: self.host,
            port: self.port,
            kind: if self.wallet_only { NodeKind::WalletNode } else { NodeKind::FullNode },
            difficulty: self.difficulty,
            data_dir,
            clean: self.clean,
            max_outbound_dials: self.max_outbound_dials,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let log_format = args.log_format.clone();
    let log_level = args.log_level.clone();
    let peers = args.peers.clone();
    let mine_address = args.mine.clone();
    let config = args.into_config();

    init_logging(&log_level, &log_format);

    info!("EmberChain node v{}", env!("CARGO_PKG_VERSION"));
    info!(listen = %config.listen_addr(), kind = %config.kind, data_dir = ?config.data_dir, "starting node");

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        error!(error = %e, "failed to create data_dir");
        process::exit(1);
    }

    let node = match Node::start(config).await {
        Ok(node) => node,
        Err(e) => {
            error!(error = %e, "failed to start node");
            process::exit(1);
        }
    };

    info!(height = node.height(), tip = %node.tip_hash(), "chain loaded");

    for peer in &peers {
        let Some((host, port)) = peer.rsplit_once(':') else {
            warn!(peer, "skipping malformed bootstrap peer, expected host:port");
            continue;
        };
        let Ok(port) = port.parse::<u16>() else {
            warn!(peer, "skipping bootstrap peer with unparseable port");
            continue;
        };
        if let Err(e) = node.connect_to(host, port).await {
            warn!(peer, error = %e, "failed to dial bootstrap peer");
        }
    }

    if let Some(address) = mine_address {
        let node = node.clone();
        tokio::spawn(async move {
            loop {
                match node.mine(address.clone()).await {
                    Ok(block) => info!(block_number = block.block_number, "mined block"),
                    Err(e) => {
                        warn!(error = %e, "mining attempt failed, backing off");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });
    }

    info!("node running (Ctrl+C to stop)");
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "failed to install Ctrl+C handler"),
    }

    node.shutdown().await;
    info!("node shutdown complete");
}

/// Initialize the tracing subscriber with the given level and output format.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry().with(filter).with(fmt::layer().json()).init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
