//! EmberChain wallet command-line interface.
//!
//! Holds no on-disk key material: every invocation either generates a
//! fresh keypair or loads one from a hex secret the caller supplies, and
//! submits signed transactions straight over the gossip wire protocol —
//! there is no RPC surface to call instead (spec.md §4.6).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ember_core::NodeKind;
use ember_network::{split, Envelope, HandshakePayload, MessageType};
use ember_wallet::Wallet;
use tokio::net::TcpStream;

/// EmberChain wallet command-line interface.
#[derive(Parser)]
#[command(name = "ember-wallet-cli", version, about = "EmberChain wallet CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a fresh keypair and print its address and secret.
    New,
    /// Print the address and public key derived from a secret.
    Address(AddressArgs),
    /// Build, sign, and submit a value transfer to a running node.
    Send(SendArgs),
}

#[derive(clap::Args)]
struct AddressArgs {
    /// Hex-encoded 32-byte secret key.
    #[arg(long)]
    secret: String,
}

#[derive(clap::Args)]
struct SendArgs {
    /// Hex-encoded 32-byte secret key of the sending wallet.
    #[arg(long)]
    secret: String,

    /// Recipient address.
    #[arg(long)]
    to: String,

    /// Amount to send, in whole coin units.
    #[arg(long)]
    amount: f64,

    /// Node to submit the transaction to, as `host:port`.
    #[arg(long, default_value = "127.0.0.1:9000")]
    node: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::New => wallet_new(),
        Commands::Address(args) => wallet_address(args),
        Commands::Send(args) => wallet_send(args).await,
    }
}

/// Generate a fresh keypair and print its secret once. The secret is
/// never written anywhere by this binary; the caller is responsible for
/// saving it if the wallet should be reusable.
fn wallet_new() -> Result<()> {
    let secret: [u8; 32] = rand::random();
    let wallet = Wallet::from_secret_bytes(secret).context("generated an invalid secret key")?;

    println!("\n=== NEW WALLET ===");
    println!("Address:    {}", wallet.address());
    println!("Public key: {}", wallet.public_key_hex());
    println!("\nSECRET KEY (save this, it will not be shown again):");
    println!("{}", hex::encode(secret));
    Ok(())
}

fn wallet_address(args: AddressArgs) -> Result<()> {
    let wallet = load_wallet(&args.secret)?;
    println!("Address:    {}", wallet.address());
    println!("Public key: {}", wallet.public_key_hex());
    Ok(())
}

/// Sign a transaction and hand it to a node exactly as a peer would: dial
/// in, HANDSHAKE as a wallet-only node, then relay one TRANSACTION
/// envelope and disconnect.
async fn wallet_send(args: SendArgs) -> Result<()> {
    let wallet = load_wallet(&args.secret)?;
    let tx = wallet.send(args.to.clone(), args.amount).context("failed to build transaction")?;

    println!("Submitting transaction {} to {}", tx.hash, args.node);

    let stream = TcpStream::connect(&args.node)
        .await
        .with_context(|| format!("failed to connect to node at {}", args.node))?;
    let (_reader, mut writer) = split(stream);

    let handshake = HandshakePayload {
        node_kind: NodeKind::WalletNode,
        listen_port: 0,
    };
    writer
        .send(&Envelope::new(MessageType::Handshake, "ember-wallet-cli", handshake.encode()))
        .await
        .context("failed to send handshake")?;

    writer
        .send(&Envelope::new(MessageType::Transaction, "ember-wallet-cli", tx.encode_fields()))
        .await
        .context("failed to send transaction")?;

    writer.shutdown().await.context("failed to close connection")?;

    println!("Transaction sent: {} -> {} amount {}", wallet.address(), args.to, args.amount);
    Ok(())
}

fn load_wallet(secret_hex: &str) -> Result<Wallet> {
    let stripped = secret_hex.strip_prefix("0x").unwrap_or(secret_hex);
    let bytes = hex::decode(stripped).context("secret must be hex-encoded")?;
    if bytes.len() != 32 {
        bail!("secret must be exactly 32 bytes (64 hex characters), got {}", bytes.len());
    }
    let mut array = [0u8; 32];
    array.copy_from_slice(&bytes);
    Wallet::from_secret_bytes(array).context("invalid secret key")
}
