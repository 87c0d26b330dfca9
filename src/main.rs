//! Solana Sweeper - wallet batch generator and balance sweep bot
//!
//! # WARNING
//! - The sweep loop moves real funds. Try it on devnet with `--dry-run` first.
//! - Generated wallet files hold private keys in plain text.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

// Use the library crate
use sol_sweeper::cli::commands;
use sol_sweeper::config::{Cluster, Config, ProviderKind};
use sol_sweeper::Error;

/// Solana Sweeper - wallet generator and balance sweeper
#[derive(Parser)]
#[command(name = "sweeper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate wallets and append them to the output file
    Generate {
        /// Number of wallets (prompted for when omitted)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Protect the mnemonics with a BIP-39 passphrase (prompted)
        #[arg(long)]
        passphrase: bool,

        /// Output file (default from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keypair source
        #[arg(long, value_enum)]
        provider: Option<ProviderKind>,
    },

    /// Start the balance sweep loop
    Sweep {
        /// Use a public cluster instead of rpc.endpoint
        #[arg(long, value_enum)]
        cluster: Option<Cluster>,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,

        /// Read balances only, never submit transfers
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current configuration (secrets masked)
    Config,

    /// Check RPC reachability and sweep credentials
    Health {
        #[arg(long, value_enum)]
        cluster: Option<Cluster>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sol_sweeper=info".parse()?),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration loaded from {}", cli.config);

    // Execute command
    let result = match cli.command {
        Commands::Generate {
            count,
            passphrase,
            output,
            provider,
        } => commands::generate(&config, count, passphrase, output, provider).await,
        Commands::Sweep {
            cluster,
            once,
            dry_run,
        } => commands::sweep(&config, cluster, once, dry_run).await,
        Commands::Config => commands::show_config(&config),
        Commands::Health { cluster } => commands::health(&config, cluster).await,
    };

    if let Err(e) = result {
        match e.downcast_ref::<Error>() {
            Some(err) if err.is_fatal_config() => {
                error!("Configuration error, refusing to start: {}", err);
                eprintln!("Fix the sweep settings in config.toml or .env and retry.");
            }
            _ => error!("Command failed: {:#}", e),
        }
        std::process::exit(1);
    }

    Ok(())
}
