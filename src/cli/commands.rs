//! CLI command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use dialoguer::{Input, Password};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::{Cluster, Config, ProviderKind};
use crate::keygen::{self, generate_batch, WalletWriter};
use crate::sweep::{AccountOutcome, SweepEngine, SweepSettings};
use crate::wallet::transfer::lamports_to_sol;
use crate::wallet::{credentials, ChainClient, RpcChainClient};

const BANNER_RULE: &str = "==============================================";

/// Generate a batch of wallets and append them to the output file
pub async fn generate(
    config: &Config,
    count: Option<usize>,
    use_passphrase: bool,
    output: Option<PathBuf>,
    provider: Option<ProviderKind>,
) -> Result<()> {
    println!("{}", BANNER_RULE);
    println!("        Solana Wallet Generator");
    println!("{}\n", BANNER_RULE);

    let count = match count {
        Some(n) => n,
        None => Input::<usize>::new()
            .with_prompt("How many wallets should be generated?")
            .interact_text()?,
    };

    let passphrase = if use_passphrase {
        Password::new()
            .with_prompt("BIP-39 passphrase")
            .with_confirmation("Repeat passphrase", "Passphrases do not match")
            .interact()?
    } else {
        String::new()
    };

    let mut generator = config.generator.clone();
    if let Some(path) = output {
        generator.output_path = path;
    }
    if let Some(kind) = provider {
        generator.provider = kind;
    }

    let max = generator.max_wallets;
    let mut provider = keygen::provider_from_config(&generator)?;
    let mut writer = WalletWriter::open(&generator.output_path)?;

    // Key derivation and the external process are blocking
    let (report, path) = tokio::task::spawn_blocking(move || {
        let report = generate_batch(provider.as_mut(), &mut writer, count, max, &passphrase, |w| {
            println!("Wallet {} created.", w.address);
        });
        report.map(|r| (r, writer.path().to_path_buf()))
    })
    .await??;

    if let Some(clamped) = report.clamped_to {
        println!(
            "\nNote: {} wallets requested, limited to {} per run.",
            report.requested, clamped
        );
    }

    for failure in &report.failures {
        println!("Failed to generate wallet: {}", failure);
    }

    let total = saved_wallet_count(&path);

    println!("\n{}", BANNER_RULE);
    println!(
        "  {} of {} wallets generated and saved.",
        report.generated.len(),
        report.attempted()
    );
    println!("  See {} ({} wallets total).", path.display(), total);
    println!("{}", BANNER_RULE);

    if report.generated.is_empty() {
        anyhow::bail!("no wallets were generated");
    }

    Ok(())
}

/// Records in the output file, 0 with a warning if it cannot be read
fn saved_wallet_count(path: &Path) -> usize {
    match std::fs::read_to_string(path) {
        Ok(text) => keygen::writer::parse_records(&text).len(),
        Err(e) => {
            warn!("Could not re-read {} to count wallets: {}", path.display(), e);
            0
        }
    }
}

/// Run the balance sweep loop
pub async fn sweep(config: &Config, cluster: Option<Cluster>, once: bool, dry_run: bool) -> Result<()> {
    if dry_run {
        warn!("Running in DRY-RUN mode - no transfers will be submitted");
    }

    let (accounts, recipient) = credentials::load_from_env(&config.sweep)?;
    let settings = SweepSettings::from_config(&config.sweep, accounts, recipient, dry_run)?;

    let mut rpc = config.rpc.clone();
    if let Some(cluster) = cluster {
        rpc.endpoint = cluster.rpc_url().to_string();
    }

    info!("Initializing RPC client for {}...", rpc.endpoint);
    let client: Arc<dyn ChainClient> =
        Arc::new(RpcChainClient::new(&rpc, config.sweep.skip_preflight));

    match client.health().await {
        Ok(slot) => info!("RPC reachable at slot {}", slot),
        Err(e) => warn!("RPC health check failed, continuing: {}", e),
    }

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            let _ = signal_tx.send(());
        }
    });

    let mut engine = SweepEngine::new(client, &settings);

    if once {
        let report = engine.run_cycle(&mut shutdown_rx).await;
        println!("\n=== SWEEP CYCLE {} ===\n", report.cycle);
        for outcome in &report.outcomes {
            println!("{}", describe(outcome));
        }
        println!(
            "\nSwept {:.9} SOL from {} accounts, {} failures",
            lamports_to_sol(report.swept_lamports()),
            report.swept_count(),
            report.failure_count()
        );
    } else {
        let cycles = engine.run(shutdown_rx).await;
        info!("Sweep loop stopped after {} cycles", cycles);
    }

    drop(shutdown_tx);
    Ok(())
}

fn describe(outcome: &AccountOutcome) -> String {
    let detail = match outcome {
        AccountOutcome::Swept {
            amount, signature, ..
        } => format!("swept {:.9} SOL ({})", lamports_to_sol(*amount), signature),
        AccountOutcome::DryRun { amount, .. } => {
            format!("would sweep {:.9} SOL", lamports_to_sol(*amount))
        }
        AccountOutcome::BelowThreshold { balance, .. } => {
            format!("{:.9} SOL, below threshold", lamports_to_sol(*balance))
        }
        AccountOutcome::QueryFailed { error, .. } => format!("balance query failed: {}", error),
        AccountOutcome::SubmitFailed { error, .. } => format!("transfer failed: {}", error),
    };
    format!("{}: {}", outcome.address(), detail)
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Check RPC reachability and sweep credentials
pub async fn health(config: &Config, cluster: Option<Cluster>) -> Result<()> {
    println!("\n=== SYSTEM HEALTH CHECK ===\n");

    let mut all_healthy = true;

    let mut rpc = config.rpc.clone();
    if let Some(cluster) = cluster {
        rpc.endpoint = cluster.rpc_url().to_string();
    }
    let client = RpcChainClient::new(&rpc, false);

    print!("RPC Endpoint... ");
    let start = std::time::Instant::now();
    match client.health().await {
        Ok(slot) => println!("OK (slot {}, {}ms)", slot, start.elapsed().as_millis()),
        Err(e) => {
            println!("FAILED: {}", e);
            all_healthy = false;
        }
    }

    print!("Sweep accounts... ");
    match credentials::load_from_env(&config.sweep) {
        Ok((accounts, recipient)) => {
            println!("OK ({} accounts -> {})", accounts.len(), recipient);
            for account in &accounts {
                match client.get_balance(&account.address()).await {
                    Ok(balance) => println!(
                        "  {}: {:.9} SOL",
                        account.address(),
                        lamports_to_sol(balance)
                    ),
                    Err(e) => println!("  {}: balance fetch failed: {}", account.address(), e),
                }
            }
        }
        Err(e) => {
            println!("FAILED: {}", e);
            all_healthy = false;
        }
    }

    println!();
    if all_healthy {
        println!("All systems healthy!");
    } else {
        error!("Health check found problems");
        println!("Some systems are unhealthy. Check the errors above.");
    }

    Ok(())
}
