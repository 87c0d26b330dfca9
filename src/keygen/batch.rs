//! Bounded, best-effort batch generation

use solana_sdk::pubkey::Pubkey;
use tracing::{error, info, warn};

use super::{GeneratedWallet, KeypairProvider, WalletWriter};
use crate::error::{Error, Result};

/// Outcome of one generator run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub requested: usize,
    /// Set when the request exceeded the maximum
    pub clamped_to: Option<usize>,
    pub generated: Vec<Pubkey>,
    pub failures: Vec<String>,
}

impl BatchReport {
    /// Wallets actually attempted
    pub fn attempted(&self) -> usize {
        self.clamped_to.unwrap_or(self.requested)
    }
}

/// Number of wallets to generate for a request
///
/// Returns the clamped count and whether clamping happened.
pub fn effective_count(requested: usize, max: usize) -> Result<(usize, bool)> {
    if requested == 0 {
        return Err(Error::Config("wallet count must be greater than 0".to_string()));
    }
    if requested > max {
        Ok((max, true))
    } else {
        Ok((requested, false))
    }
}

/// Generate up to `max` wallets and append them to `writer`
///
/// A wallet that fails to generate is reported and skipped. A failed write
/// aborts the run.
pub fn generate_batch(
    provider: &mut dyn KeypairProvider,
    writer: &mut WalletWriter,
    requested: usize,
    max: usize,
    passphrase: &str,
    mut on_wallet: impl FnMut(&GeneratedWallet),
) -> Result<BatchReport> {
    let (count, clamped) = effective_count(requested, max)?;

    let mut report = BatchReport {
        requested,
        clamped_to: clamped.then_some(count),
        ..BatchReport::default()
    };

    if clamped {
        warn!(
            "Requested {} wallets, maximum per run is {}; generating {}",
            requested, max, count
        );
    }

    info!("Generating {} wallets with {}", count, provider.name());

    for i in 0..count {
        match provider.generate(passphrase) {
            Ok(wallet) => {
                writer.write(&wallet)?;
                info!("Wallet {}/{} created: {}", i + 1, count, wallet.address);
                on_wallet(&wallet);
                report.generated.push(wallet.address);
            }
            Err(e) => {
                error!("Wallet {}/{} failed: {}", i + 1, count, e);
                report.failures.push(e.to_string());
            }
        }
    }

    Ok(report)
}
