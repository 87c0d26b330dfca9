//! Balance sweep loop
//!
//! Every cycle visits the configured accounts in order, reads each
//! balance once and sweeps anything at or above the threshold to the
//! recipient, leaving the reserve behind. A failing account is logged and
//! retried on the next cycle; it never stops its siblings.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use super::policy::{SweepDecision, SweepPolicy};
use crate::config::{Confirmation, SweepConfig};
use crate::error::{Error, Result};
use crate::wallet::transfer::{lamports_to_sol, ChainClient};
use crate::wallet::AccountCredential;

/// Startup-resolved inputs of the sweep loop
#[derive(Debug)]
pub struct SweepSettings {
    pub accounts: Vec<AccountCredential>,
    pub recipient: Pubkey,
    pub policy: SweepPolicy,
    pub poll_interval: Duration,
    pub confirmation: Confirmation,
    /// Evaluate and log, never submit
    pub dry_run: bool,
}

impl SweepSettings {
    pub fn from_config(
        config: &SweepConfig,
        accounts: Vec<AccountCredential>,
        recipient: Pubkey,
        dry_run: bool,
    ) -> Result<Self> {
        if accounts.is_empty() {
            return Err(Error::Config("no sweep accounts configured".to_string()));
        }
        if config.poll_interval_secs == 0 {
            return Err(Error::Config("poll interval must be positive".to_string()));
        }

        Ok(Self {
            accounts,
            recipient,
            policy: SweepPolicy::new(config.threshold_lamports, config.reserve_lamports)?,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            confirmation: config.confirmation,
            dry_run,
        })
    }
}

/// Result of processing one account in one cycle
#[derive(Debug, Clone, PartialEq)]
pub enum AccountOutcome {
    Swept {
        address: Pubkey,
        balance: u64,
        amount: u64,
        signature: Signature,
    },
    DryRun {
        address: Pubkey,
        balance: u64,
        amount: u64,
    },
    BelowThreshold {
        address: Pubkey,
        balance: u64,
    },
    QueryFailed {
        address: Pubkey,
        error: String,
    },
    SubmitFailed {
        address: Pubkey,
        balance: u64,
        amount: u64,
        error: String,
    },
}

impl AccountOutcome {
    pub fn address(&self) -> &Pubkey {
        match self {
            AccountOutcome::Swept { address, .. }
            | AccountOutcome::DryRun { address, .. }
            | AccountOutcome::BelowThreshold { address, .. }
            | AccountOutcome::QueryFailed { address, .. }
            | AccountOutcome::SubmitFailed { address, .. } => address,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            AccountOutcome::QueryFailed { .. } | AccountOutcome::SubmitFailed { .. }
        )
    }
}

/// Summary of one polling cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<AccountOutcome>,
    /// Shutdown was observed before every account was visited
    pub interrupted: bool,
}

impl CycleReport {
    pub fn swept_lamports(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o {
                AccountOutcome::Swept { amount, .. } => *amount,
                _ => 0,
            })
            .sum()
    }

    pub fn swept_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, AccountOutcome::Swept { .. }))
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

/// Drives sweep cycles against a chain client
pub struct SweepEngine<'a> {
    client: Arc<dyn ChainClient>,
    settings: &'a SweepSettings,
    cycle: u64,
}

impl<'a> SweepEngine<'a> {
    pub fn new(client: Arc<dyn ChainClient>, settings: &'a SweepSettings) -> Self {
        Self {
            client,
            settings,
            cycle: 0,
        }
    }

    /// Cycles started so far
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Run cycles until a shutdown signal arrives
    ///
    /// A closed shutdown channel counts as a shutdown signal.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        info!(
            "Starting sweep loop: {} accounts -> {} every {}s (threshold {} lamports, reserve {} lamports, {:?})",
            self.settings.accounts.len(),
            self.settings.recipient,
            self.settings.poll_interval.as_secs(),
            self.settings.policy.threshold(),
            self.settings.policy.reserve(),
            self.settings.confirmation
        );

        loop {
            let report = self.run_cycle(&mut shutdown).await;
            if report.interrupted {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                _ = shutdown.recv() => {
                    info!("Sweep loop shutting down");
                    break;
                }
            }
        }

        self.cycle
    }

    /// Visit every account once, in configuration order
    ///
    /// Shutdown is checked between accounts only, so a transfer already
    /// submitted for an account is always carried to completion.
    pub async fn run_cycle(&mut self, shutdown: &mut broadcast::Receiver<()>) -> CycleReport {
        self.cycle += 1;
        let mut report = CycleReport {
            cycle: self.cycle,
            started_at: Utc::now(),
            outcomes: Vec::with_capacity(self.settings.accounts.len()),
            interrupted: false,
        };

        debug!("Cycle {} started", self.cycle);

        for account in &self.settings.accounts {
            if shutdown_requested(shutdown) {
                info!(
                    "Shutdown requested, stopping cycle {} after {} accounts",
                    self.cycle,
                    report.outcomes.len()
                );
                report.interrupted = true;
                break;
            }

            let outcome = self.process_account(account).await;
            report.outcomes.push(outcome);
        }

        info!(
            "Cycle {} complete: {} swept ({:.9} SOL), {} failed, {} visited",
            report.cycle,
            report.swept_count(),
            lamports_to_sol(report.swept_lamports()),
            report.failure_count(),
            report.outcomes.len()
        );

        report
    }

    async fn process_account(&self, account: &AccountCredential) -> AccountOutcome {
        let address = account.address();

        let balance = match self.client.get_balance(&address).await {
            Ok(balance) => balance,
            Err(e) => {
                if e.is_retryable() {
                    warn!("Balance query failed for {}, retrying next cycle: {}", address, e);
                } else {
                    error!("Balance query failed for {}: {}", address, e);
                }
                return AccountOutcome::QueryFailed {
                    address,
                    error: e.to_string(),
                };
            }
        };

        info!(
            "Account {} balance: {} lamports ({:.9} SOL)",
            address,
            balance,
            lamports_to_sol(balance)
        );

        let amount = match self.settings.policy.decide(balance) {
            SweepDecision::Sweep { amount } => amount,
            SweepDecision::Skip => {
                info!(
                    "Insufficient funds to sweep from {} ({} < {} lamports)",
                    address,
                    balance,
                    self.settings.policy.threshold()
                );
                return AccountOutcome::BelowThreshold { address, balance };
            }
        };

        if self.settings.dry_run {
            info!(
                "DRY-RUN: Would send {:.9} SOL from {} to {}",
                lamports_to_sol(amount),
                address,
                self.settings.recipient
            );
            return AccountOutcome::DryRun {
                address,
                balance,
                amount,
            };
        }

        info!(
            "Sending {:.9} SOL from {} to {}",
            lamports_to_sol(amount),
            address,
            self.settings.recipient
        );

        match self
            .client
            .transfer(
                account.keypair(),
                &self.settings.recipient,
                amount,
                self.settings.confirmation,
            )
            .await
        {
            Ok(signature) => {
                info!("Sweep from {} submitted: {}", address, signature);
                AccountOutcome::Swept {
                    address,
                    balance,
                    amount,
                    signature,
                }
            }
            Err(e) => {
                if e.is_retryable() {
                    error!("Sweep from {} failed, retrying next cycle: {}", address, e);
                } else {
                    error!("Sweep from {} failed: {}", address, e);
                }
                AccountOutcome::SubmitFailed {
                    address,
                    balance,
                    amount,
                    error: e.to_string(),
                }
            }
        }
    }
}

fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}
