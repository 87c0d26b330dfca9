//! SOL transfer execution
//!
//! `ChainClient` is the seam between the sweep loop and the chain. The
//! production implementation talks to a JSON-RPC node; tests substitute
//! a recording fake.

use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    system_instruction,
    transaction::Transaction,
};
use tracing::{debug, info};

use crate::config::{Confirmation, RpcConfig};
use crate::error::{Error, Result};

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Chain operations needed by the sweeper
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current balance of an address in lamports
    async fn get_balance(&self, address: &Pubkey) -> Result<u64>;

    /// Transfer `amount_lamports` from `from` to `to`
    async fn transfer(
        &self,
        from: &Keypair,
        to: &Pubkey,
        amount_lamports: u64,
        confirmation: Confirmation,
    ) -> Result<Signature>;

    /// Current slot, used as a liveness probe
    async fn health(&self) -> Result<u64>;
}

/// `ChainClient` backed by a Solana JSON-RPC endpoint
pub struct RpcChainClient {
    rpc_client: RpcClient,
    skip_preflight: bool,
}

impl RpcChainClient {
    /// Create a client from RPC configuration
    pub fn new(config: &RpcConfig, skip_preflight: bool) -> Self {
        let rpc_client = RpcClient::new_with_timeout_and_commitment(
            config.endpoint.clone(),
            Duration::from_millis(config.timeout_ms),
            config.commitment.to_commitment_config(),
        );

        Self {
            rpc_client,
            skip_preflight,
        }
    }

    async fn build_transfer(
        &self,
        from: &Keypair,
        to: &Pubkey,
        amount_lamports: u64,
    ) -> Result<Transaction> {
        let instruction = system_instruction::transfer(&from.pubkey(), to, amount_lamports);

        let blockhash = self
            .rpc_client
            .get_latest_blockhash()
            .await
            .map_err(|e| Error::TransactionBuild(format!("Failed to get blockhash: {}", e)))?;

        Ok(Transaction::new_signed_with_payer(
            &[instruction],
            Some(&from.pubkey()),
            &[from],
            blockhash,
        ))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        self.rpc_client
            .get_balance(address)
            .await
            .map_err(|e| Error::Rpc(format!("Failed to get balance of {}: {}", address, e)))
    }

    async fn transfer(
        &self,
        from: &Keypair,
        to: &Pubkey,
        amount_lamports: u64,
        confirmation: Confirmation,
    ) -> Result<Signature> {
        debug!(
            "Executing transfer: {} lamports from {} to {} ({:?})",
            amount_lamports,
            from.pubkey(),
            to,
            confirmation
        );

        let transaction = self.build_transfer(from, to, amount_lamports).await?;

        let signature = match confirmation {
            Confirmation::Confirmed => self
                .rpc_client
                .send_and_confirm_transaction(&transaction)
                .await
                .map_err(|e| Error::TransactionSend(format!("Transfer failed: {}", e)))?,
            Confirmation::Broadcast => self
                .rpc_client
                .send_transaction_with_config(
                    &transaction,
                    RpcSendTransactionConfig {
                        skip_preflight: self.skip_preflight,
                        ..RpcSendTransactionConfig::default()
                    },
                )
                .await
                .map_err(|e| Error::TransactionSend(format!("Broadcast failed: {}", e)))?,
        };

        info!(
            "Transfer submitted: {} lamports to {} (sig: {}, {:?})",
            amount_lamports, to, signature, confirmation
        );

        Ok(signature)
    }

    async fn health(&self) -> Result<u64> {
        Ok(self.rpc_client.get_slot().await?)
    }
}

/// Convert lamports to SOL for display
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lamports_to_sol() {
        assert_eq!(lamports_to_sol(1_000_000_000), 1.0);
        assert_eq!(lamports_to_sol(500_000_000), 0.5);
        assert_eq!(lamports_to_sol(1_000_000), 0.001);
    }

    #[test]
    fn test_client_construction_does_not_connect() {
        let config = RpcConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            ..RpcConfig::default()
        };
        let client = RpcChainClient::new(&config, true);
        assert!(client.skip_preflight);
        assert_eq!(client.rpc_client.url(), "http://127.0.0.1:1");
    }
}
