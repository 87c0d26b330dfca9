//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::commitment_config::CommitmentConfig;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_commitment")]
    pub commitment: Commitment,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            timeout_ms: default_timeout_ms(),
            commitment: default_commitment(),
        }
    }
}

/// Commitment level used for balance reads and confirmations
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn to_commitment_config(self) -> CommitmentConfig {
        match self {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// Public Solana clusters selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Cluster {
    Devnet,
    Testnet,
    MainnetBeta,
}

impl Cluster {
    pub fn rpc_url(self) -> &'static str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
        }
    }
}

/// How far a sweep transfer is followed before moving to the next account
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    /// Return as soon as the node accepts the transaction
    Broadcast,
    /// Wait until the transaction reaches the configured commitment
    Confirmed,
}

/// Encoding of the account secrets in the environment
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeyEncoding {
    Base58,
    Base64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Minimum balance that triggers a sweep
    #[serde(default = "default_threshold_lamports")]
    pub threshold_lamports: u64,
    /// Balance left behind in every swept account
    #[serde(default = "default_reserve_lamports")]
    pub reserve_lamports: u64,
    #[serde(default = "default_confirmation")]
    pub confirmation: Confirmation,
    /// Only honoured in broadcast mode
    #[serde(default)]
    pub skip_preflight: bool,
    #[serde(default = "default_key_encoding")]
    pub key_encoding: KeyEncoding,
    /// Environment variable holding the account secrets
    #[serde(default = "default_accounts_env")]
    pub accounts_env: String,
    /// Environment variable holding the recipient address
    #[serde(default = "default_recipient_env")]
    pub recipient_env: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            threshold_lamports: default_threshold_lamports(),
            reserve_lamports: default_reserve_lamports(),
            confirmation: default_confirmation(),
            skip_preflight: false,
            key_encoding: default_key_encoding(),
            accounts_env: default_accounts_env(),
            recipient_env: default_recipient_env(),
        }
    }
}

/// Keypair source used by the generator
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// BIP-39 mnemonic derived in process
    Mnemonic,
    /// Shell out to the solana-keygen binary
    SolanaKeygen,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    /// Append-only output file for generated wallets
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Upper bound on wallets per run; larger requests are clamped
    #[serde(default = "default_max_wallets")]
    pub max_wallets: usize,
    #[serde(default = "default_word_count")]
    pub word_count: usize,
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,
    #[serde(default = "default_keygen_bin")]
    pub keygen_bin: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            max_wallets: default_max_wallets(),
            word_count: default_word_count(),
            provider: default_provider(),
            keygen_bin: default_keygen_bin(),
        }
    }
}

// Default value functions
fn default_rpc_endpoint() -> String {
    std::env::var("RPC_ENDPOINT").unwrap_or_else(|_| Cluster::Devnet.rpc_url().into())
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_commitment() -> Commitment {
    Commitment::Confirmed
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_threshold_lamports() -> u64 {
    1_000_000_000
}

fn default_reserve_lamports() -> u64 {
    500_000_000
}

fn default_confirmation() -> Confirmation {
    Confirmation::Confirmed
}

fn default_key_encoding() -> KeyEncoding {
    KeyEncoding::Base58
}

fn default_accounts_env() -> String {
    "PRIVATE_KEYS".to_string()
}

fn default_recipient_env() -> String {
    "RECIPIENT_ADDRESS".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("wallets/wallet.txt")
}

fn default_max_wallets() -> usize {
    30
}

fn default_word_count() -> usize {
    12
}

fn default_provider() -> ProviderKind {
    ProviderKind::Mnemonic
}

fn default_keygen_bin() -> String {
    "solana-keygen".to_string()
}

/// Mnemonic lengths accepted by BIP-39
pub const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("rpc.endpoint", default_rpc_endpoint())?
            .set_default("rpc.timeout_ms", default_timeout_ms() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix SWEEPER_)
            .add_source(
                config::Environment::with_prefix("SWEEPER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.rpc.endpoint.starts_with("http://") && !self.rpc.endpoint.starts_with("https://") {
            anyhow::bail!("rpc.endpoint must be an http(s) URL, got {}", self.rpc.endpoint);
        }

        if self.rpc.timeout_ms == 0 {
            anyhow::bail!("rpc.timeout_ms must be positive");
        }

        // Validate sweep amounts
        if self.sweep.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be positive");
        }

        if self.sweep.reserve_lamports == 0 {
            anyhow::bail!("reserve_lamports must be positive");
        }

        if self.sweep.reserve_lamports >= self.sweep.threshold_lamports {
            anyhow::bail!(
                "reserve_lamports ({}) must be below threshold_lamports ({})",
                self.sweep.reserve_lamports,
                self.sweep.threshold_lamports
            );
        }

        if self.sweep.accounts_env.is_empty() || self.sweep.recipient_env.is_empty() {
            anyhow::bail!("accounts_env and recipient_env must name environment variables");
        }

        // Validate generator limits
        if self.generator.max_wallets == 0 {
            anyhow::bail!("max_wallets must be positive");
        }

        if !VALID_WORD_COUNTS.contains(&self.generator.word_count) {
            anyhow::bail!(
                "word_count must be one of {:?}, got {}",
                VALID_WORD_COUNTS,
                self.generator.word_count
            );
        }

        if self.sweep.confirmation == Confirmation::Confirmed && self.sweep.skip_preflight {
            tracing::warn!("skip_preflight is ignored when confirmation = 'confirmed'");
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  RPC:
    endpoint: {}
    timeout: {}ms
    commitment: {:?}
  Sweep:
    poll_interval: {}s
    threshold: {} lamports
    reserve: {} lamports
    confirmation: {:?}
    skip_preflight: {}
    key_encoding: {:?}
    accounts: ${} ({})
    recipient: ${} ({})
  Generator:
    output: {}
    max_wallets: {}
    word_count: {}
    provider: {:?}
"#,
            mask_url(&self.rpc.endpoint),
            self.rpc.timeout_ms,
            self.rpc.commitment,
            self.sweep.poll_interval_secs,
            self.sweep.threshold_lamports,
            self.sweep.reserve_lamports,
            self.sweep.confirmation,
            self.sweep.skip_preflight,
            self.sweep.key_encoding,
            self.sweep.accounts_env,
            env_status(&self.sweep.accounts_env),
            self.sweep.recipient_env,
            env_status(&self.sweep.recipient_env),
            self.generator.output_path.display(),
            self.generator.max_wallets,
            self.generator.word_count,
            self.generator.provider,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

fn env_status(name: &str) -> &'static str {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => "***",
        _ => "not set",
    }
}
