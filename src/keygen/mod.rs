//! Keypair batch generation
//!
//! A `KeypairProvider` mints one wallet at a time; `batch` bounds and
//! drives a run and `writer` appends the records to the output file.
//!
//! ```text
//! MnemonicProvider ─┐
//!                   ├─► generate_batch ─► WalletWriter (append-only)
//! SolanaKeygen ─────┘
//! ```

pub mod batch;
pub mod external;
pub mod mnemonic;
pub mod writer;

use std::fmt;

use solana_sdk::pubkey::Pubkey;

use crate::config::{GeneratorConfig, ProviderKind};
use crate::error::{Error, Result};
use crate::wallet::credentials::{AccountCredential, KEYPAIR_LENGTH};

pub use batch::{generate_batch, BatchReport};
pub use external::SolanaKeygenProvider;
pub use mnemonic::MnemonicProvider;
pub use writer::WalletWriter;

/// A freshly minted wallet
#[derive(Clone)]
pub struct GeneratedWallet {
    pub address: Pubkey,
    /// Full keypair bytes, seed followed by public key
    pub secret: [u8; KEYPAIR_LENGTH],
    pub mnemonic: String,
}

impl GeneratedWallet {
    /// Lowercase hex of every secret byte
    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret)
    }

    pub fn word_count(&self) -> usize {
        self.mnemonic.split_whitespace().count()
    }
}

impl fmt::Debug for GeneratedWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedWallet")
            .field("address", &self.address)
            .field("words", &self.word_count())
            .finish_non_exhaustive()
    }
}

/// Source of new keypairs with recoverable mnemonics
pub trait KeypairProvider: Send {
    /// Generate a new keypair; an empty passphrase means no BIP-39 passphrase
    fn generate(&mut self, passphrase: &str) -> Result<GeneratedWallet>;

    /// Public address of existing keypair bytes
    fn derive_address(&self, secret: &[u8]) -> Result<Pubkey>;

    fn name(&self) -> &'static str;
}

/// Derive the address of 64 raw keypair bytes in process
pub fn address_from_secret(secret: &[u8]) -> Result<Pubkey> {
    Ok(AccountCredential::from_bytes(secret)?.address())
}

/// Convert a byte vector into the fixed keypair shape
pub fn secret_array(bytes: &[u8]) -> Result<[u8; KEYPAIR_LENGTH]> {
    bytes.try_into().map_err(|_| {
        Error::Generation(format!(
            "keypair must be {} bytes, got {}",
            KEYPAIR_LENGTH,
            bytes.len()
        ))
    })
}

/// Build the provider selected in configuration
pub fn provider_from_config(config: &GeneratorConfig) -> Result<Box<dyn KeypairProvider>> {
    Ok(match config.provider {
        ProviderKind::Mnemonic => Box::new(MnemonicProvider::new(config.word_count)?),
        ProviderKind::SolanaKeygen => Box::new(SolanaKeygenProvider::new(
            config.keygen_bin.clone(),
            config.word_count,
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::Keypair;
    use solana_sdk::signer::Signer;

    #[test]
    fn test_secret_hex_round_trip() {
        let keypair = Keypair::new();
        let wallet = GeneratedWallet {
            address: keypair.pubkey(),
            secret: keypair.to_bytes(),
            mnemonic: "one two three".to_string(),
        };

        let hex = wallet.secret_hex();
        assert_eq!(hex.len(), 128);
        assert_eq!(hex, hex.to_lowercase());
        assert_eq!(writer::decode_secret_hex(&hex).unwrap(), wallet.secret.to_vec());
        assert_eq!(wallet.word_count(), 3);
    }

    #[test]
    fn test_address_from_secret() {
        let keypair = Keypair::new();
        assert_eq!(address_from_secret(&keypair.to_bytes()).unwrap(), keypair.pubkey());
        assert!(address_from_secret(&[1u8; 10]).is_err());
    }

    #[test]
    fn test_secret_array_length() {
        assert!(secret_array(&[0u8; 64]).is_ok());
        assert!(matches!(secret_array(&[0u8; 63]), Err(Error::Generation(_))));
    }

    #[test]
    fn test_debug_hides_secret() {
        let keypair = Keypair::new();
        let wallet = GeneratedWallet {
            address: keypair.pubkey(),
            secret: keypair.to_bytes(),
            mnemonic: "alpha beta".to_string(),
        };
        let shown = format!("{:?}", wallet);
        assert!(!shown.contains(&wallet.secret_hex()));
        assert!(!shown.contains("alpha"));
    }
}
