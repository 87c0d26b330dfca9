//! In-process keypair generation from BIP-39 mnemonics
//!
//! Follows `solana-keygen new`: random entropy becomes an English
//! mnemonic, the mnemonic plus passphrase becomes a 64-byte BIP-39 seed,
//! and the first 32 seed bytes are the ed25519 secret.

use bip39::{Language, Mnemonic};
use rand::rngs::StdRng;
use rand::{CryptoRng, RngCore, SeedableRng};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::keypair::keypair_from_seed;
use solana_sdk::signer::Signer;
use tracing::debug;

use super::{address_from_secret, GeneratedWallet, KeypairProvider};
use crate::config::VALID_WORD_COUNTS;
use crate::error::{Error, Result};

/// Generates wallets from fresh mnemonics drawn from `R`
pub struct MnemonicProvider<R = StdRng> {
    rng: R,
    word_count: usize,
}

impl MnemonicProvider<StdRng> {
    /// Provider seeded from the operating system
    pub fn new(word_count: usize) -> Result<Self> {
        Self::with_rng(StdRng::from_entropy(), word_count)
    }
}

impl<R: RngCore + CryptoRng + Send> MnemonicProvider<R> {
    pub fn with_rng(rng: R, word_count: usize) -> Result<Self> {
        if !VALID_WORD_COUNTS.contains(&word_count) {
            return Err(Error::Config(format!(
                "word count must be one of {:?}, got {}",
                VALID_WORD_COUNTS, word_count
            )));
        }

        Ok(Self { rng, word_count })
    }
}

impl<R: RngCore + CryptoRng + Send> KeypairProvider for MnemonicProvider<R> {
    fn generate(&mut self, passphrase: &str) -> Result<GeneratedWallet> {
        // 32 bits of entropy per 3 words
        let mut entropy = vec![0u8; self.word_count * 4 / 3];
        self.rng.fill_bytes(&mut entropy);

        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
            .map_err(|e| Error::Generation(format!("mnemonic: {}", e)));
        entropy.fill(0);

        wallet_from_mnemonic(&mnemonic?, passphrase)
    }

    fn derive_address(&self, secret: &[u8]) -> Result<Pubkey> {
        address_from_secret(secret)
    }

    fn name(&self) -> &'static str {
        "mnemonic"
    }
}

fn wallet_from_mnemonic(mnemonic: &Mnemonic, passphrase: &str) -> Result<GeneratedWallet> {
    let seed = mnemonic.to_seed(passphrase);
    let keypair = keypair_from_seed(&seed).map_err(|e| Error::Generation(e.to_string()))?;

    debug!("Derived {} from {}-word mnemonic", keypair.pubkey(), mnemonic.word_count());

    Ok(GeneratedWallet {
        address: keypair.pubkey(),
        secret: keypair.to_bytes(),
        mnemonic: mnemonic.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signer::keypair::keypair_from_seed_phrase_and_passphrase;
    use std::collections::HashSet;

    const ZERO_PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn recover(phrase: &str, passphrase: &str) -> Result<GeneratedWallet> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
            .map_err(|e| Error::Generation(format!("invalid mnemonic: {}", e)))?;
        wallet_from_mnemonic(&mnemonic, passphrase)
    }

    #[test]
    fn test_matches_solana_seed_phrase_derivation() {
        for passphrase in ["", "hunter2"] {
            let wallet = recover(ZERO_PHRASE, passphrase).unwrap();
            let expected = keypair_from_seed_phrase_and_passphrase(ZERO_PHRASE, passphrase).unwrap();
            assert_eq!(wallet.address, expected.pubkey());
            assert_eq!(wallet.secret, expected.to_bytes());
        }
    }

    #[test]
    fn test_passphrase_changes_address() {
        let plain = recover(ZERO_PHRASE, "").unwrap();
        let protected = recover(ZERO_PHRASE, "secret").unwrap();
        assert_ne!(plain.address, protected.address);
        assert_eq!(plain.mnemonic, protected.mnemonic);
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let mut a = MnemonicProvider::with_rng(StdRng::seed_from_u64(7), 12).unwrap();
        let mut b = MnemonicProvider::with_rng(StdRng::seed_from_u64(7), 12).unwrap();

        let wa = a.generate("").unwrap();
        let wb = b.generate("").unwrap();
        assert_eq!(wa.address, wb.address);
        assert_eq!(wa.mnemonic, wb.mnemonic);
    }

    #[test]
    fn test_word_counts() {
        for words in VALID_WORD_COUNTS {
            let mut provider = MnemonicProvider::with_rng(StdRng::seed_from_u64(1), words).unwrap();
            let wallet = provider.generate("").unwrap();
            assert_eq!(wallet.word_count(), words);
            assert_eq!(provider.derive_address(&wallet.secret).unwrap(), wallet.address);
        }

        assert!(MnemonicProvider::with_rng(StdRng::seed_from_u64(1), 13).is_err());
    }

    #[test]
    fn test_generated_wallets_are_unique() {
        let mut provider = MnemonicProvider::with_rng(StdRng::seed_from_u64(42), 12).unwrap();
        let addresses: HashSet<Pubkey> = (0..20)
            .map(|_| provider.generate("").unwrap().address)
            .collect();
        assert_eq!(addresses.len(), 20);
    }

    #[test]
    fn test_generated_mnemonic_recovers_same_wallet() {
        let mut provider = MnemonicProvider::with_rng(StdRng::seed_from_u64(9), 24).unwrap();
        let wallet = provider.generate("pass").unwrap();
        let recovered = recover(&wallet.mnemonic, "pass").unwrap();
        assert_eq!(recovered.address, wallet.address);
        assert_eq!(recovered.secret, wallet.secret);
    }

    #[test]
    fn test_recover_rejects_bad_phrase() {
        assert!(matches!(
            recover("abandon abandon abandon", ""),
            Err(Error::Generation(_))
        ));
    }
}
