//! Account credentials for the sweep loop
//!
//! Secrets are read once from the environment at startup. Any entry that
//! cannot be decoded into a valid keypair stops the process; nothing is
//! skipped silently.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use base64::Engine;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::keypair::keypair_from_seed;
use solana_sdk::signer::Signer;
use tracing::{debug, info};

use crate::config::{KeyEncoding, SweepConfig};
use crate::error::{Error, Result};

/// Length of a full Solana keypair (32-byte seed followed by the public key)
pub const KEYPAIR_LENGTH: usize = 64;

/// Length of a bare ed25519 seed
pub const SEED_LENGTH: usize = 32;

/// A funded account the sweeper is allowed to sign for
pub struct AccountCredential {
    keypair: Keypair,
}

impl AccountCredential {
    /// Build a credential from raw key bytes
    ///
    /// Takes either a 64-byte keypair, whose public half must match the
    /// key derived from the seed half, or a bare 32-byte seed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEYPAIR_LENGTH && bytes.len() != SEED_LENGTH {
            return Err(Error::InvalidKeypair(format!(
                "expected {} or {} bytes, got {}",
                KEYPAIR_LENGTH,
                SEED_LENGTH,
                bytes.len()
            )));
        }

        let keypair = keypair_from_seed(&bytes[..SEED_LENGTH])
            .map_err(|e| Error::InvalidKeypair(e.to_string()))?;

        if bytes.len() == KEYPAIR_LENGTH && keypair.pubkey().to_bytes()[..] != bytes[SEED_LENGTH..] {
            return Err(Error::InvalidKeypair(
                "public key half does not match secret seed".to_string(),
            ));
        }

        Ok(Self { keypair })
    }

    /// Decode a credential from its configured text encoding
    pub fn decode(encoded: &str, encoding: KeyEncoding) -> Result<Self> {
        let bytes = match encoding {
            KeyEncoding::Base58 => bs58::decode(encoded)
                .into_vec()
                .map_err(|e| Error::InvalidKeypair(format!("invalid base58: {}", e)))?,
            KeyEncoding::Base64 => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| Error::InvalidKeypair(format!("invalid base64: {}", e)))?,
        };

        Self::from_bytes(&bytes)
    }

    /// Public address derived from the secret
    pub fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Signing keypair
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for AccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredential")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Parse a list of encoded secrets
///
/// Accepts a comma-separated list, a JSON array of strings, or a
/// bracketed list with single-quoted entries (`['a', 'b']`).
/// Empty entries, undecodable entries and duplicate accounts are errors.
pub fn parse_account_list(raw: &str, encoding: KeyEncoding) -> Result<Vec<AccountCredential>> {
    let raw = raw.trim();

    let entries: Vec<String> = if raw.starts_with('[') {
        match serde_json::from_str(raw) {
            Ok(entries) => entries,
            Err(json_err) => parse_quoted_list(raw).ok_or_else(|| {
                Error::Config(format!("account list is not a string array: {}", json_err))
            })?,
        }
    } else {
        raw.split(',').map(|s| s.to_string()).collect()
    };

    if raw.is_empty() || entries.is_empty() {
        return Err(Error::Config("account list is empty".to_string()));
    }

    let mut seen = HashSet::new();
    let mut accounts = Vec::with_capacity(entries.len());

    for (idx, entry) in entries.iter().enumerate() {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(Error::Config(format!("account entry #{} is empty", idx + 1)));
        }

        let account = AccountCredential::decode(entry, encoding).map_err(|e| match e {
            Error::InvalidKeypair(msg) => {
                Error::InvalidKeypair(format!("account entry #{}: {}", idx + 1, msg))
            }
            other => other,
        })?;

        if !seen.insert(account.address()) {
            return Err(Error::Config(format!(
                "account entry #{} duplicates {}",
                idx + 1,
                account.address()
            )));
        }

        debug!("Decoded account #{}: {}", idx + 1, account.address());
        accounts.push(account);
    }

    Ok(accounts)
}

/// Entries of a `['a', "b"]` list; every entry must be quoted
fn parse_quoted_list(raw: &str) -> Option<Vec<String>> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }

    inner
        .split(',')
        .map(|item| {
            let item = item.trim();
            ['\'', '"']
                .iter()
                .find_map(|q| item.strip_prefix(*q)?.strip_suffix(*q))
                .map(str::to_string)
        })
        .collect()
}

/// Parse and validate the sweep recipient
pub fn parse_recipient(raw: &str) -> Result<Pubkey> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::InvalidAddress("recipient address is empty".to_string()));
    }

    Pubkey::from_str(raw).map_err(|e| Error::InvalidAddress(format!("{}: {}", raw, e)))
}

/// Load accounts and recipient from the environment variables named in config
pub fn load_from_env(config: &SweepConfig) -> Result<(Vec<AccountCredential>, Pubkey)> {
    let raw_accounts = std::env::var(&config.accounts_env)
        .map_err(|_| Error::MissingEnvVar(config.accounts_env.clone()))?;
    let raw_recipient = std::env::var(&config.recipient_env)
        .map_err(|_| Error::MissingEnvVar(config.recipient_env.clone()))?;

    load(&raw_accounts, &raw_recipient, config.key_encoding)
}

/// Decode accounts and recipient, rejecting a recipient that is also a source
pub fn load(
    raw_accounts: &str,
    raw_recipient: &str,
    encoding: KeyEncoding,
) -> Result<(Vec<AccountCredential>, Pubkey)> {
    let recipient = parse_recipient(raw_recipient)?;
    let accounts = parse_account_list(raw_accounts, encoding)?;

    if accounts.iter().any(|a| a.address() == recipient) {
        return Err(Error::Config(format!(
            "recipient {} is also configured as a source account",
            recipient
        )));
    }

    info!("Loaded {} sweep accounts, recipient {}", accounts.len(), recipient);
    Ok((accounts, recipient))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(keypair: &Keypair, encoding: KeyEncoding) -> String {
        let bytes = keypair.to_bytes();
        match encoding {
            KeyEncoding::Base58 => bs58::encode(bytes).into_string(),
            KeyEncoding::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    #[test]
    fn test_decode_base58_and_base64() {
        let keypair = Keypair::new();

        let a = AccountCredential::decode(&encoded(&keypair, KeyEncoding::Base58), KeyEncoding::Base58)
            .unwrap();
        let b = AccountCredential::decode(&encoded(&keypair, KeyEncoding::Base64), KeyEncoding::Base64)
            .unwrap();

        assert_eq!(a.address(), keypair.pubkey());
        assert_eq!(b.address(), keypair.pubkey());
        assert_eq!(a.keypair().to_bytes(), keypair.to_bytes());
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let short = bs58::encode([7u8; 31]).into_string();
        let result = AccountCredential::decode(&short, KeyEncoding::Base58);
        assert!(matches!(result, Err(Error::InvalidKeypair(_))));

        let long = bs58::encode([7u8; 65]).into_string();
        let result = AccountCredential::decode(&long, KeyEncoding::Base58);
        assert!(matches!(result, Err(Error::InvalidKeypair(_))));
    }

    #[test]
    fn test_decode_bare_seed() {
        let seed = [5u8; 32];
        let expected = keypair_from_seed(&seed).unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(seed);

        let account = AccountCredential::decode(&encoded, KeyEncoding::Base64).unwrap();
        assert_eq!(account.address(), expected.pubkey());
        assert_eq!(account.keypair().to_bytes(), expected.to_bytes());
    }

    #[test]
    fn test_parse_single_quoted_seed_list() {
        let seeds = [[1u8; 32], [2u8; 32]];
        let b64: Vec<String> = seeds
            .iter()
            .map(|s| base64::engine::general_purpose::STANDARD.encode(s))
            .collect();

        for raw in [
            format!(r#"["{}"]"#, b64[0]),
            format!("['{}', '{}']", b64[0], b64[1]),
        ] {
            let accounts = parse_account_list(&raw, KeyEncoding::Base64).unwrap();
            assert_eq!(
                accounts[0].address(),
                keypair_from_seed(&seeds[0]).unwrap().pubkey()
            );
        }

        let accounts =
            parse_account_list(&format!("['{}', '{}']", b64[0], b64[1]), KeyEncoding::Base64)
                .unwrap();
        assert_eq!(
            accounts[1].address(),
            keypair_from_seed(&seeds[1]).unwrap().pubkey()
        );

        assert!(matches!(
            parse_account_list(&format!("['{}', {}]", b64[0], b64[1]), KeyEncoding::Base64),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_entry_error_names_index_once() {
        let good = encoded(&Keypair::new(), KeyEncoding::Base58);
        let err = parse_account_list(&format!("{},garbage", good), KeyEncoding::Base58)
            .err()
            .unwrap();
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid keypair: account entry #2: "), "{}", msg);
        assert_eq!(msg.matches("Invalid keypair").count(), 1, "{}", msg);
    }

    #[test]
    fn test_load_from_env_missing_vars() {
        let mut config = SweepConfig::default();
        config.accounts_env = "SOL_SWEEPER_TEST_UNSET_ACCOUNTS".to_string();
        config.recipient_env = "SOL_SWEEPER_TEST_UNSET_RECIPIENT".to_string();

        match load_from_env(&config) {
            Err(Error::MissingEnvVar(name)) => assert_eq!(name, config.accounts_env),
            other => panic!("expected MissingEnvVar, got {:?}", other),
        }

        config.accounts_env = "SOL_SWEEPER_TEST_SET_ACCOUNTS".to_string();
        std::env::set_var(&config.accounts_env, encoded(&Keypair::new(), KeyEncoding::Base58));
        let result = load_from_env(&config);
        std::env::remove_var(&config.accounts_env);

        match result {
            Err(Error::MissingEnvVar(name)) => assert_eq!(name, config.recipient_env),
            other => panic!("expected MissingEnvVar, got {:?}", other),
        }
        assert!(load_from_env(&config).unwrap_err().is_fatal_config());
    }

    #[test]
    fn test_decode_rejects_mismatched_public_half() {
        let mut bytes = Keypair::new().to_bytes();
        bytes[40] ^= 0xff;
        assert!(matches!(
            AccountCredential::from_bytes(&bytes),
            Err(Error::InvalidKeypair(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_alphabet() {
        let result = AccountCredential::decode("not-base58-0OIl", KeyEncoding::Base58);
        assert!(matches!(result, Err(Error::InvalidKeypair(_))));
    }

    #[test]
    fn test_parse_comma_list_preserves_order() {
        let k1 = Keypair::new();
        let k2 = Keypair::new();
        let raw = format!(
            "{}, {}",
            encoded(&k1, KeyEncoding::Base58),
            encoded(&k2, KeyEncoding::Base58)
        );

        let accounts = parse_account_list(&raw, KeyEncoding::Base58).unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].address(), k1.pubkey());
        assert_eq!(accounts[1].address(), k2.pubkey());
    }

    #[test]
    fn test_parse_json_list() {
        let k1 = Keypair::new();
        let raw = format!(r#"["{}"]"#, encoded(&k1, KeyEncoding::Base64));

        let accounts = parse_account_list(&raw, KeyEncoding::Base64).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address(), k1.pubkey());
    }

    #[test]
    fn test_parse_fails_loudly() {
        let k1 = Keypair::new();
        let good = encoded(&k1, KeyEncoding::Base58);

        assert!(matches!(
            parse_account_list("", KeyEncoding::Base58),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_account_list(&format!("{},", good), KeyEncoding::Base58),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_account_list(&format!("{},garbage", good), KeyEncoding::Base58),
            Err(Error::InvalidKeypair(_))
        ));
        assert!(matches!(
            parse_account_list(&format!("{},{}", good, good), KeyEncoding::Base58),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_parse_recipient() {
        let pubkey = Keypair::new().pubkey();
        assert_eq!(parse_recipient(&format!(" {} ", pubkey)).unwrap(), pubkey);
        assert!(matches!(parse_recipient(""), Err(Error::InvalidAddress(_))));
        assert!(matches!(parse_recipient("abc"), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_recipient_cannot_be_source() {
        let k1 = Keypair::new();
        let raw = encoded(&k1, KeyEncoding::Base58);
        let result = load(&raw, &k1.pubkey().to_string(), KeyEncoding::Base58);
        assert!(matches!(result, Err(Error::Config(_))));

        let other = Keypair::new().pubkey();
        let (accounts, recipient) = load(&raw, &other.to_string(), KeyEncoding::Base58).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(recipient, other);
    }
}
