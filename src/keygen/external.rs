//! Keypair generation through the `solana-keygen` binary
//!
//! Each wallet is written by `solana-keygen new` to a uniquely named
//! temporary keypair file. The file is removed when the guard drops,
//! whether generation succeeded or not.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{address_from_secret, secret_array, GeneratedWallet, KeypairProvider};
use crate::error::{Error, Result};

/// Marker line printed by `solana-keygen new` before the phrase
const SEED_PHRASE_MARKER: &str = "save this seed phrase";

/// Shells out to `solana-keygen`
pub struct SolanaKeygenProvider {
    program: String,
    /// Arguments placed before the subcommand
    leading_args: Vec<String>,
    word_count: usize,
}

impl SolanaKeygenProvider {
    pub fn new(program: impl Into<String>, word_count: usize) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            word_count,
        }
    }

    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    fn run(&self, args: &[&str], artifact: &Path) -> Result<Output> {
        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(args)
            .arg(artifact)
            .output()
            .map_err(|e| Error::Generation(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(Error::Generation(format!(
                "{} {} exited with {}: {}",
                self.program,
                args.first().copied().unwrap_or_default(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output)
    }

    /// `solana-keygen pubkey <file>`
    fn pubkey_of(&self, artifact: &Path) -> Result<Pubkey> {
        let output = self.run(&["pubkey"], artifact)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse::<Pubkey>()
            .map_err(|e| Error::Generation(format!("unparseable pubkey {:?}: {}", stdout.trim(), e)))
    }
}

impl KeypairProvider for SolanaKeygenProvider {
    fn generate(&mut self, passphrase: &str) -> Result<GeneratedWallet> {
        if !passphrase.is_empty() {
            return Err(Error::Generation(
                "solana-keygen cannot take a BIP-39 passphrase non-interactively".to_string(),
            ));
        }

        let artifact = TempArtifact::new();
        let word_count = self.word_count.to_string();

        let output = self.run(
            &["new", "--no-bip39-passphrase", "--word-count", &word_count, "--outfile"],
            artifact.path(),
        )?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mnemonic = parse_mnemonic(&stdout)
            .ok_or_else(|| Error::Generation("seed phrase not found in output".to_string()))?;

        if mnemonic.split_whitespace().count() != self.word_count {
            return Err(Error::Generation(format!(
                "expected {} words, got {}",
                self.word_count,
                mnemonic.split_whitespace().count()
            )));
        }

        let secret = read_keypair_artifact(artifact.path())?;
        let address = self.pubkey_of(artifact.path())?;

        if address_from_secret(&secret)? != address {
            return Err(Error::Generation(format!(
                "keypair file does not match reported pubkey {}",
                address
            )));
        }

        Ok(GeneratedWallet {
            address,
            secret,
            mnemonic,
        })
    }

    fn derive_address(&self, secret: &[u8]) -> Result<Pubkey> {
        let artifact = TempArtifact::new();
        write_keypair_artifact(artifact.path(), secret)?;
        self.pubkey_of(artifact.path())
    }

    fn name(&self) -> &'static str {
        "solana-keygen"
    }
}

/// Temporary keypair file, deleted on drop
struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("{}.json", Uuid::new_v4().simple()));
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary keypair {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove temporary keypair {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Phrase on the line following the seed phrase marker
pub fn parse_mnemonic(output: &str) -> Option<String> {
    let mut lines = output.lines();
    while let Some(line) = lines.next() {
        if line.to_lowercase().contains(SEED_PHRASE_MARKER) {
            return lines
                .next()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty());
        }
    }
    None
}

/// Read a JSON byte-array keypair file
pub fn read_keypair_artifact(path: &Path) -> Result<[u8; 64]> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Generation(format!("failed to read keypair file: {}", e)))?;
    let bytes: Vec<u8> = serde_json::from_str(&content)
        .map_err(|e| Error::Generation(format!("malformed keypair file: {}", e)))?;
    secret_array(&bytes)
}

fn write_keypair_artifact(path: &Path, secret: &[u8]) -> Result<()> {
    let json = serde_json::to_string(secret)?;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}
