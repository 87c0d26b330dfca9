//! Plain-text wallet records
//!
//! The output file is only ever appended to. Earlier runs are never
//! truncated, and every record is flushed as soon as it is written.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::GeneratedWallet;
use crate::error::{Error, Result};

/// Width of the `=` separator closing each record
pub const SEPARATOR_WIDTH: usize = 80;

/// Render one wallet record, separator line included
pub fn format_record(wallet: &GeneratedWallet) -> String {
    format!(
        "Public Key: {}\nPrivate Key (Hex): {}\nMnemonic: {}\n{}\n",
        wallet.address,
        wallet.secret_hex(),
        wallet.mnemonic,
        "=".repeat(SEPARATOR_WIDTH)
    )
}

/// Inverse of the `Private Key (Hex)` field
pub fn decode_secret_hex(encoded: &str) -> Result<Vec<u8>> {
    hex::decode(encoded.trim()).map_err(|e| Error::InvalidKeypair(format!("invalid hex: {}", e)))
}

/// A record read back from an output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub address: String,
    pub secret_hex: String,
    pub mnemonic: String,
}

/// Parse every complete record in `text`
pub fn parse_records(text: &str) -> Vec<StoredRecord> {
    let mut records = Vec::new();
    let mut address = None;
    let mut secret_hex = None;
    let mut mnemonic = None;

    for line in text.lines() {
        if let Some(v) = line.strip_prefix("Public Key: ") {
            address = Some(v.to_string());
        } else if let Some(v) = line.strip_prefix("Private Key (Hex): ") {
            secret_hex = Some(v.to_string());
        } else if let Some(v) = line.strip_prefix("Mnemonic: ") {
            mnemonic = Some(v.to_string());
        } else if line.len() == SEPARATOR_WIDTH && line.bytes().all(|b| b == b'=') {
            if let (Some(address), Some(secret_hex), Some(mnemonic)) =
                (address.take(), secret_hex.take(), mnemonic.take())
            {
                records.push(StoredRecord {
                    address,
                    secret_hex,
                    mnemonic,
                });
            }
        }
    }

    records
}

/// Append-only writer owning the output file for one run
pub struct WalletWriter {
    path: PathBuf,
    file: BufWriter<File>,
    written: usize,
}

impl WalletWriter {
    /// Open `path` for appending, creating it and its directory if needed
    ///
    /// New files are created owner-only on Unix since they hold secrets.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let file = options
            .open(path)
            .map_err(|e| Error::Io(format!("Failed to open {}: {}", path.display(), e)))?;

        info!("Appending wallets to {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write(&mut self, wallet: &GeneratedWallet) -> Result<()> {
        self.file.write_all(format_record(wallet).as_bytes())?;
        self.file.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Records written by this writer
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::address_from_secret;
    use solana_sdk::signature::Keypair;
    use solana_sdk::signer::Signer;

    fn wallet(mnemonic: &str) -> GeneratedWallet {
        let keypair = Keypair::new();
        GeneratedWallet {
            address: keypair.pubkey(),
            secret: keypair.to_bytes(),
            mnemonic: mnemonic.to_string(),
        }
    }

    #[test]
    fn test_record_format() {
        let w = wallet("alpha beta gamma");
        let record = format_record(&w);
        let lines: Vec<&str> = record.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], format!("Public Key: {}", w.address));
        assert_eq!(lines[1], format!("Private Key (Hex): {}", hex::encode(w.secret)));
        assert_eq!(lines[2], "Mnemonic: alpha beta gamma");
        assert_eq!(lines[3], "=".repeat(80));
        assert!(record.ends_with('\n'));
    }

    #[test]
    fn test_hex_round_trip_restores_keypair() {
        let w = wallet("x");
        let record = parse_records(&format_record(&w)).remove(0);
        let bytes = decode_secret_hex(&record.secret_hex).unwrap();

        assert_eq!(bytes, w.secret.to_vec());
        assert_eq!(address_from_secret(&bytes).unwrap(), w.address);
        assert!(decode_secret_hex("zz").is_err());
    }

    #[test]
    fn test_appends_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wallet.txt");

        let first = wallet("one");
        let second = wallet("two");

        {
            let mut writer = WalletWriter::open(&path).unwrap();
            writer.write(&first).unwrap();
            assert_eq!(writer.written(), 1);
        }
        {
            let mut writer = WalletWriter::open(&path).unwrap();
            writer.write(&second).unwrap();
        }

        let records = parse_records(&std::fs::read_to_string(&path).unwrap());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address, first.address.to_string());
        assert_eq!(records[1].mnemonic, "two");
    }

    #[cfg(unix)]
    #[test]
    fn test_new_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.txt");
        WalletWriter::open(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn test_parse_ignores_incomplete_records() {
        let text = format!("Public Key: abc\n{}\n", "=".repeat(80));
        assert!(parse_records(&text).is_empty());
    }
}
