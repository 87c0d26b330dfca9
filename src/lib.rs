//! Solana Sweeper Library
//!
//! Batch wallet generation and a polling balance sweeper for Solana.

pub mod cli;
pub mod config;
pub mod error;
pub mod keygen;
pub mod sweep;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
