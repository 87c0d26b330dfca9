//! Wallet access for the sweep loop
//!
//! - Credential decoding (environment-provided secrets, recipient)
//! - Chain client seam and RPC implementation

pub mod credentials;
pub mod transfer;

pub use credentials::AccountCredential;
pub use transfer::{ChainClient, RpcChainClient};
