//! Balance sweeping
//!
//! ```text
//! SweepSettings → SweepEngine ──get_balance──► ChainClient
//!                     │
//!                SweepPolicy ──Sweep{amount}──► ChainClient::transfer
//! ```

pub mod engine;
pub mod policy;

pub use engine::{AccountOutcome, CycleReport, SweepEngine, SweepSettings};
pub use policy::{SweepDecision, SweepPolicy};
