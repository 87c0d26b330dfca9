//! Threshold/reserve decision for a single balance reading

use crate::error::{Error, Result};

/// What to do with an account after reading its balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDecision {
    /// Transfer this many lamports out
    Sweep { amount: u64 },
    /// Balance below threshold
    Skip,
}

/// Sweep threshold and reserve, both in lamports
///
/// Invariant: `0 < reserve < threshold`, so a sweep amount is always
/// positive and strictly below the balance it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    threshold: u64,
    reserve: u64,
}

impl SweepPolicy {
    pub fn new(threshold: u64, reserve: u64) -> Result<Self> {
        if reserve == 0 {
            return Err(Error::Config("reserve must be positive".to_string()));
        }
        if reserve >= threshold {
            return Err(Error::Config(format!(
                "reserve ({}) must be below threshold ({})",
                reserve, threshold
            )));
        }

        Ok(Self { threshold, reserve })
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn reserve(&self) -> u64 {
        self.reserve
    }

    pub fn decide(&self, balance: u64) -> SweepDecision {
        if balance >= self.threshold {
            SweepDecision::Sweep {
                amount: balance - self.reserve,
            }
        } else {
            SweepDecision::Skip
        }
    }
}
