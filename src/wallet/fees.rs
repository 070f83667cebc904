//! Fee quoting for fee claims
//!
//! A relayed call is paid for by the custody account's fee payer. The fee is
//! later settled back to the owner through `claim_fees`, using the amount
//! quoted here from the units the original transaction consumed.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Base fee charged per transaction signature
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;

const MICRO_LAMPORTS_PER_LAMPORT: u64 = 1_000_000;

/// Inputs for the fee of one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    /// Compute units consumed by the transaction
    pub units_consumed: u64,

    /// Prioritization price per compute unit
    pub micro_lamports_per_unit: u64,

    /// Number of signatures on the transaction
    pub signatures: u64,
}

impl FeeQuote {
    pub fn new(units_consumed: u64, micro_lamports_per_unit: u64) -> Self {
        Self {
            units_consumed,
            micro_lamports_per_unit,
            signatures: 1,
        }
    }

    /// Prioritization fee in lamports, rounded up
    pub fn priority_fee(&self) -> Result<u64> {
        let micro = self
            .units_consumed
            .checked_mul(self.micro_lamports_per_unit)
            .ok_or(Error::FeeOverflow)?;

        Ok(micro.div_ceil(MICRO_LAMPORTS_PER_LAMPORT))
    }

    /// Base plus prioritization fee in lamports
    pub fn total(&self) -> Result<u64> {
        let base = self
            .signatures
            .checked_mul(LAMPORTS_PER_SIGNATURE)
            .ok_or(Error::FeeOverflow)?;

        base.checked_add(self.priority_fee()?)
            .ok_or(Error::FeeOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_fee_only() {
        let quote = FeeQuote::new(200_000, 0);
        assert_eq!(quote.priority_fee().unwrap(), 0);
        assert_eq!(quote.total().unwrap(), 5_000);
    }

    #[test]
    fn test_priority_fee_rounds_up() {
        // 150_000 CU * 10 µL = 1.5 lamports
        let quote = FeeQuote::new(150_000, 10);
        assert_eq!(quote.priority_fee().unwrap(), 2);
        assert_eq!(quote.total().unwrap(), 5_002);
    }

    #[test]
    fn test_multiple_signatures() {
        let quote = FeeQuote {
            units_consumed: 1_000_000,
            micro_lamports_per_unit: 1_000,
            signatures: 2,
        };
        assert_eq!(quote.total().unwrap(), 10_000 + 1_000);
    }

    #[test]
    fn test_overflow_is_reported() {
        let quote = FeeQuote::new(u64::MAX, 2);
        assert!(matches!(quote.total(), Err(Error::FeeOverflow)));
    }
}
