//! Outbound value transfers
//!
//! A transfer either lands or it does not. Failure is an ordinary outcome,
//! never an error: the wallet service decides what to log and whether to
//! touch the ledger.

use std::sync::Arc;

use solana_sdk::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey, system_instruction};
use tracing::{debug, warn};

use super::rpc::{RpcSubmitter, Submission};
use crate::error::{Error, Result};

/// Decimal places of one lamport in SOL
const SOL_DECIMALS: usize = 9;

/// Outcome of a transfer attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    NotDelivered { reason: String },
}

/// Moves value out of custodial control. Never retries.
pub trait TransferExecutor {
    fn send(&self, to: &Pubkey, amount: u64) -> Delivery;
}

/// System-program transfer from the custody account
pub struct RpcTransferExecutor {
    submitter: Arc<RpcSubmitter>,
}

impl RpcTransferExecutor {
    pub fn new(submitter: Arc<RpcSubmitter>) -> Self {
        Self { submitter }
    }
}

impl TransferExecutor for RpcTransferExecutor {
    fn send(&self, to: &Pubkey, amount: u64) -> Delivery {
        let from = self.submitter.custody_address();
        debug!(
            "Executing transfer: {} lamports from {} to {}",
            amount, from, to
        );

        let instruction = system_instruction::transfer(&from, to, amount);

        match self.submitter.submit(&[instruction]) {
            Ok(Submission::Confirmed(signature)) => {
                debug!("Transfer to {} confirmed (sig: {})", to, signature);
                Delivery::Delivered
            }
            Ok(Submission::Simulated(_)) => Delivery::Delivered,
            Err(e) => {
                warn!("Transfer of {} lamports to {} failed: {}", amount, to, e);
                Delivery::NotDelivered {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Parse a decimal SOL amount such as `1.25` into lamports, exactly.
///
/// Only plain non-negative decimals are accepted. Signs, exponents,
/// `NaN`/`inf`, precision finer than one lamport and amounts above
/// `u64::MAX` lamports are errors.
pub fn parse_sol(input: &str) -> Result<u64> {
    let invalid = |reason: &str| Error::InvalidAmount(format!("{:?} {}", input, reason));

    let text = input.trim();
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("is empty"));
    }
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) {
        return Err(invalid("is not a non-negative decimal SOL amount"));
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > SOL_DECIMALS {
        return Err(invalid("is finer than one lamport"));
    }

    let too_large = || invalid("exceeds the largest lamport amount");
    let whole: u64 = match whole.trim_start_matches('0') {
        "" => 0,
        digits => digits.parse().map_err(|_| too_large())?,
    };
    let fraction: u64 = if fraction.is_empty() {
        0
    } else {
        format!("{:0<width$}", fraction, width = SOL_DECIMALS)
            .parse()
            .map_err(|_| too_large())?
    };

    whole
        .checked_mul(LAMPORTS_PER_SOL)
        .and_then(|lamports| lamports.checked_add(fraction))
        .ok_or_else(too_large)
}

/// Exact decimal SOL rendering of a lamport amount
pub fn format_sol(lamports: u64) -> String {
    let whole = lamports / LAMPORTS_PER_SOL;
    let fraction = lamports % LAMPORTS_PER_SOL;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", fraction, width = SOL_DECIMALS);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Convert lamports to SOL, for display and thresholds only
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}
