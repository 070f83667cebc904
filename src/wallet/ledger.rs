//! Custodial balance accounting
//!
//! All arithmetic is checked. A failed debit or credit means a preceding
//! bound check was skipped and is reported as [`LedgerError`], never wrapped.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Balance held on the owner's behalf, in lamports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLedger {
    balance: u64,
}

impl BalanceLedger {
    pub fn new(balance: u64) -> Self {
        Self { balance }
    }

    pub fn available(&self) -> u64 {
        self.balance
    }

    /// Check whether `amount` can be paid out of the current balance
    pub fn covers(&self, amount: u64) -> bool {
        amount <= self.balance
    }

    /// Balance after a debit, without applying it
    pub fn preview_debit(&self, amount: u64) -> Result<u64, LedgerError> {
        self.balance
            .checked_sub(amount)
            .ok_or(LedgerError::Underflow {
                balance: self.balance,
                amount,
            })
    }

    /// Balance after a credit, without applying it
    pub fn preview_credit(&self, amount: u64) -> Result<u64, LedgerError> {
        self.balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                balance: self.balance,
                amount,
            })
    }

    pub fn debit(&mut self, amount: u64) -> Result<u64, LedgerError> {
        self.balance = self.preview_debit(amount)?;
        Ok(self.balance)
    }

    pub fn credit(&mut self, amount: u64) -> Result<u64, LedgerError> {
        self.balance = self.preview_credit(amount)?;
        Ok(self.balance)
    }
}
