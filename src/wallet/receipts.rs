//! On-chain deposit verification
//!
//! A deposit is only credited once the transaction that carried it has been
//! read back from the chain and shown to have raised the custody account's
//! balance. The fee payer of that transaction is taken as the sender.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::error::{Error, Result};

/// Account balances before and after a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBalances {
    /// Every account the transaction loaded, in balance order
    pub account_keys: Vec<Pubkey>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    /// Set when the transaction failed on chain
    pub error: Option<String>,
}

/// A verified incoming transfer into custody
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositReceipt {
    pub signature: Signature,
    pub from: Pubkey,
    pub value: u64,
}

/// Signatures of deposits already credited
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptBook {
    signatures: BTreeSet<String>,
}

impl ReceiptBook {
    pub fn contains(&self, signature: &Signature) -> bool {
        self.signatures.contains(&signature.to_string())
    }

    /// Remember a credited deposit. Each signature is credited at most once.
    pub fn insert(&mut self, signature: &Signature) -> Result<()> {
        if !self.signatures.insert(signature.to_string()) {
            return Err(Error::DuplicateDeposit(signature.to_string()));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// Check that `signature` moved lamports into `custody` and by how much
pub fn verify_deposit(
    signature: Signature,
    balances: &TransactionBalances,
    custody: &Pubkey,
) -> Result<DepositReceipt> {
    let reject = |reason: String| Error::UnverifiedDeposit {
        signature: signature.to_string(),
        reason,
    };

    if let Some(err) = &balances.error {
        return Err(reject(format!("transaction failed on chain: {}", err)));
    }

    let from = *balances
        .account_keys
        .first()
        .ok_or_else(|| reject("transaction has no accounts".to_string()))?;
    if from == *custody {
        return Err(reject("paid for by the custody account".to_string()));
    }

    let index = balances
        .account_keys
        .iter()
        .position(|key| key == custody)
        .ok_or_else(|| reject(format!("custody account {} not involved", custody)))?;

    let (Some(&pre), Some(&post)) = (
        balances.pre_balances.get(index),
        balances.post_balances.get(index),
    ) else {
        return Err(reject("balance metadata missing for custody".to_string()));
    };

    match post.checked_sub(pre) {
        Some(value) if value > 0 => Ok(DepositReceipt {
            signature,
            from,
            value,
        }),
        _ => Err(reject(format!(
            "custody balance went from {} to {} lamports",
            pre, post
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(n: u8) -> Signature {
        Signature::from([n; 64])
    }

    fn transfer_into(custody: Pubkey, pre: u64, post: u64) -> (Pubkey, TransactionBalances) {
        let payer = Pubkey::new_unique();
        let balances = TransactionBalances {
            account_keys: vec![payer, custody, solana_sdk::system_program::id()],
            pre_balances: vec![10_000_000, pre, 1],
            post_balances: vec![10_000_000 - (post - pre) - 5_000, post, 1],
            error: None,
        };
        (payer, balances)
    }

    #[test]
    fn test_incoming_transfer_is_verified() {
        let custody = Pubkey::new_unique();
        let (payer, balances) = transfer_into(custody, 1_000, 251_001);
        let signature = sig(1);

        let receipt = verify_deposit(signature, &balances, &custody).unwrap();

        assert_eq!(
            receipt,
            DepositReceipt {
                signature,
                from: payer,
                value: 250_001,
            }
        );
    }

    #[test]
    fn test_failed_transaction_is_rejected() {
        let custody = Pubkey::new_unique();
        let (_, mut balances) = transfer_into(custody, 0, 500);
        balances.error = Some("InsufficientFundsForRent".to_string());

        let err = verify_deposit(sig(2), &balances, &custody).unwrap_err();
        assert!(matches!(err, Error::UnverifiedDeposit { .. }));
    }

    #[test]
    fn test_unrelated_transaction_is_rejected() {
        let (_, balances) = transfer_into(Pubkey::new_unique(), 0, 500);

        let err = verify_deposit(sig(2), &balances, &Pubkey::new_unique())
            .unwrap_err();
        assert!(err.to_string().contains("not involved"));
    }

    #[test]
    fn test_outflow_from_custody_is_rejected() {
        let custody = Pubkey::new_unique();
        let balances = TransactionBalances {
            account_keys: vec![Pubkey::new_unique(), custody],
            pre_balances: vec![0, 900],
            post_balances: vec![400, 500],
            error: None,
        };

        let err = verify_deposit(sig(2), &balances, &custody).unwrap_err();
        assert!(err.to_string().contains("from 900 to 500"));
    }

    #[test]
    fn test_custody_paid_transaction_is_rejected() {
        let custody = Pubkey::new_unique();
        let balances = TransactionBalances {
            account_keys: vec![custody, Pubkey::new_unique()],
            pre_balances: vec![1_000, 0],
            post_balances: vec![2_000, 0],
            error: None,
        };

        assert!(verify_deposit(sig(2), &balances, &custody).is_err());
    }

    #[test]
    fn test_receipt_book_credits_once() {
        let mut book = ReceiptBook::default();
        book.insert(&sig(3)).unwrap();

        assert!(book.contains(&sig(3)));
        assert!(!book.contains(&sig(4)));
        assert!(matches!(
            book.insert(&sig(3)),
            Err(Error::DuplicateDeposit(_))
        ));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_truncated_metadata_is_rejected() {
        let custody = Pubkey::new_unique();
        let balances = TransactionBalances {
            account_keys: vec![Pubkey::new_unique(), custody],
            pre_balances: vec![0],
            post_balances: vec![0],
            error: None,
        };

        let err = verify_deposit(sig(2), &balances, &custody).unwrap_err();
        assert!(err.to_string().contains("metadata missing"));
    }
}
