//! Error types for the hosted wallet

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger arithmetic failures.
///
/// These can only happen when a bound check that should have preceded the
/// mutation was skipped, so every variant is an invariant violation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("debit of {amount} lamports underflows balance of {balance} lamports")]
    Underflow { balance: u64, amount: u64 },

    #[error("credit of {amount} lamports overflows balance of {balance} lamports")]
    Overflow { balance: u64, amount: u64 },
}

/// Main error type for the hosted wallet
#[derive(Error, Debug)]
pub enum Error {
    // Authorization errors (hard aborts)
    #[error("Unauthorized caller: {caller}")]
    Unauthorized { caller: Pubkey },

    #[error("Reentrant {operation} rejected: {running} already in progress")]
    Reentrant {
        operation: &'static str,
        running: &'static str,
    },

    // Invariant violations
    #[error("Ledger invariant violated: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Journal write failed: {0}")]
    Journal(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("Insecure keypair permissions: {0}")]
    InsecureKeypair(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    // Deposit verification
    #[error("Deposit {signature} not credited: {reason}")]
    UnverifiedDeposit { signature: String, reason: String },

    #[error("Deposit {0} was already credited")]
    DuplicateDeposit(String),

    // RPC errors
    #[error("RPC error: {0}")]
    Rpc(String),

    // Fee quoting
    #[error("Fee calculation overflow")]
    FeeOverflow,

    // Persistence errors
    #[error("Wallet state persistence failed: {0}")]
    Persistence(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error aborted the whole call with no observable effect
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Unauthorized { .. } | Error::Reentrant { .. })
    }

    /// Check if this error is a broken invariant that must never be reachable
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Ledger(_) | Error::Journal(_))
    }
}

// Conversion from solana_client errors
impl From<solana_client::client_error::ClientError> for Error {
    fn from(e: solana_client::client_error::ClientError) -> Self {
        Error::Rpc(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let unauthorized = Error::Unauthorized {
            caller: Pubkey::new_unique(),
        };
        assert!(unauthorized.is_abort());
        assert!(!unauthorized.is_fatal());

        let reentrant = Error::Reentrant {
            operation: "withdraw",
            running: "execute",
        };
        assert!(reentrant.is_abort());
        assert_eq!(
            reentrant.to_string(),
            "Reentrant withdraw rejected: execute already in progress"
        );

        let underflow = Error::from(LedgerError::Underflow {
            balance: 1,
            amount: 2,
        });
        assert!(underflow.is_fatal());
        assert!(!underflow.is_abort());

        assert!(!Error::Config("bad".to_string()).is_abort());
        assert!(!Error::Config("bad".to_string()).is_fatal());
    }

    #[test]
    fn test_ledger_error_display() {
        let err = LedgerError::Overflow {
            balance: u64::MAX,
            amount: 1,
        };
        assert_eq!(
            err.to_string(),
            format!(
                "credit of 1 lamports overflows balance of {} lamports",
                u64::MAX
            )
        );
    }
}
