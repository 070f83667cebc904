//! Hosted Wallet Library
//!
//! Single-owner custodial wallet with an append-only event journal.

pub mod cli;
pub mod config;
pub mod error;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use wallet::{EventRecord, WalletService};
