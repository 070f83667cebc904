//! Hosted wallet core
//!
//! A single owner, a custodial balance and an append-only journal, with
//! owner-only operations to withdraw, relay calls and claim fees, and an
//! open receive path for deposits.
//!
//! # Architecture
//!
//! ```text
//!                 WalletService
//!   ┌──────────────┬────┴─────┬──────────────┐
//! AccessGuard  BalanceLedger  EventLog   TransferExecutor / CallRelay
//!                                               ↑
//!                                        RpcSubmitter (custody keypair)
//! ```
//!
//! # Failure model
//!
//! - Unauthorized or reentrant owner calls abort: `Err`, nothing recorded.
//! - Infeasible requests complete: `Ok` with an `Exceeded*`, `OutOfGas*`,
//!   `Failed*` or `NoMatchingFunction` record and an untouched ledger.
//! - Ledger overflow/underflow and journal write failures are fatal.

pub mod credentials;
pub mod events;
pub mod fees;
pub mod guard;
pub mod ledger;
pub mod receipts;
pub mod relay;
pub mod rpc;
pub mod service;
pub mod store;
pub mod transfer;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use events::{EventLog, EventRecord, JournalEntry};
pub use fees::FeeQuote;
pub use guard::{AccessGuard, Authorization};
pub use ledger::BalanceLedger;
pub use receipts::{verify_deposit, DepositReceipt, ReceiptBook, TransactionBalances};
pub use relay::{CallRelay, RelayOutcome, RpcCallRelay};
pub use rpc::{RpcSubmitter, SubmitMode};
pub use service::WalletService;
pub use store::{WalletSnapshot, WalletStore};
pub use transfer::{Delivery, RpcTransferExecutor, TransferExecutor};
pub use types::{
    ComputeUnits, CorrelationId, ExecutionRequest, FeeClaimRequest, WithdrawRequest, VERSION,
};
