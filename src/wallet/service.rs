//! Hosted wallet service
//!
//! Composes the guard, ledger, ports and journal into the public operations.
//! Every owner operation has the same shape:
//!
//! ```text
//! authorize ──✗──> abort (Err, nothing recorded)
//!     │
//! bound-check ──✗──> Exceeded* record, Ok
//!     │
//! act (transfer / relay) ──✗──> OutOfGas* / Failed* record, Ok
//!     │
//! commit: debit + success record, Ok
//! ```
//!
//! Calls are serialized by the host, so state lives in plain cells. The only
//! nesting possible is a destination calling back in while a transfer or
//! relay is in flight; owner operations are refused then, receipts are not.

use std::cell::{Cell, Ref, RefCell};

use solana_sdk::pubkey::Pubkey;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::events::{EventLog, EventRecord};
use super::guard::{AccessGuard, Authorization};
use super::ledger::BalanceLedger;
use super::relay::{CallRelay, RelayOutcome};
use super::transfer::{Delivery, TransferExecutor};
use super::types::{ExecutionRequest, FeeClaimRequest, WithdrawRequest, VERSION};

/// Ledger change applied together with a record
#[derive(Debug, Clone, Copy)]
enum Settlement {
    Unchanged,
    Debit(u64),
    Credit(u64),
}

/// An owner operation in progress. Releases the in-progress flag on drop.
struct CallScope<'a> {
    in_progress: &'a Cell<Option<&'static str>>,
    call_id: Uuid,
}

impl Drop for CallScope<'_> {
    fn drop(&mut self) {
        self.in_progress.set(None);
    }
}

/// Single-owner custodial wallet
pub struct WalletService {
    guard: AccessGuard,
    ledger: RefCell<BalanceLedger>,
    journal: RefCell<EventLog>,
    transfers: Box<dyn TransferExecutor>,
    relay: Box<dyn CallRelay>,
    in_progress: Cell<Option<&'static str>>,
}

impl WalletService {
    /// Create an empty wallet owned by `owner`
    pub fn new(
        owner: Pubkey,
        transfers: Box<dyn TransferExecutor>,
        relay: Box<dyn CallRelay>,
    ) -> Self {
        Self::restore(owner, BalanceLedger::default(), EventLog::new(), transfers, relay)
    }

    /// Rebuild a wallet from a stored ledger and journal
    pub fn restore(
        owner: Pubkey,
        ledger: BalanceLedger,
        journal: EventLog,
        transfers: Box<dyn TransferExecutor>,
        relay: Box<dyn CallRelay>,
    ) -> Self {
        Self {
            guard: AccessGuard::new(owner),
            ledger: RefCell::new(ledger),
            journal: RefCell::new(journal),
            transfers,
            relay,
            in_progress: Cell::new(None),
        }
    }

    pub fn owner(&self) -> &Pubkey {
        self.guard.owner()
    }

    pub fn version(&self) -> &'static str {
        VERSION
    }

    /// Current custodial balance in lamports
    pub fn balance(&self) -> u64 {
        self.ledger.borrow().available()
    }

    pub fn ledger(&self) -> BalanceLedger {
        *self.ledger.borrow()
    }

    pub fn journal(&self) -> Ref<'_, EventLog> {
        self.journal.borrow()
    }

    /// Send `value` lamports from custody to `to`
    pub fn withdraw(&self, caller: &Pubkey, request: WithdrawRequest) -> Result<EventRecord> {
        let scope = self.enter(caller, "withdraw")?;
        let WithdrawRequest { to, value } = request;

        if !self.ledger.borrow().covers(value) {
            warn!(
                "Withdraw of {} lamports to {} exceeds balance {}",
                value,
                to,
                self.balance()
            );
            return self.commit(
                &scope,
                Settlement::Unchanged,
                EventRecord::ExceededWithdraw { to, value },
            );
        }

        match self.transfers.send(&to, value) {
            Delivery::Delivered => {
                info!("Withdrew {} lamports to {}", value, to);
                self.commit(
                    &scope,
                    Settlement::Debit(value),
                    EventRecord::Withdraw { to, value },
                )
            }
            Delivery::NotDelivered { reason } => {
                warn!("Withdraw to {} not delivered: {}", to, reason);
                self.commit(
                    &scope,
                    Settlement::Unchanged,
                    EventRecord::OutOfGasWithdraw { to, value },
                )
            }
        }
    }

    /// Relay `data`, and `value` lamports when non-zero, to `to`
    pub fn execute(&self, caller: &Pubkey, request: ExecutionRequest) -> Result<EventRecord> {
        let scope = self.enter(caller, "execute")?;
        let ExecutionRequest {
            to,
            value,
            budget,
            data,
        } = request;

        if !self.ledger.borrow().covers(value) {
            warn!(
                "Execute on {} carrying {} lamports exceeds balance {}",
                to,
                value,
                self.balance()
            );
            return self.commit(
                &scope,
                Settlement::Unchanged,
                EventRecord::ExceededExecuteWithValue { to, value },
            );
        }

        debug!(
            "Relaying {} bytes to {} with {} lamports, budget {} CU",
            data.len(),
            to,
            value,
            budget
        );

        match self.relay.relay(&to, value, budget, &data) {
            RelayOutcome::Completed => {
                info!("Executed call on {} with {} lamports", to, value);
                let settlement = if value > 0 {
                    Settlement::Debit(value)
                } else {
                    Settlement::Unchanged
                };
                self.commit(&scope, settlement, EventRecord::Execute { to, value })
            }
            RelayOutcome::Failed { reason } => {
                warn!("Execute on {} failed: {}", to, reason);
                self.commit(
                    &scope,
                    Settlement::Unchanged,
                    EventRecord::FailedExecute { to, value },
                )
            }
        }
    }

    /// Pay a previously incurred fee back to the owner
    pub fn claim_fees(&self, caller: &Pubkey, request: FeeClaimRequest) -> Result<EventRecord> {
        let scope = self.enter(caller, "claim_fees")?;
        let FeeClaimRequest { txid, value } = request;

        if !self.ledger.borrow().covers(value) {
            warn!(
                "Fee claim {} of {} lamports exceeds balance {}",
                txid,
                value,
                self.balance()
            );
            return self.commit(
                &scope,
                Settlement::Unchanged,
                EventRecord::ExceededClaimFee { txid, value },
            );
        }

        let owner = *self.guard.owner();
        match self.transfers.send(&owner, value) {
            Delivery::Delivered => {
                info!("Claimed {} lamports in fees for {}", value, txid);
                self.commit(
                    &scope,
                    Settlement::Debit(value),
                    EventRecord::ClaimFee { txid, value },
                )
            }
            Delivery::NotDelivered { reason } => {
                warn!("Fee claim {} not delivered: {}", txid, reason);
                self.commit(
                    &scope,
                    Settlement::Unchanged,
                    EventRecord::ExceededClaimFee { txid, value },
                )
            }
        }
    }

    /// Incoming value or unrecognized call. Open to anyone.
    pub fn receive(&self, sender: &Pubkey, value: u64) -> Result<EventRecord> {
        let call_id = Uuid::new_v4();

        if value == 0 {
            debug!("Zero-value call from {} matched nothing", sender);
            return self.apply(
                call_id,
                Settlement::Unchanged,
                EventRecord::NoMatchingFunction { from: *sender },
            );
        }

        info!("Deposit of {} lamports from {}", value, sender);
        self.apply(
            call_id,
            Settlement::Credit(value),
            EventRecord::Deposit {
                from: *sender,
                value,
            },
        )
    }

    /// Authorize the caller and claim the in-progress flag
    fn enter(&self, caller: &Pubkey, operation: &'static str) -> Result<CallScope<'_>> {
        if self.guard.authorize(caller) == Authorization::Unauthorized {
            error!("Unauthorized {} attempt by {}", operation, caller);
            return Err(Error::Unauthorized { caller: *caller });
        }

        if let Some(running) = self.in_progress.get() {
            error!(
                "Reentrant {} rejected while {} is in progress",
                operation, running
            );
            return Err(Error::Reentrant { operation, running });
        }

        self.in_progress.set(Some(operation));
        Ok(CallScope {
            in_progress: &self.in_progress,
            call_id: Uuid::new_v4(),
        })
    }

    fn commit(
        &self,
        scope: &CallScope<'_>,
        settlement: Settlement,
        event: EventRecord,
    ) -> Result<EventRecord> {
        self.apply(scope.call_id, settlement, event)
    }

    /// Apply the ledger change and the record together, or neither
    fn apply(
        &self,
        call_id: Uuid,
        settlement: Settlement,
        event: EventRecord,
    ) -> Result<EventRecord> {
        let mut ledger = self.ledger.borrow_mut();
        let mut journal = self.journal.borrow_mut();

        let preview = match settlement {
            Settlement::Unchanged => Ok(ledger.available()),
            Settlement::Debit(amount) => ledger.preview_debit(amount),
            Settlement::Credit(amount) => ledger.preview_credit(amount),
        };
        if let Err(e) = preview {
            error!("Refusing to record {}: {}", event, e);
            return Err(Error::Ledger(e));
        }

        journal.record(call_id, event.clone())?;

        // Cannot fail: the preview ran against the same, still borrowed, ledger.
        let balance = match settlement {
            Settlement::Unchanged => ledger.available(),
            Settlement::Debit(amount) => ledger.debit(amount)?,
            Settlement::Credit(amount) => ledger.credit(amount)?,
        };

        debug!("Recorded {} (balance {})", event, balance);
        Ok(event)
    }
}
