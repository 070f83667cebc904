//! Scripted in-memory ports for unit tests
//!
//! Clones share state, so a test keeps one handle and gives the wallet
//! another.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use solana_sdk::pubkey::Pubkey;

use super::relay::{CallRelay, RelayOutcome};
use super::transfer::{Delivery, TransferExecutor};
use super::types::ComputeUnits;

#[derive(Default)]
struct TransferScript {
    failures: VecDeque<String>,
    sent: Vec<(Pubkey, u64)>,
}

/// Delivers every transfer unless a failure was queued. An optional hook
/// runs while the transfer is in flight, before the outcome is returned.
#[derive(Clone, Default)]
pub struct ScriptedTransfers {
    script: Rc<RefCell<TransferScript>>,
    hook: Rc<RefCell<Option<Box<dyn Fn()>>>>,
}

impl ScriptedTransfers {
    pub fn fail_next(&self, reason: &str) {
        self.script
            .borrow_mut()
            .failures
            .push_back(reason.to_string());
    }

    pub fn on_send(&self, hook: impl Fn() + 'static) {
        *self.hook.borrow_mut() = Some(Box::new(hook));
    }

    /// Delivered transfers, in order
    pub fn sent(&self) -> Vec<(Pubkey, u64)> {
        self.script.borrow().sent.clone()
    }
}

impl TransferExecutor for ScriptedTransfers {
    fn send(&self, to: &Pubkey, amount: u64) -> Delivery {
        if let Some(hook) = self.hook.borrow().as_ref() {
            hook();
        }

        let mut script = self.script.borrow_mut();
        match script.failures.pop_front() {
            Some(reason) => Delivery::NotDelivered { reason },
            None => {
                script.sent.push((*to, amount));
                Delivery::Delivered
            }
        }
    }
}

/// A call seen by [`ScriptedRelay`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedCall {
    pub to: Pubkey,
    pub value: u64,
    pub budget: ComputeUnits,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct RelayScript {
    failures: VecDeque<String>,
    calls: Vec<RelayedCall>,
}

/// Completes every relay unless a failure was queued. An optional hook runs
/// while the call is "at the destination", before the outcome is returned.
#[derive(Clone, Default)]
pub struct ScriptedRelay {
    script: Rc<RefCell<RelayScript>>,
    hook: Rc<RefCell<Option<Box<dyn Fn()>>>>,
}

impl ScriptedRelay {
    pub fn fail_next(&self, reason: &str) {
        self.script
            .borrow_mut()
            .failures
            .push_back(reason.to_string());
    }

    pub fn on_relay(&self, hook: impl Fn() + 'static) {
        *self.hook.borrow_mut() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<RelayedCall> {
        self.script.borrow().calls.clone()
    }
}

impl CallRelay for ScriptedRelay {
    fn relay(&self, to: &Pubkey, amount: u64, budget: ComputeUnits, data: &[u8]) -> RelayOutcome {
        self.script.borrow_mut().calls.push(RelayedCall {
            to: *to,
            value: amount,
            budget,
            data: data.to_vec(),
        });

        if let Some(hook) = self.hook.borrow().as_ref() {
            hook();
        }

        match self.script.borrow_mut().failures.pop_front() {
            Some(reason) => RelayOutcome::Failed { reason },
            None => RelayOutcome::Completed,
        }
    }
}
