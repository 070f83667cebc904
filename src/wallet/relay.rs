//! Relaying value and payload through external programs
//!
//! Value and payload travel in one transaction, so the destination either
//! receives both or neither. The compute budget bounds what the destination
//! may consume; running out is a `Failed` relay, not a wallet crash.

use std::sync::Arc;

use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_instruction,
};
use tracing::{debug, warn};

use super::rpc::{RpcSubmitter, Submission};
use super::types::ComputeUnits;

/// Highest compute-unit limit a transaction may request
pub const MAX_COMPUTE_UNIT_LIMIT: ComputeUnits = 1_400_000;

/// Outcome of a relayed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Completed,
    Failed { reason: String },
}

/// Forwards a payload, and optionally value, to a destination as one
/// atomic call-out.
pub trait CallRelay {
    fn relay(&self, to: &Pubkey, amount: u64, budget: ComputeUnits, data: &[u8]) -> RelayOutcome;
}

/// Relays through a single custody-signed transaction
pub struct RpcCallRelay {
    submitter: Arc<RpcSubmitter>,
}

impl RpcCallRelay {
    pub fn new(submitter: Arc<RpcSubmitter>) -> Self {
        Self { submitter }
    }
}

/// Instructions for one relayed call: budget, optional value, then the call
pub fn build_relay_instructions(
    custody: &Pubkey,
    to: &Pubkey,
    amount: u64,
    budget: ComputeUnits,
    data: &[u8],
) -> Vec<Instruction> {
    let mut instructions = Vec::with_capacity(3);
    instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(budget));

    if amount > 0 {
        instructions.push(system_instruction::transfer(custody, to, amount));
    }

    instructions.push(Instruction {
        program_id: *to,
        accounts: vec![AccountMeta::new(*custody, true)],
        data: data.to_vec(),
    });

    instructions
}

impl CallRelay for RpcCallRelay {
    fn relay(&self, to: &Pubkey, amount: u64, budget: ComputeUnits, data: &[u8]) -> RelayOutcome {
        if budget == 0 || budget > MAX_COMPUTE_UNIT_LIMIT {
            warn!(
                "Relay to {} rejected: budget {} outside 1..={}",
                to, budget, MAX_COMPUTE_UNIT_LIMIT
            );
            return RelayOutcome::Failed {
                reason: format!("compute budget {} out of range", budget),
            };
        }

        let custody = self.submitter.custody_address();
        debug!(
            "Relaying {} bytes and {} lamports to {} (budget {} CU)",
            data.len(),
            amount,
            to,
            budget
        );

        let instructions = build_relay_instructions(&custody, to, amount, budget, data);

        match self.submitter.submit(&instructions) {
            Ok(Submission::Confirmed(signature)) => {
                debug!("Relay to {} confirmed (sig: {})", to, signature);
                RelayOutcome::Completed
            }
            Ok(Submission::Simulated(result)) => {
                debug!(
                    "Relay to {} simulated, compute units: {:?}",
                    to, result.compute_units
                );
                RelayOutcome::Completed
            }
            Err(e) => {
                warn!("Relay to {} failed: {}", to, e);
                RelayOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
