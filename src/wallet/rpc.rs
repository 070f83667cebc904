//! Transaction submission over RPC
//!
//! Signs with the custody keypair and sends-and-confirms, optionally after a
//! pre-flight simulation. A dry-run submitter simulates only. Also reads back
//! confirmed transactions so deposits can be checked against the chain.

use std::str::FromStr;
use std::sync::Arc;

use solana_client::{rpc_client::RpcClient, rpc_config::RpcTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use solana_transaction_status::{option_serializer::OptionSerializer, UiTransactionEncoding};
use tracing::{debug, info, warn};

use super::receipts::TransactionBalances;
use crate::error::{Error, Result};

/// Simulation result
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Whether simulation succeeded
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Compute units consumed
    pub compute_units: Option<u64>,
}

/// What `submit` does with a signed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Send and confirm
    Send,
    /// Simulate, then send and confirm if the simulation passed
    SimulateThenSend,
    /// Simulate only; nothing reaches the chain
    DryRun,
}

impl SubmitMode {
    /// Whether submitted transactions actually land on chain
    pub fn sends(&self) -> bool {
        !matches!(self, SubmitMode::DryRun)
    }
}

/// How a submitted transaction ended
#[derive(Debug, Clone)]
pub enum Submission {
    /// Sent and confirmed
    Confirmed(Signature),
    /// Simulated successfully in dry-run mode, nothing sent
    Simulated(SimulationResult),
}

/// Signs and submits custody transactions
pub struct RpcSubmitter {
    rpc_client: Arc<RpcClient>,
    custody: Arc<Keypair>,
    mode: SubmitMode,
}

impl RpcSubmitter {
    pub fn new(rpc_client: Arc<RpcClient>, custody: Arc<Keypair>, mode: SubmitMode) -> Self {
        Self {
            rpc_client,
            custody,
            mode,
        }
    }

    /// Address holding the custodial funds
    pub fn custody_address(&self) -> Pubkey {
        self.custody.pubkey()
    }

    pub fn mode(&self) -> SubmitMode {
        self.mode
    }

    /// Get balance of an address in lamports
    pub fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        self.rpc_client
            .get_balance(address)
            .map_err(|e| Error::Rpc(format!("Failed to get balance: {}", e)))
    }

    /// Build, sign and submit a transaction paid for by the custody account
    pub fn submit(&self, instructions: &[Instruction]) -> Result<Submission> {
        let payer = self.custody.pubkey();

        let blockhash = self
            .rpc_client
            .get_latest_blockhash()
            .map_err(|e| Error::Rpc(format!("Failed to get blockhash: {}", e)))?;

        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&payer),
            &[self.custody.as_ref()],
            blockhash,
        );

        if self.mode != SubmitMode::Send {
            let result = self.simulate_transaction(&transaction)?;
            if !result.success {
                return Err(Error::Rpc(format!(
                    "Simulation error: {}",
                    result.error.unwrap_or_default()
                )));
            }
            if self.mode == SubmitMode::DryRun {
                return Ok(Submission::Simulated(result));
            }
        }

        let signature = self
            .rpc_client
            .send_and_confirm_transaction(&transaction)
            .map_err(|e| Error::Rpc(format!("Send failed: {}", e)))?;

        info!("Transaction confirmed (sig: {})", signature);
        Ok(Submission::Confirmed(signature))
    }

    fn simulate_transaction(&self, transaction: &Transaction) -> Result<SimulationResult> {
        debug!("Simulating transaction...");

        let result = self
            .rpc_client
            .simulate_transaction(transaction)
            .map_err(|e| Error::Rpc(format!("Simulation failed: {}", e)))?;

        let success = result.value.err.is_none();
        let error = result.value.err.map(|e| e.to_string());
        let logs = result.value.logs.unwrap_or_default();
        let compute_units = result.value.units_consumed;

        if success {
            debug!("Simulation succeeded, compute units: {:?}", compute_units);
        } else {
            warn!("Simulation failed: {:?}", error);
            for log in &logs {
                debug!("  Log: {}", log);
            }
        }

        Ok(SimulationResult {
            success,
            error,
            compute_units,
        })
    }

    /// Balance changes of a confirmed transaction
    pub fn fetch_balances(&self, signature: &Signature) -> Result<TransactionBalances> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };

        let confirmed = self
            .rpc_client
            .get_transaction_with_config(signature, config)
            .map_err(|e| Error::Rpc(format!("Failed to fetch transaction {}: {}", signature, e)))?;

        let meta = confirmed.transaction.meta.ok_or_else(|| {
            Error::Rpc(format!("Transaction {} has no status metadata", signature))
        })?;
        let transaction = confirmed.transaction.transaction.decode().ok_or_else(|| {
            Error::Deserialization(format!("Cannot decode transaction {}", signature))
        })?;

        // Index order: static keys, then loaded writable, then loaded readonly
        let mut account_keys = transaction.message.static_account_keys().to_vec();
        if let OptionSerializer::Some(loaded) = &meta.loaded_addresses {
            for key in loaded.writable.iter().chain(loaded.readonly.iter()) {
                let key = Pubkey::from_str(key)
                    .map_err(|e| Error::Deserialization(format!("{}: {}", key, e)))?;
                account_keys.push(key);
            }
        }

        Ok(TransactionBalances {
            account_keys,
            pre_balances: meta.pre_balances,
            post_balances: meta.post_balances,
            error: meta.err.map(|e| e.to_string()),
        })
    }
}
