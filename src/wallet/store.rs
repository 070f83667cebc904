//! Wallet state persistence
//!
//! Keeps the owner, balance, journal and credited deposit signatures in a
//! JSON snapshot between runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::events::{pubkey_string, EventLog, JournalEntry};
use super::ledger::BalanceLedger;
use super::receipts::ReceiptBook;
use super::relay::CallRelay;
use super::service::WalletService;
use super::transfer::TransferExecutor;
use super::types::VERSION;

/// Serialized wallet state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    /// Version of the wallet that wrote the snapshot
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(with = "pubkey_string")]
    pub owner: Pubkey,

    /// Balance in lamports
    pub balance: u64,

    /// Journal, oldest first
    #[serde(default)]
    pub journal: Vec<JournalEntry>,

    /// Deposit signatures already credited
    #[serde(default)]
    pub receipts: ReceiptBook,
}

fn default_version() -> String {
    VERSION.to_string()
}

impl WalletSnapshot {
    pub fn capture(wallet: &WalletService, receipts: &ReceiptBook) -> Self {
        Self {
            version: wallet.version().to_string(),
            owner: *wallet.owner(),
            balance: wallet.balance(),
            journal: wallet.journal().entries().to_vec(),
            receipts: receipts.clone(),
        }
    }
}

/// Loads and saves wallet snapshots at a fixed path
pub struct WalletStore {
    path: PathBuf,
}

impl WalletStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or `None` if none was saved yet
    pub async fn load(&self) -> Result<Option<WalletSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Persistence(e.to_string()))?;

        let snapshot: WalletSnapshot =
            serde_json::from_str(&data).map_err(|e| Error::Deserialization(e.to_string()))?;

        info!(
            "Loaded wallet state from {} ({} journal entries)",
            self.path.display(),
            snapshot.journal.len()
        );
        Ok(Some(snapshot))
    }

    /// Write the snapshot, replacing the previous one in a single rename
    pub async fn save(&self, snapshot: &WalletSnapshot) -> Result<()> {
        let data = serde_json::to_string_pretty(snapshot)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| Error::Persistence(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Persistence(e.to_string()))?;

        debug!(
            "Saved wallet state to {} (balance {})",
            self.path.display(),
            snapshot.balance
        );
        Ok(())
    }

    /// Restore the wallet for `owner`, or start an empty one
    pub async fn open(
        &self,
        owner: Pubkey,
        transfers: Box<dyn TransferExecutor>,
        relay: Box<dyn CallRelay>,
    ) -> Result<(WalletService, ReceiptBook)> {
        let Some(snapshot) = self.load().await? else {
            info!("No wallet state at {}, starting empty", self.path.display());
            return Ok((
                WalletService::new(owner, transfers, relay),
                ReceiptBook::default(),
            ));
        };

        if snapshot.owner != owner {
            return Err(Error::Config(format!(
                "Wallet state at {} belongs to {}, not configured owner {}",
                self.path.display(),
                snapshot.owner,
                owner
            )));
        }

        let journal = EventLog::from_entries(snapshot.journal)?;
        let wallet = WalletService::restore(
            owner,
            BalanceLedger::new(snapshot.balance),
            journal,
            transfers,
            relay,
        );
        Ok((wallet, snapshot.receipts))
    }

    pub async fn save_wallet(&self, wallet: &WalletService, receipts: &ReceiptBook) -> Result<()> {
        self.save(&WalletSnapshot::capture(wallet, receipts)).await
    }
}
