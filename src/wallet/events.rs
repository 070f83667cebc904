//! Append-only audit trail of operation outcomes
//!
//! Every completed call leaves exactly one record. Aborted calls leave none.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::types::CorrelationId;

/// Outcome record emitted by a wallet operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EventRecord {
    /// Incoming value credited to the ledger
    Deposit {
        #[serde(with = "pubkey_string")]
        from: Pubkey,
        value: u64,
    },

    /// Value delivered to `to` and debited
    Withdraw {
        #[serde(with = "pubkey_string")]
        to: Pubkey,
        value: u64,
    },

    /// Withdrawal larger than the balance
    ExceededWithdraw {
        #[serde(with = "pubkey_string")]
        to: Pubkey,
        value: u64,
    },

    /// Withdrawal covered by the balance but not delivered
    OutOfGasWithdraw {
        #[serde(with = "pubkey_string")]
        to: Pubkey,
        value: u64,
    },

    /// Relayed call completed
    Execute {
        #[serde(with = "pubkey_string")]
        to: Pubkey,
        value: u64,
    },

    /// Relayed call carried more value than the balance
    ExceededExecuteWithValue {
        #[serde(with = "pubkey_string")]
        to: Pubkey,
        value: u64,
    },

    /// Relayed call failed at the destination
    FailedExecute {
        #[serde(with = "pubkey_string")]
        to: Pubkey,
        value: u64,
    },

    /// Zero-value call that matched no operation
    NoMatchingFunction {
        #[serde(with = "pubkey_string")]
        from: Pubkey,
    },

    /// Fee paid to the owner and debited
    ClaimFee { txid: CorrelationId, value: u64 },

    /// Fee could not be paid: exceeded the balance or was not delivered
    ExceededClaimFee { txid: CorrelationId, value: u64 },
}

impl EventRecord {
    pub fn name(&self) -> &'static str {
        match self {
            EventRecord::Deposit { .. } => "Deposit",
            EventRecord::Withdraw { .. } => "Withdraw",
            EventRecord::ExceededWithdraw { .. } => "ExceededWithdraw",
            EventRecord::OutOfGasWithdraw { .. } => "OutOfGasWithdraw",
            EventRecord::Execute { .. } => "Execute",
            EventRecord::ExceededExecuteWithValue { .. } => "ExceededExecuteWithValue",
            EventRecord::FailedExecute { .. } => "FailedExecute",
            EventRecord::NoMatchingFunction { .. } => "NoMatchingFunction",
            EventRecord::ClaimFee { .. } => "ClaimFee",
            EventRecord::ExceededClaimFee { .. } => "ExceededClaimFee",
        }
    }

    /// Whether the requested effect took place
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            EventRecord::Deposit { .. }
                | EventRecord::Withdraw { .. }
                | EventRecord::Execute { .. }
                | EventRecord::ClaimFee { .. }
        )
    }

    /// Lamports named by the record (0 for `NoMatchingFunction`)
    pub fn value(&self) -> u64 {
        match self {
            EventRecord::Deposit { value, .. }
            | EventRecord::Withdraw { value, .. }
            | EventRecord::ExceededWithdraw { value, .. }
            | EventRecord::OutOfGasWithdraw { value, .. }
            | EventRecord::Execute { value, .. }
            | EventRecord::ExceededExecuteWithValue { value, .. }
            | EventRecord::FailedExecute { value, .. }
            | EventRecord::ClaimFee { value, .. }
            | EventRecord::ExceededClaimFee { value, .. } => *value,
            EventRecord::NoMatchingFunction { .. } => 0,
        }
    }
}

impl std::fmt::Display for EventRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventRecord::Deposit { from, value } => write!(f, "Deposit({}, {})", from, value),
            EventRecord::Withdraw { to, value }
            | EventRecord::ExceededWithdraw { to, value }
            | EventRecord::OutOfGasWithdraw { to, value }
            | EventRecord::Execute { to, value }
            | EventRecord::ExceededExecuteWithValue { to, value }
            | EventRecord::FailedExecute { to, value } => {
                write!(f, "{}({}, {})", self.name(), to, value)
            }
            EventRecord::NoMatchingFunction { from } => write!(f, "NoMatchingFunction({})", from),
            EventRecord::ClaimFee { txid, value }
            | EventRecord::ExceededClaimFee { txid, value } => {
                write!(f, "{}({}, {})", self.name(), txid, value)
            }
        }
    }
}

/// A recorded event with its position in the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the journal, contiguous from 0
    pub seq: u64,

    /// Identifier of the call that emitted the event
    pub call_id: Uuid,

    /// When the event was recorded
    pub recorded_at: DateTime<Utc>,

    pub event: EventRecord,
}

/// Ordered, append-only event journal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    entries: Vec<JournalEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a journal from stored entries, rejecting gaps or reordering
    pub fn from_entries(entries: Vec<JournalEntry>) -> Result<Self> {
        for (expected, entry) in entries.iter().enumerate() {
            if entry.seq != expected as u64 {
                return Err(Error::Persistence(format!(
                    "journal entry {} has sequence number {}",
                    expected, entry.seq
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Append an event emitted by call `call_id`
    pub fn record(&mut self, call_id: Uuid, event: EventRecord) -> Result<&JournalEntry> {
        let seq = u64::try_from(self.entries.len())
            .map_err(|_| Error::Journal("journal sequence exhausted".to_string()))?;

        self.entries.push(JournalEntry {
            seq,
            call_id,
            recorded_at: Utc::now(),
            event,
        });

        self.entries
            .last()
            .ok_or_else(|| Error::Journal("append did not land".to_string()))
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Most recent entries first
    pub fn latest(&self, limit: usize) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().rev().take(limit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialize public keys as base58 strings
pub(crate) mod pubkey_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_assigns_contiguous_sequence() {
        let mut log = EventLog::new();
        let from = Pubkey::new_unique();

        let first = log
            .record(Uuid::new_v4(), EventRecord::Deposit { from, value: 30 })
            .unwrap()
            .seq;
        let second = log
            .record(Uuid::new_v4(), EventRecord::NoMatchingFunction { from })
            .unwrap()
            .seq;

        assert_eq!((first, second), (0, 1));
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[1].event.name(), "NoMatchingFunction");
    }

    #[test]
    fn test_latest_is_newest_first() {
        let mut log = EventLog::new();
        let to = Pubkey::new_unique();
        for value in 1..=5 {
            log.record(Uuid::new_v4(), EventRecord::Withdraw { to, value })
                .unwrap();
        }

        let values: Vec<u64> = log.latest(3).map(|e| e.event.value()).collect();
        assert_eq!(values, vec![5, 4, 3]);
    }

    #[test]
    fn test_from_entries_rejects_gaps() {
        let mut log = EventLog::new();
        let to = Pubkey::new_unique();
        log.record(Uuid::new_v4(), EventRecord::Execute { to, value: 1 })
            .unwrap();
        log.record(Uuid::new_v4(), EventRecord::Execute { to, value: 2 })
            .unwrap();

        let mut entries = log.entries().to_vec();
        assert!(EventLog::from_entries(entries.clone()).is_ok());

        entries.remove(0);
        assert!(matches!(
            EventLog::from_entries(entries),
            Err(Error::Persistence(_))
        ));
    }

    #[test]
    fn test_event_json_shape() {
        let to = Pubkey::new_unique();
        let json = serde_json::to_value(EventRecord::ExceededWithdraw { to, value: 200 }).unwrap();

        assert_eq!(json["event"], "ExceededWithdraw");
        assert_eq!(json["to"], to.to_string());
        assert_eq!(json["value"], 200);

        let claim = EventRecord::ClaimFee {
            txid: CorrelationId::from("txid-7"),
            value: 5,
        };
        let json = serde_json::to_string(&claim).unwrap();
        let parsed: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, claim);
    }

    #[test]
    fn test_success_classification() {
        let to = Pubkey::new_unique();
        assert!(EventRecord::Withdraw { to, value: 1 }.is_success());
        assert!(!EventRecord::OutOfGasWithdraw { to, value: 1 }.is_success());
        assert!(!EventRecord::FailedExecute { to, value: 0 }.is_success());
        assert!(!EventRecord::ExceededClaimFee {
            txid: CorrelationId::from("x"),
            value: 1
        }
        .is_success());
    }

    #[test]
    fn test_display() {
        let txid = CorrelationId::from("txid-7");
        assert_eq!(
            EventRecord::ClaimFee { txid, value: 5 }.to_string(),
            "ClaimFee(txid-7, 5)"
        );
    }
}
