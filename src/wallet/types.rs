//! Core request types for wallet operations
//!
//! Requests are transient value objects: built per call, consumed by the
//! call, never persisted.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Informational version string exposed by every wallet instance
pub const VERSION: &str = concat!("hosted-wallet/", env!("CARGO_PKG_VERSION"));

/// Resource budget for a relayed call, in compute units
pub type ComputeUnits = u32;

/// Outbound value transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawRequest {
    /// Destination address
    pub to: Pubkey,

    /// Amount in lamports
    pub value: u64,
}

/// Relay of value and payload through an external execution target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Program or account receiving the call
    pub to: Pubkey,

    /// Lamports carried with the call (0 for a pure call)
    pub value: u64,

    /// Compute units the destination may consume
    pub budget: ComputeUnits,

    /// Opaque instruction data
    pub data: Vec<u8>,
}

/// Settlement of a previously incurred transaction fee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeClaimRequest {
    /// Transaction the fee was incurred by
    pub txid: CorrelationId,

    /// Fee in lamports
    pub value: u64,
}

/// Opaque audit key linking a fee claim to an earlier transaction.
///
/// Never validated or deduplicated here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<solana_sdk::signature::Signature> for CorrelationId {
    fn from(signature: solana_sdk::signature::Signature) -> Self {
        Self(signature.to_string())
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
