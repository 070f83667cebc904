//! Owner check, the sole authorization primitive

use solana_sdk::pubkey::Pubkey;
use tracing::debug;

/// Result of comparing a caller against the owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Authorized,
    Unauthorized,
}

/// Compares caller identities against the immutable owner
#[derive(Debug, Clone)]
pub struct AccessGuard {
    owner: Pubkey,
}

impl AccessGuard {
    pub fn new(owner: Pubkey) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &Pubkey {
        &self.owner
    }

    /// Pure comparison; no state change either way
    pub fn authorize(&self, caller: &Pubkey) -> Authorization {
        if *caller == self.owner {
            Authorization::Authorized
        } else {
            debug!("Caller {} is not owner {}", caller, self.owner);
            Authorization::Unauthorized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_is_authorized() {
        let owner = Pubkey::new_unique();
        let guard = AccessGuard::new(owner);
        assert_eq!(guard.authorize(&owner), Authorization::Authorized);
        assert_eq!(guard.owner(), &owner);
    }

    #[test]
    fn test_stranger_is_unauthorized() {
        let guard = AccessGuard::new(Pubkey::new_unique());
        assert_eq!(
            guard.authorize(&Pubkey::new_unique()),
            Authorization::Unauthorized
        );
        assert_eq!(
            guard.authorize(&Pubkey::default()),
            Authorization::Unauthorized
        );
    }
}
