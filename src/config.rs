//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::path::Path;

use crate::wallet::relay::MAX_COMPUTE_UNIT_LIMIT;
use crate::wallet::types::ComputeUnits;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,
    pub custody: CustodyConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub cli: CliConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Who owns the wallet and where its funds and state live
#[derive(Debug, Clone, Deserialize)]
pub struct CustodyConfig {
    /// Owner address (base58)
    pub owner: String,

    /// Keypair of the account holding the custodial funds
    #[serde(default = "default_custody_keypair_path")]
    pub keypair_path: String,

    /// Wallet state snapshot
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Compute units granted to a relayed call when none is given
    #[serde(default = "default_budget")]
    pub default_budget: ComputeUnits,

    /// Largest budget accepted for a relayed call
    #[serde(default = "default_max_budget")]
    pub max_budget: ComputeUnits,

    /// Simulate each transaction and send it only if the simulation passes
    #[serde(default)]
    pub simulate_before_send: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_budget: default_budget(),
            max_budget: default_max_budget(),
            simulate_before_send: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Ask for confirmation before moving more than this many SOL
    #[serde(default = "default_confirm_above")]
    pub confirm_above_sol: f64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            confirm_above_sol: default_confirm_above(),
        }
    }
}

fn default_rpc_endpoint() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_custody_keypair_path() -> String {
    "credentials/custody/keypair.json".to_string()
}

fn default_state_path() -> String {
    "data/wallet.json".to_string()
}

fn default_budget() -> ComputeUnits {
    200_000
}

fn default_max_budget() -> ComputeUnits {
    MAX_COMPUTE_UNIT_LIMIT
}

fn default_confirm_above() -> f64 {
    1.0
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("rpc.endpoint", default_rpc_endpoint())?
            .set_default("rpc.timeout_ms", default_timeout_ms() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix HWALLET_)
            .add_source(
                config::Environment::with_prefix("HWALLET")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        self.owner()?;

        if self.execution.max_budget == 0 || self.execution.max_budget > MAX_COMPUTE_UNIT_LIMIT {
            anyhow::bail!(
                "max_budget must be between 1 and {} compute units",
                MAX_COMPUTE_UNIT_LIMIT
            );
        }

        if self.execution.default_budget == 0
            || self.execution.default_budget > self.execution.max_budget
        {
            anyhow::bail!(
                "default_budget must be between 1 and max_budget ({})",
                self.execution.max_budget
            );
        }

        if self.cli.confirm_above_sol < 0.0 {
            anyhow::bail!("confirm_above_sol cannot be negative");
        }


        Ok(())
    }

    /// Parsed owner address
    pub fn owner(&self) -> Result<Pubkey> {
        self.custody
            .owner
            .parse()
            .with_context(|| format!("Invalid owner address: {}", self.custody.owner))
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  RPC:
    endpoint: {}
    timeout: {}ms
  Custody:
    owner: {}
    keypair: {}
    state: {}
  Execution:
    default_budget: {} CU
    max_budget: {} CU
    simulate_before_send: {}
  CLI:
    confirm_above: {} SOL
"#,
            mask_url(&self.rpc.endpoint),
            self.rpc.timeout_ms,
            self.custody.owner,
            self.custody.keypair_path,
            self.custody.state_path,
            self.execution.default_budget,
            self.execution.max_budget,
            self.execution.simulate_before_send,
            self.cli.confirm_above_sol,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_config(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_with_defaults() {
        let owner = Pubkey::new_unique();
        let (_dir, path) = write_config(&format!("[custody]\nowner = \"{}\"\n", owner));

        let config = Config::load(&path).unwrap();
        assert_eq!(config.owner().unwrap(), owner);
        assert_eq!(config.rpc.timeout_ms, 30_000);
        assert_eq!(config.execution.default_budget, 200_000);
        assert_eq!(config.execution.max_budget, MAX_COMPUTE_UNIT_LIMIT);
        assert_eq!(config.custody.state_path, "data/wallet.json");
        assert!(!config.execution.simulate_before_send);
    }

    #[test]
    fn test_invalid_owner_rejected() {
        let (_dir, path) = write_config("[custody]\nowner = \"not-a-key\"\n");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_budget_bounds() {
        let owner = Pubkey::new_unique();
        let (_dir, path) = write_config(&format!(
            "[custody]\nowner = \"{}\"\n[execution]\ndefault_budget = 500000\nmax_budget = 100000\n",
            owner
        ));
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(
            mask_url("https://api.example.com"),
            "https://api.example.com"
        );
    }
}
