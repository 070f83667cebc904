//! CLI command implementations

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine;
use dialoguer::Confirm;
use solana_client::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::signer::Signer;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::wallet::credentials::{load_keypair, load_keypair_from_env};
use crate::wallet::receipts::verify_deposit;
use crate::wallet::transfer::{format_sol, lamports_to_sol, parse_sol};
use crate::wallet::{
    CorrelationId, EventRecord, ExecutionRequest, FeeClaimRequest, FeeQuote, ReceiptBook,
    RpcCallRelay, RpcSubmitter, RpcTransferExecutor, SubmitMode, WalletService, WalletStore,
    WithdrawRequest,
};

/// Environment variable naming the operator keypair
pub const OPERATOR_KEYPAIR_VAR: &str = "KEYPAIR_PATH";

/// A wallet opened against the configured RPC endpoint
struct Session {
    wallet: WalletService,
    receipts: ReceiptBook,
    store: WalletStore,
    submitter: Arc<RpcSubmitter>,
}

impl Session {
    async fn open(config: &Config, dry_run: bool) -> Result<Self> {
        let owner = config.owner()?;

        let rpc_client = Arc::new(RpcClient::new_with_timeout(
            config.rpc.endpoint.clone(),
            std::time::Duration::from_millis(config.rpc.timeout_ms),
        ));
        let custody = Arc::new(
            load_keypair(&config.custody.keypair_path).context("Failed to load custody keypair")?,
        );
        info!("Custody account: {}", custody.pubkey());

        let submitter = Arc::new(RpcSubmitter::new(
            rpc_client,
            custody,
            submit_mode(config, dry_run),
        ));

        let store = WalletStore::new(&config.custody.state_path);
        let (wallet, receipts) = store
            .open(
                owner,
                Box::new(RpcTransferExecutor::new(submitter.clone())),
                Box::new(RpcCallRelay::new(submitter.clone())),
            )
            .await?;

        Ok(Self {
            wallet,
            receipts,
            store,
            submitter,
        })
    }

    /// Save the wallet, unless nothing was actually sent
    async fn finish(&self) -> Result<()> {
        if self.submitter.mode().sends() {
            self.store
                .save_wallet(&self.wallet, &self.receipts)
                .await?;
        } else {
            println!("(dry run - wallet state not saved)");
        }
        Ok(())
    }
}

/// How transactions are submitted for this run
fn submit_mode(config: &Config, dry_run: bool) -> SubmitMode {
    if dry_run {
        SubmitMode::DryRun
    } else if config.execution.simulate_before_send {
        SubmitMode::SimulateThenSend
    } else {
        SubmitMode::Send
    }
}

/// Identity of whoever runs the CLI
fn operator() -> Result<Pubkey> {
    let keypair = load_keypair_from_env(OPERATOR_KEYPAIR_VAR)
        .context("Failed to load operator keypair")?;
    Ok(keypair.pubkey())
}

fn parse_address(label: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value)
        .map_err(|e| Error::InvalidAddress(format!("{} {}: {}", label, value, e)).into())
}

/// Ask before moving more than the configured threshold
fn confirm_outflow(config: &Config, action: &str, lamports: u64, force: bool) -> Result<bool> {
    if force || lamports_to_sol(lamports) <= config.cli.confirm_above_sol {
        return Ok(true);
    }

    let confirmed = Confirm::new()
        .with_prompt(format!(
            "{} {} SOL? This cannot be undone.",
            action,
            format_sol(lamports)
        ))
        .default(false)
        .interact()?;

    if !confirmed {
        info!("{} cancelled by user", action);
    }
    Ok(confirmed)
}

fn report(event: &EventRecord) {
    if event.is_success() {
        println!("\n=== {} ===", event.name().to_uppercase());
    } else {
        println!("\n=== NOT COMPLETED: {} ===", event.name());
    }
    println!("{}", event);
    println!("Amount: {} SOL", format_sol(event.value()));
}

/// Show owner, version and balances
pub async fn status(config: &Config) -> Result<()> {
    let session = Session::open(config, true).await?;
    let wallet = &session.wallet;

    println!("\n=== WALLET STATUS ===\n");
    println!("Version:  {}", wallet.version());
    println!("Owner:    {}", wallet.owner());
    println!("Custody:  {}", session.submitter.custody_address());
    println!("Ledger:   {} SOL", format_sol(wallet.balance()));

    match session
        .submitter
        .get_balance(&session.submitter.custody_address())
    {
        Ok(onchain) => {
            println!("On-chain: {} SOL", format_sol(onchain));
            if wallet.balance() > onchain {
                warn!(
                    "Ledger balance {} exceeds custody funds {} lamports",
                    wallet.balance(),
                    onchain
                );
                println!("WARNING: ledger exceeds custodial funds");
            }
        }
        Err(e) => println!("On-chain: unavailable ({})", e),
    }

    println!("Journal:  {} entries", wallet.journal().len());
    println!("Deposits: {} credited", session.receipts.len());
    println!();
    Ok(())
}

/// Credit a confirmed transfer into the custody account
pub async fn deposit(config: &Config, signature: &str) -> Result<()> {
    let signature = Signature::from_str(signature)
        .with_context(|| format!("Invalid transaction signature: {}", signature))?;

    let mut session = Session::open(config, false).await?;
    if session.receipts.contains(&signature) {
        return Err(Error::DuplicateDeposit(signature.to_string()).into());
    }

    let balances = session.submitter.fetch_balances(&signature)?;
    let receipt = verify_deposit(signature, &balances, &session.submitter.custody_address())?;
    info!(
        "Verified deposit of {} lamports from {} ({})",
        receipt.value, receipt.from, receipt.signature
    );

    session.receipts.insert(&receipt.signature)?;
    let event = session.wallet.receive(&receipt.from, receipt.value)?;
    report(&event);

    session.finish().await
}

/// Withdraw to an address
pub async fn withdraw(
    config: &Config,
    to: &str,
    amount: &str,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let to = parse_address("destination", to)?;
    let value = parse_sol(amount)?;
    let caller = operator()?;

    if !confirm_outflow(config, "Withdraw", value, force)? {
        return Ok(());
    }

    let session = Session::open(config, dry_run).await?;
    let event = session
        .wallet
        .withdraw(&caller, WithdrawRequest { to, value })?;
    report(&event);

    session.finish().await
}

/// Relay a call through the wallet
pub async fn execute(
    config: &Config,
    program: &str,
    amount: &str,
    budget: Option<u32>,
    data: &str,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let to = parse_address("program", program)?;
    let value = parse_sol(amount)?;
    let caller = operator()?;

    let budget = budget.unwrap_or(config.execution.default_budget);
    if budget == 0 || budget > config.execution.max_budget {
        anyhow::bail!(
            "Budget {} CU outside 1..={} CU",
            budget,
            config.execution.max_budget
        );
    }

    let data = base64::engine::general_purpose::STANDARD
        .decode(data)
        .context("Payload is not valid base64")?;

    if value > 0 && !confirm_outflow(config, "Send with call", value, force)? {
        return Ok(());
    }

    let session = Session::open(config, dry_run).await?;
    let event = session.wallet.execute(
        &caller,
        ExecutionRequest {
            to,
            value,
            budget,
            data,
        },
    )?;
    report(&event);

    session.finish().await
}

/// Settle a fee back to the owner
pub async fn claim_fees(
    config: &Config,
    txid: &str,
    amount: Option<&str>,
    units: Option<u64>,
    price: u64,
    dry_run: bool,
) -> Result<()> {
    let caller = operator()?;

    let value = match (amount, units) {
        (Some(sol), _) => parse_sol(sol)?,
        (None, Some(units)) => FeeQuote::new(units, price).total()?,
        (None, None) => anyhow::bail!("Give either --amount or --units"),
    };
    info!("Claiming {} lamports for {}", value, txid);

    let session = Session::open(config, dry_run).await?;
    let event = session.wallet.claim_fees(
        &caller,
        FeeClaimRequest {
            txid: CorrelationId::new(txid),
            value,
        },
    )?;
    report(&event);

    session.finish().await
}

/// View the journal
pub async fn history(config: &Config, limit: usize) -> Result<()> {
    println!("\n=== JOURNAL ===\n");

    let store = WalletStore::new(&config.custody.state_path);
    let Some(snapshot) = store.load().await? else {
        println!("No journal found.");
        return Ok(());
    };

    if snapshot.journal.is_empty() {
        println!("No journal entries.");
        return Ok(());
    }

    println!(
        "{:<6} {:<20} {:<26} {:<14} {}",
        "SEQ", "DATE", "EVENT", "AMOUNT", "PARTY"
    );
    println!("{}", "-".repeat(100));

    for entry in snapshot.journal.iter().rev().take(limit) {
        let party = match &entry.event {
            EventRecord::Deposit { from, .. } | EventRecord::NoMatchingFunction { from } => {
                from.to_string()
            }
            EventRecord::ClaimFee { txid, .. } | EventRecord::ExceededClaimFee { txid, .. } => {
                txid.to_string()
            }
            EventRecord::Withdraw { to, .. }
            | EventRecord::ExceededWithdraw { to, .. }
            | EventRecord::OutOfGasWithdraw { to, .. }
            | EventRecord::Execute { to, .. }
            | EventRecord::ExceededExecuteWithValue { to, .. }
            | EventRecord::FailedExecute { to, .. } => to.to_string(),
        };

        println!(
            "{:<6} {:<20} {:<26} {:<14} {}",
            entry.seq,
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            entry.event.name(),
            format_sol(entry.event.value()),
            party
        );
    }

    println!();
    Ok(())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliConfig, CustodyConfig, ExecutionConfig, RpcConfig};

    fn config(simulate_before_send: bool) -> Config {
        Config {
            rpc: RpcConfig::default(),
            custody: CustodyConfig {
                owner: Pubkey::new_unique().to_string(),
                keypair_path: "custody.json".to_string(),
                state_path: "wallet.json".to_string(),
            },
            execution: ExecutionConfig {
                simulate_before_send,
                ..ExecutionConfig::default()
            },
            cli: CliConfig::default(),
        }
    }

    #[test]
    fn test_simulate_before_send_still_sends_and_saves() {
        let mode = submit_mode(&config(true), false);
        assert_eq!(mode, SubmitMode::SimulateThenSend);
        assert!(mode.sends());

        assert_eq!(submit_mode(&config(false), false), SubmitMode::Send);
    }

    #[test]
    fn test_dry_run_never_saves() {
        for simulate_before_send in [false, true] {
            let mode = submit_mode(&config(simulate_before_send), true);
            assert_eq!(mode, SubmitMode::DryRun);
            assert!(!mode.sends());
        }
    }

    #[test]
    fn test_bad_address_is_reported() {
        let err = parse_address("destination", "not-a-key").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidAddress(_))
        ));
    }
}
