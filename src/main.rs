//! Hosted Wallet - single-owner custodial wallet CLI
//!
//! # WARNING
//! - Withdrawals and relayed calls move real funds out of custody.
//! - Relayed calls run arbitrary programs with the custody account as signer.
//! - Use `--dry-run` to simulate without sending or saving state.
//! - Amounts are decimal SOL, exact to the lamport.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use hosted_wallet::cli::commands;
use hosted_wallet::config::Config;

/// Hosted Wallet - single-owner custodial wallet
#[derive(Parser)]
#[command(name = "hwallet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show owner, version, ledger and on-chain balances
    Status,

    /// Credit a confirmed transfer into the custody account
    Deposit {
        /// Signature of the transaction that paid into custody
        signature: String,
    },

    /// Withdraw SOL to an address
    Withdraw {
        /// Destination address
        to: String,

        /// Amount in SOL
        amount: String,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,

        /// Simulate only, don't execute
        #[arg(long)]
        dry_run: bool,
    },

    /// Relay a call, optionally carrying SOL, through the wallet
    Execute {
        /// Program address
        program: String,

        /// SOL sent with the call
        #[arg(long, default_value = "0")]
        amount: String,

        /// Compute unit budget (default from config)
        #[arg(long)]
        budget: Option<u32>,

        /// Instruction data, base64
        #[arg(long, default_value = "")]
        data: String,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,

        /// Simulate only, don't execute
        #[arg(long)]
        dry_run: bool,
    },

    /// Pay a transaction fee back to the owner
    ClaimFees {
        /// Transaction the fee was incurred by
        txid: String,

        /// Fee in SOL
        #[arg(long, conflicts_with = "units")]
        amount: Option<String>,

        /// Compute units the transaction consumed
        #[arg(long)]
        units: Option<u64>,

        /// Priority price in micro-lamports per compute unit
        #[arg(long, default_value = "0")]
        price: u64,

        /// Simulate only, don't execute
        #[arg(long)]
        dry_run: bool,
    },

    /// View the journal
    History {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hosted_wallet=info".parse()?),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = startup_checks(&config) {
        error!("Startup checks failed: {:#}", e);
        std::process::exit(1);
    }

    // Execute command
    let result = match cli.command {
        Commands::Status => commands::status(&config).await,
        Commands::Deposit { signature } => commands::deposit(&config, &signature).await,
        Commands::Withdraw {
            to,
            amount,
            force,
            dry_run,
        } => commands::withdraw(&config, &to, &amount, force, dry_run).await,
        Commands::Execute {
            program,
            amount,
            budget,
            data,
            force,
            dry_run,
        } => commands::execute(&config, &program, &amount, budget, &data, force, dry_run).await,
        Commands::ClaimFees {
            txid,
            amount,
            units,
            price,
            dry_run,
        } => {
            commands::claim_fees(&config, &txid, amount.as_deref(), units, price, dry_run).await
        }
        Commands::History { limit } => commands::history(&config, limit).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Perform startup safety checks
fn startup_checks(config: &Config) -> Result<()> {
    info!("Performing startup checks...");

    let custody_path = std::path::Path::new(&config.custody.keypair_path);
    if !custody_path.exists() {
        warn!(
            "Custody keypair not found at {} - only `config` and `history` will work",
            custody_path.display()
        );
    }

    if let Some(parent) = std::path::Path::new(&config.custody.state_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            info!("Created state directory {}", parent.display());
        }
    }

    if std::env::var(commands::OPERATOR_KEYPAIR_VAR).is_err() {
        warn!(
            "{} not set - owner operations will be refused",
            commands::OPERATOR_KEYPAIR_VAR
        );
    }

    info!("Startup checks passed");
    Ok(())
}
