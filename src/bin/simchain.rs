#![forbid(unsafe_code)]
//! SimChain command line client

use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use simchain::api::{HttpLedgerClient, LedgerApi, VerifyBlockRequest};
use simchain::cli::{
    chain_table, format_hash, init_tracing, mempool_table, parse_key_assignment,
    parse_selection, verdict_table,
};
use simchain::config::{load_config, Config};
use simchain::mempool::{MempoolSelector, ToggleOutcome, MAX_SELECTION};
use simchain::mining::{meets_difficulty, MiningOutcome, MiningProgressCoordinator};
use simchain::wallet::{require_wallet, FileWalletStore, Wallet, WalletStore};
use simchain::{ChainError, TransactionSigner, TransactionVerifier};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "simchain", version, about = "Client for a SimChain proof-of-work ledger")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger base URL, overrides the config file
    #[arg(long, global = true)]
    ledger: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show or import the local wallet
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
    /// Balance of an address (defaults to the wallet address)
    Balance { address: Option<String> },
    /// List the chain
    Chain,
    /// List pending transactions
    Mempool {
        /// Keep refreshing until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// Sign and submit a transfer from the wallet
    Send {
        recipient: String,
        amount: f64,
        #[arg(long, default_value_t = 0.0)]
        fee: f64,
    },
    /// Verify the signatures of a block locally
    Verify {
        /// Block index as shown by `chain`
        block: u64,
        /// Sender public key per transaction, as IDX=HEX
        #[arg(long = "key")]
        keys: Vec<String>,
    },
    /// Ask the ledger to verify a block
    VerifyRemote { block: u64 },
    /// Select pending transactions, follow the proof-of-work and commit the block
    Mine {
        /// Comma separated mempool indices
        #[arg(long)]
        select: String,
        /// Commit straight away without following progress
        #[arg(long)]
        no_progress: bool,
    },
}

#[derive(Subcommand)]
enum WalletAction {
    Show,
    Import {
        #[arg(long)]
        address: String,
        #[arg(long)]
        public_key: String,
        #[arg(long)]
        private_key: String,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "❌".red(), e.to_string().red());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ChainError> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(url) = cli.ledger {
        config.ledger.base_url = url;
        config.validate()?;
    }
    let api: Arc<dyn LedgerApi> = Arc::new(HttpLedgerClient::from_config(&config.ledger)?);
    let store = FileWalletStore::new(config.wallet.path.clone());

    match cli.command {
        Command::Wallet { action } => wallet(&store, action),
        Command::Balance { address } => {
            let address = match address {
                Some(address) => address,
                None => require_wallet(&store)?.address,
            };
            let balance = api.balance(&address).await?;
            println!("💰 {}: {}", format_hash(&address).cyan(), balance.to_string().bold());
            Ok(())
        }
        Command::Chain => {
            let chain = api.chain().await?;
            println!("{}", chain_table(&chain));
            Ok(())
        }
        Command::Mempool { watch } => {
            let selector = Arc::new(MempoolSelector::new());
            selector.refresh(api.as_ref()).await?;
            print_mempool(&selector);
            if watch {
                watch_mempool(&config, api, selector).await;
            }
            Ok(())
        }
        Command::Send {
            recipient,
            amount,
            fee,
        } => {
            let wallet = require_wallet(&store)?;
            let tx = TransactionSigner::new().sign_transfer(&wallet, &recipient, amount, fee)?;
            let echo = api.submit_transaction(&tx).await?;
            println!("{} transaction submitted", "✅".green());
            if let Some(message) = echo.get("message").and_then(|m| m.as_str()) {
                println!("   {}", message);
            }
            println!("   signature: {}", format_hash(&tx.signature).dimmed());
            Ok(())
        }
        Command::Verify { block, keys } => verify_local(api.as_ref(), block, &keys).await,
        Command::VerifyRemote { block } => {
            let message = api.verify_block(&VerifyBlockRequest::block(block)).await?;
            println!("🔍 {}", message);
            Ok(())
        }
        Command::Mine {
            select,
            no_progress,
        } => mine(&config, api, &store, &select, no_progress).await,
    }
}

fn print_mempool(selector: &MempoolSelector) {
    println!("⛏️  Block reward: {}", selector.base_reward().to_string().yellow());
    println!("{}", mempool_table(selector));
}

async fn watch_mempool(config: &Config, api: Arc<dyn LedgerApi>, selector: Arc<MempoolSelector>) {
    let period = config.mempool.refresh_interval();
    let refresher = selector.clone().spawn_refresh_loop(api, period);
    let mut ticker = tokio::time::interval(period);
    // First tick completes immediately
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => print_mempool(&selector),
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    refresher.abort();
}

fn wallet(store: &dyn WalletStore, action: WalletAction) -> Result<(), ChainError> {
    match action {
        WalletAction::Show => {
            let wallet = require_wallet(store)?;
            println!("📍 Address:     {}", wallet.address.cyan());
            println!("🔑 Public key:  {}", Wallet::truncated(&wallet.public_key));
            println!("🔒 Private key: {}", Wallet::truncated(&wallet.private_key).dimmed());
        }
        WalletAction::Import {
            address,
            public_key,
            private_key,
        } => {
            // Fail early on a key that could never sign
            simchain::crypto::secret_key_from_hex(&private_key)?;
            store.set(Wallet::new(address, public_key, private_key))?;
            println!("{} wallet saved", "✅".green());
        }
    }
    Ok(())
}

async fn verify_local(api: &dyn LedgerApi, index: u64, keys: &[String]) -> Result<(), ChainError> {
    let chain = api.chain().await?;
    let block = chain
        .iter()
        .find(|b| b.index == index)
        .ok_or_else(|| ChainError::Validation(format!("block {} not found", index)))?;

    let keys: HashMap<usize, String> = keys
        .iter()
        .map(|k| parse_key_assignment(k))
        .collect::<Result<_, _>>()?;

    let verdicts = TransactionVerifier::new().verify_block(block, &keys);
    println!("{}", verdict_table(block, &verdicts));
    let valid = verdicts.iter().filter(|v| v.outcome.valid).count();
    println!("{}/{} transactions valid", valid, verdicts.len());
    Ok(())
}

async fn mine(
    config: &Config,
    api: Arc<dyn LedgerApi>,
    store: &dyn WalletStore,
    select: &str,
    no_progress: bool,
) -> Result<(), ChainError> {
    let wallet = require_wallet(store)?;
    let selector = MempoolSelector::new();
    selector.refresh(api.as_ref()).await?;

    for index in parse_selection(select)? {
        if selector.toggle(index) == ToggleOutcome::Ignored {
            println!(
                "{} ignoring index {} (unknown, or {} already selected)",
                "⚠️".yellow(),
                index,
                MAX_SELECTION
            );
        }
    }
    println!("{}", mempool_table(&selector));
    println!("💎 Expected reward: {}", selector.expected_reward().to_string().yellow().bold());

    if !no_progress {
        let coordinator = MiningProgressCoordinator::from_config(&config.mining);
        let cancel = coordinator.cancel_handle();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} nonce {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        let mut updates = coordinator.subscribe();
        let spinner_task = {
            let spinner = spinner.clone();
            tokio::spawn(async move {
                while updates.changed().await.is_ok() {
                    let latest = updates.borrow_and_update().clone();
                    if let Some(p) = latest {
                        spinner.set_message(format!("{} hash {}", p.nonce, format_hash(&p.hash)));
                    }
                }
            })
        };

        let outcome = coordinator
            .start(api.as_ref(), &wallet.address, &selector.selected_transactions())
            .await;
        spinner_task.abort();
        ctrl_c.abort();
        spinner.finish_and_clear();

        match outcome? {
            MiningOutcome::Found { nonce, hash } => {
                println!("{} nonce {} hash {}", "✅ Found".green().bold(), nonce, hash);
                if meets_difficulty(&hash, coordinator.difficulty()) {
                    println!(
                        "   meets difficulty ({} leading zeros)",
                        coordinator.difficulty()
                    );
                }
            }
            MiningOutcome::Cancelled => {
                println!("{}", "⏹  Mining cancelled".yellow());
                return Ok(());
            }
            MiningOutcome::AlreadyRunning => return Ok(()),
        }
    }

    let outcome = selector.mine(api.as_ref(), &wallet.address).await?;
    println!(
        "{} block #{} committed with {} transactions",
        "⛓️".cyan(),
        outcome.block.index,
        outcome.block.transactions.len()
    );
    if let Some(chain) = outcome.chain {
        println!("   chain height: {}", chain.len());
    }
    Ok(())
}
