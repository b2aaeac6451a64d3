use std::{sync::Arc, time::Duration};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use dsc_client::{
    account_cache::{AccountStateCache, StatusStage},
    blockchain_manager::{BlockchainManager, ContractBindings},
    config::LocalConfig,
    utils,
    wallet::{LocalWalletConnector, WalletConnector},
};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

const USAGE: &str = "usage: dsc_client <command>

commands:
  status                                   show the connected account
  deposit <amount>                         deposit collateral
  deposit-mint <collateral> <dsc>          deposit collateral and mint DSC
  mint <amount>                            mint DSC
  burn <amount>                            burn DSC
  redeem <amount>                          redeem collateral
  redeem-for-dsc <collateral> <dsc>        burn DSC and redeem collateral
  liquidate <user> <debt> [token]          cover <debt> DSC of an unhealthy position
  wrap <amount>                            native currency -> collateral token
  unwrap <amount>                          collateral token -> native currency
  check <address>                          show the engine's view of any account
  preview <debt> [token]                   collateral received for covering <debt>
  watch                                    follow the account until ctrl-c";

enum Command {
    Status,
    Deposit(String),
    DepositMint(String, String),
    Mint(String),
    Burn(String),
    Redeem(String),
    RedeemForDsc(String, String),
    Liquidate {
        user: Address,
        debt: String,
        token: Option<Address>,
    },
    Wrap(String),
    Unwrap(String),
    Check(Address),
    Preview {
        debt: String,
        token: Option<Address>,
    },
    Watch,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let arg = |index: usize| -> Result<String> {
            args.get(index)
                .cloned()
                .with_context(|| format!("Missing argument\n\n{}", USAGE))
        };
        let address = |index: usize| -> Result<Address> {
            arg(index)?
                .parse::<Address>()
                .with_context(|| format!("Invalid address '{}'", args[index]))
        };
        let optional_address = |index: usize| -> Result<Option<Address>> {
            match args.get(index) {
                Some(_) => address(index).map(Some),
                None => Ok(None),
            }
        };

        let command = match args.first().map(String::as_str) {
            Some("status") | None => Self::Status,
            Some("deposit") => Self::Deposit(arg(1)?),
            Some("deposit-mint") => Self::DepositMint(arg(1)?, arg(2)?),
            Some("mint") => Self::Mint(arg(1)?),
            Some("burn") => Self::Burn(arg(1)?),
            Some("redeem") => Self::Redeem(arg(1)?),
            Some("redeem-for-dsc") => Self::RedeemForDsc(arg(1)?, arg(2)?),
            Some("liquidate") => Self::Liquidate {
                user: address(1)?,
                debt: arg(2)?,
                token: optional_address(3)?,
            },
            Some("wrap") => Self::Wrap(arg(1)?),
            Some("unwrap") => Self::Unwrap(arg(1)?),
            Some("check") => Self::Check(address(1)?),
            Some("preview") => Self::Preview {
                debt: arg(1)?,
                token: optional_address(2)?,
            },
            Some("watch") => Self::Watch,
            Some(other) => anyhow::bail!("Unknown command '{}'\n\n{}", other, USAGE),
        };

        Ok(command)
    }

    fn needs_wallet(&self) -> bool {
        !matches!(self, Self::Check(_) | Self::Preview { .. })
    }
}

/// Command-line client for a DSC deployment
///
/// 1. Loads the configuration and sets up the logger
/// 2. Builds the wallet and the contract bindings
/// 3. Connects and runs the requested command
#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let local_config = init_pre_run()?;

    let args = std::env::args().skip(1).collect::<Vec<String>>();
    let command = Command::parse(&args)?;

    let connector = if local_config.has_wallet() {
        Some(Arc::new(LocalWalletConnector::new(
            &local_config.wallet_private_keys,
            local_config.chain_id,
        )?))
    } else {
        warn!("WALLET_PRIVATE_KEYS is empty, running read-only");
        None
    };

    let bindings = build_bindings(&local_config, connector.as_deref()).await?;
    let cache = AccountStateCache::create(
        connector.map(|connector| connector as Arc<dyn WalletConnector>),
        bindings,
    );

    spawn_status_logger(&cache);

    execute(&cache, command, &local_config).await
}

/// Initializes the pre-run environment
///
/// Loads the optional `.env` file, reads `LocalConfig` and sets up the logger.
fn init_pre_run() -> Result<LocalConfig> {
    // A missing .env is fine, the variables may come from the environment
    dotenvy::dotenv().ok();

    let local_config = LocalConfig::load_from_env()?;
    utils::logger::setup_logger(local_config.log_inside_file, &local_config.log_directory)
        .context("Failed to setup logger")?;

    info!("Loaded configuration: {:?}", local_config);
    Ok(local_config)
}

async fn build_bindings(
    local_config: &LocalConfig,
    connector: Option<&LocalWalletConnector>,
) -> Result<Arc<dyn ContractBindings>> {
    match connector.and_then(LocalWalletConnector::ethereum_wallet) {
        Some(wallet) => {
            let provider = BlockchainManager::get_signing_provider(local_config, wallet)?;
            Ok(Arc::new(
                BlockchainManager::get_dsc_bindings(provider, local_config).await?,
            ))
        }
        None => {
            let provider = BlockchainManager::get_provider(local_config)?;
            Ok(Arc::new(
                BlockchainManager::get_dsc_bindings(provider, local_config).await?,
            ))
        }
    }
}

fn spawn_status_logger(cache: &AccountStateCache) {
    let mut status = cache.subscribe_status();
    tokio::spawn(async move {
        loop {
            match status.recv().await {
                Ok(update) => match update.stage {
                    StatusStage::InProgress | StatusStage::Success => {
                        info!("[{}] {}", update.operation, update.message)
                    }
                    StatusStage::Failed => warn!("[{}] {}", update.operation, update.message),
                },
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {} status updates", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Connects when the command needs a wallet, runs it and always tears the cache down
async fn execute(
    cache: &AccountStateCache,
    command: Command,
    local_config: &LocalConfig,
) -> Result<()> {
    let result = run(cache, command, local_config).await;
    cache.teardown().await;

    if let Err(e) = &result {
        let error_message = e
            .chain()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        error!("Command failed: {}", error_message);
    }
    result
}

async fn run(cache: &AccountStateCache, command: Command, local_config: &LocalConfig) -> Result<()> {
    if command.needs_wallet() {
        cache.connect().await.context("Failed to connect wallet")?;
    }

    let collateral_token = cache.bindings().collateral_token();

    match command {
        Command::Status => print_json(&cache.snapshot()),
        Command::Deposit(amount) => print_json(&cache.deposit_collateral(&amount).await?),
        Command::DepositMint(collateral, dsc) => print_json(
            &cache
                .deposit_collateral_and_mint_dsc(&collateral, &dsc)
                .await?,
        ),
        Command::Mint(amount) => print_json(&cache.mint_dsc(&amount).await?),
        Command::Burn(amount) => print_json(&cache.burn_dsc(&amount).await?),
        Command::Redeem(amount) => print_json(&cache.redeem_collateral(&amount).await?),
        Command::RedeemForDsc(collateral, dsc) => {
            print_json(&cache.redeem_collateral_for_dsc(&collateral, &dsc).await?)
        }
        Command::Liquidate { user, debt, token } => {
            let token = token.unwrap_or(collateral_token);
            let position = cache.check_position(user).await?;
            if !position.liquidatable {
                warn!(
                    "{} is above the minimum health factor, the engine will reject the liquidation",
                    user
                );
            }
            print_json(&cache.liquidate(token, user, &debt).await?)
        }
        Command::Wrap(amount) => print_json(&cache.wrap_native(&amount).await?),
        Command::Unwrap(amount) => print_json(&cache.unwrap_token(&amount).await?),
        Command::Check(user) => print_json(&cache.check_position(user).await?),
        Command::Preview { debt, token } => print_json(
            &cache
                .liquidation_preview(token.unwrap_or(collateral_token), &debt)
                .await?,
        ),
        Command::Watch => watch(cache, local_config).await,
    }
}

async fn watch(cache: &AccountStateCache, local_config: &LocalConfig) -> Result<()> {
    let _wallet_events = cache.watch_wallet().await?;
    let _auto_refresh = cache
        .start_auto_refresh(Duration::from_secs(local_config.auto_refresh_interval_secs))
        .await;

    let mut snapshots = cache.subscribe();
    println!("{}", *snapshots.borrow_and_update());

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", *snapshots.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received ctrl-c, stopping");
                break;
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
