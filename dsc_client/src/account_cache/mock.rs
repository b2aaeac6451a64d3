use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    sol_types::SolError,
};
use async_trait::async_trait;
use dsc_contracts::DSCEngine;
use tokio::sync::{broadcast, oneshot, Notify};

use super::AccountStateCache;
use crate::{
    blockchain_manager::{AccountInformation, BindingError, ContractBindings, PendingTransaction},
    wallet::{ConnectorError, WalletConnector, WalletEvent},
};

pub const CHAIN_ID: u64 = 31337;
pub const ENGINE: Address = Address::repeat_byte(0xe0);
pub const WETH: Address = Address::repeat_byte(0xe1);
pub const ETH_PRICE_USD: u64 = 2000;
pub const LIQUIDATION_BONUS: u64 = 10;
pub const LIQUIDATION_PRECISION: u64 = 100;

pub fn ether(value: u64) -> U256 {
    U256::from(value) * U256::from(10).pow(U256::from(18))
}

#[derive(Debug, Clone)]
pub struct MockAccount {
    pub native: U256,
    pub weth: U256,
    pub dsc: U256,
    pub deposited: U256,
    pub collateral_value: U256,
    pub health_factor: U256,
    pub dsc_minted: U256,
    pub collateral_allowance: U256,
    pub stablecoin_allowance: U256,
}

impl Default for MockAccount {
    fn default() -> Self {
        Self {
            native: U256::ZERO,
            weth: U256::ZERO,
            dsc: U256::ZERO,
            deposited: U256::ZERO,
            collateral_value: U256::ZERO,
            health_factor: U256::MAX,
            dsc_minted: U256::ZERO,
            collateral_allowance: U256::ZERO,
            stablecoin_allowance: U256::ZERO,
        }
    }
}

struct Gate {
    entered: Arc<Notify>,
    release: oneshot::Receiver<()>,
}

/// In-memory DSC protocol with ETH at a fixed price.
///
/// Writes apply their balance effects immediately; every call is recorded by name.
#[derive(Default)]
pub struct MockBindings {
    accounts: Mutex<HashMap<Address, MockAccount>>,
    calls: Mutex<Vec<&'static str>>,
    fail_reads: AtomicBool,
    submit_failures: Mutex<HashMap<&'static str, BindingError>>,
    confirm_failures: Mutex<HashMap<&'static str, BindingError>>,
    gates: Mutex<VecDeque<Gate>>,
    tx_counter: AtomicU64,
}

impl MockBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_account(&self, address: Address, account: MockAccount) {
        self.accounts.lock().unwrap().insert(address, account);
    }

    pub fn update_account(&self, address: Address, update: impl FnOnce(&mut MockAccount)) {
        update(self.accounts.lock().unwrap().entry(address).or_default());
    }

    pub fn account(&self, address: Address) -> MockAccount {
        self.accounts
            .lock()
            .unwrap()
            .get(&address)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_submit(&self, call: &'static str, error: BindingError) {
        self.submit_failures.lock().unwrap().insert(call, error);
    }

    pub fn fail_confirm(&self, call: &'static str, error: BindingError) {
        self.confirm_failures.lock().unwrap().insert(call, error);
    }

    /// Parks the next `health_factor` read after it captured its value.
    /// `entered` fires once parked; sending on the returned sender releases it.
    pub fn hold_next_health_factor(&self) -> (Arc<Notify>, oneshot::Sender<()>) {
        let entered = Arc::new(Notify::new());
        let (release_tx, release) = oneshot::channel();
        self.gates.lock().unwrap().push_back(Gate {
            entered: entered.clone(),
            release,
        });
        (entered, release_tx)
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| **call == name)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Recorded writes, in submission order
    pub fn writes(&self) -> Vec<&'static str> {
        const WRITES: [&str; 11] = [
            "approve_collateral",
            "approve_stablecoin",
            "deposit_collateral",
            "deposit_collateral_and_mint_dsc",
            "mint_dsc",
            "burn_dsc",
            "redeem_collateral",
            "redeem_collateral_for_dsc",
            "liquidate",
            "wrap_native",
            "unwrap_token",
        ];
        self.calls()
            .into_iter()
            .filter(|call| WRITES.contains(call))
            .collect()
    }

    fn read(&self, call: &'static str, address: Address) -> Result<MockAccount, BindingError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BindingError::Transport("connection refused".to_string()));
        }
        Ok(self.account(address))
    }

    fn read_global(&self, call: &'static str) -> Result<(), BindingError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BindingError::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    fn write(
        &self,
        call: &'static str,
        from: Address,
        effect: impl FnOnce(&mut HashMap<Address, MockAccount>) -> Result<(), BindingError>,
    ) -> Result<PendingTransaction, BindingError> {
        self.calls.lock().unwrap().push(call);
        if let Some(error) = self.submit_failures.lock().unwrap().get(call) {
            return Err(error.clone());
        }

        let count = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let mut tx_bytes = [0u8; 32];
        tx_bytes[..20].copy_from_slice(from.as_slice());
        tx_bytes[24..].copy_from_slice(&count.to_be_bytes());
        let tx_hash = TxHash::from(tx_bytes);

        let confirm_failure = self.confirm_failures.lock().unwrap().get(call).cloned();
        if confirm_failure.is_none() {
            effect(&mut self.accounts.lock().unwrap())?;
        }

        Ok(PendingTransaction::new(tx_hash, async move {
            match confirm_failure {
                Some(error) => Err(error),
                None => Ok(tx_hash),
            }
        }))
    }

    fn usd_of(amount: U256) -> U256 {
        amount * U256::from(ETH_PRICE_USD)
    }

    fn tokens_of(usd: U256) -> U256 {
        usd / U256::from(ETH_PRICE_USD)
    }
}

fn deposit(account: &mut MockAccount, amount: U256) {
    account.weth = account.weth.saturating_sub(amount);
    account.collateral_allowance = account.collateral_allowance.saturating_sub(amount);
    account.deposited += amount;
    account.collateral_value = MockBindings::usd_of(account.deposited);
}

fn redeem(account: &mut MockAccount, amount: U256) {
    account.deposited = account.deposited.saturating_sub(amount);
    account.weth += amount;
    account.collateral_value = MockBindings::usd_of(account.deposited);
}

fn burn(account: &mut MockAccount, amount: U256) {
    account.dsc = account.dsc.saturating_sub(amount);
    account.stablecoin_allowance = account.stablecoin_allowance.saturating_sub(amount);
    account.dsc_minted = account.dsc_minted.saturating_sub(amount);
}

#[async_trait]
impl ContractBindings for MockBindings {
    fn chain_id(&self) -> u64 {
        CHAIN_ID
    }

    fn engine_address(&self) -> Address {
        ENGINE
    }

    fn collateral_token(&self) -> Address {
        WETH
    }

    async fn native_balance(&self, account: Address) -> Result<U256, BindingError> {
        Ok(self.read("native_balance", account)?.native)
    }

    async fn collateral_token_balance(&self, account: Address) -> Result<U256, BindingError> {
        Ok(self.read("collateral_token_balance", account)?.weth)
    }

    async fn stablecoin_balance(&self, account: Address) -> Result<U256, BindingError> {
        Ok(self.read("stablecoin_balance", account)?.dsc)
    }

    async fn collateral_balance_of_user(
        &self,
        account: Address,
        _token: Address,
    ) -> Result<U256, BindingError> {
        Ok(self.read("collateral_balance_of_user", account)?.deposited)
    }

    async fn account_collateral_value(&self, account: Address) -> Result<U256, BindingError> {
        Ok(self
            .read("account_collateral_value", account)?
            .collateral_value)
    }

    async fn health_factor(&self, account: Address) -> Result<U256, BindingError> {
        let health_factor = self.read("health_factor", account)?.health_factor;

        let gate = self.gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            let _ = gate.release.await;
        }

        Ok(health_factor)
    }

    async fn account_information(
        &self,
        account: Address,
    ) -> Result<AccountInformation, BindingError> {
        let account = self.read("account_information", account)?;
        Ok(AccountInformation {
            total_dsc_minted: account.dsc_minted,
            collateral_value_in_usd: account.collateral_value,
        })
    }

    async fn usd_value(&self, _token: Address, amount: U256) -> Result<U256, BindingError> {
        self.read_global("usd_value")?;
        Ok(Self::usd_of(amount))
    }

    async fn token_amount_from_usd(
        &self,
        _token: Address,
        usd_amount: U256,
    ) -> Result<U256, BindingError> {
        self.read_global("token_amount_from_usd")?;
        Ok(Self::tokens_of(usd_amount))
    }

    async fn liquidation_bonus(&self) -> Result<U256, BindingError> {
        self.read_global("liquidation_bonus")?;
        Ok(U256::from(LIQUIDATION_BONUS))
    }

    async fn liquidation_precision(&self) -> Result<U256, BindingError> {
        self.read_global("liquidation_precision")?;
        Ok(U256::from(LIQUIDATION_PRECISION))
    }

    async fn min_health_factor(&self) -> Result<U256, BindingError> {
        self.read_global("min_health_factor")?;
        Ok(ether(1))
    }

    async fn collateral_tokens(&self) -> Result<Vec<Address>, BindingError> {
        self.read_global("collateral_tokens")?;
        Ok(vec![WETH])
    }

    async fn collateral_allowance(&self, owner: Address) -> Result<U256, BindingError> {
        Ok(self
            .read("collateral_allowance", owner)?
            .collateral_allowance)
    }

    async fn stablecoin_allowance(&self, owner: Address) -> Result<U256, BindingError> {
        Ok(self
            .read("stablecoin_allowance", owner)?
            .stablecoin_allowance)
    }

    async fn approve_collateral(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        self.write("approve_collateral", from, |accounts| {
            accounts.entry(from).or_default().collateral_allowance = amount;
            Ok(())
        })
    }

    async fn approve_stablecoin(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        self.write("approve_stablecoin", from, |accounts| {
            accounts.entry(from).or_default().stablecoin_allowance = amount;
            Ok(())
        })
    }

    async fn deposit_collateral(
        &self,
        from: Address,
        _token: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        self.write("deposit_collateral", from, |accounts| {
            deposit(accounts.entry(from).or_default(), amount);
            Ok(())
        })
    }

    async fn deposit_collateral_and_mint_dsc(
        &self,
        from: Address,
        _token: Address,
        amount_collateral: U256,
        amount_dsc: U256,
    ) -> Result<PendingTransaction, BindingError> {
        self.write("deposit_collateral_and_mint_dsc", from, |accounts| {
            let account = accounts.entry(from).or_default();
            deposit(account, amount_collateral);
            account.dsc += amount_dsc;
            account.dsc_minted += amount_dsc;
            Ok(())
        })
    }

    async fn mint_dsc(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        self.write("mint_dsc", from, |accounts| {
            let account = accounts.entry(from).or_default();
            account.dsc += amount;
            account.dsc_minted += amount;
            Ok(())
        })
    }

    async fn burn_dsc(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        self.write("burn_dsc", from, |accounts| {
            burn(accounts.entry(from).or_default(), amount);
            Ok(())
        })
    }

    async fn redeem_collateral(
        &self,
        from: Address,
        _token: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        self.write("redeem_collateral", from, |accounts| {
            redeem(accounts.entry(from).or_default(), amount);
            Ok(())
        })
    }

    async fn redeem_collateral_for_dsc(
        &self,
        from: Address,
        _token: Address,
        amount_collateral: U256,
        amount_dsc: U256,
    ) -> Result<PendingTransaction, BindingError> {
        self.write("redeem_collateral_for_dsc", from, |accounts| {
            let account = accounts.entry(from).or_default();
            burn(account, amount_dsc);
            redeem(account, amount_collateral);
            Ok(())
        })
    }

    async fn liquidate(
        &self,
        from: Address,
        _collateral: Address,
        user: Address,
        debt_to_cover: U256,
    ) -> Result<PendingTransaction, BindingError> {
        self.write("liquidate", from, |accounts| {
            let target = accounts.entry(user).or_default();
            if target.health_factor >= ether(1) {
                return Err(BindingError::Reverted {
                    data: Some(Bytes::from(
                        DSCEngine::DSCEngine__HealthFactorOk {}.abi_encode(),
                    )),
                    message: "execution reverted".to_string(),
                });
            }

            let seized = Self::tokens_of(debt_to_cover);
            let seized = seized + seized * U256::from(LIQUIDATION_BONUS)
                / U256::from(LIQUIDATION_PRECISION);
            target.dsc_minted = target.dsc_minted.saturating_sub(debt_to_cover);
            target.deposited = target.deposited.saturating_sub(seized);

            let liquidator = accounts.entry(from).or_default();
            burn(liquidator, debt_to_cover);
            liquidator.weth += seized;
            Ok(())
        })
    }

    async fn wrap_native(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        self.write("wrap_native", from, |accounts| {
            let account = accounts.entry(from).or_default();
            account.native = account.native.saturating_sub(amount);
            account.weth += amount;
            Ok(())
        })
    }

    async fn unwrap_token(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError> {
        self.write("unwrap_token", from, |accounts| {
            let account = accounts.entry(from).or_default();
            account.weth = account.weth.saturating_sub(amount);
            account.native += amount;
            Ok(())
        })
    }
}

pub struct MockConnector {
    accounts: Mutex<Vec<Address>>,
    chain_id: AtomicU64,
    rejects: AtomicBool,
    events: broadcast::Sender<WalletEvent>,
}

impl MockConnector {
    pub fn new(accounts: Vec<Address>, chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            accounts: Mutex::new(accounts),
            chain_id: AtomicU64::new(chain_id),
            rejects: AtomicBool::new(false),
            events,
        }
    }

    pub fn set_rejects(&self, rejects: bool) {
        self.rejects.store(rejects, Ordering::SeqCst);
    }

    pub fn emit(&self, event: WalletEvent) {
        match &event {
            WalletEvent::AccountsChanged(accounts) => {
                *self.accounts.lock().unwrap() = accounts.clone();
            }
            WalletEvent::ChainChanged(chain_id) => {
                self.chain_id.store(*chain_id, Ordering::SeqCst);
            }
        }
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletConnector for MockConnector {
    async fn request_accounts(&self) -> Result<Vec<Address>, ConnectorError> {
        if self.rejects.load(Ordering::SeqCst) {
            return Err(ConnectorError::Rejected);
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn chain_id(&self) -> Result<u64, ConnectorError> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

pub fn setup(
    accounts: Vec<Address>,
) -> (AccountStateCache, Arc<MockBindings>, Arc<MockConnector>) {
    let bindings = Arc::new(MockBindings::new());
    let connector = Arc::new(MockConnector::new(accounts, CHAIN_ID));
    let wallet: Arc<dyn WalletConnector> = connector.clone();
    let cache = AccountStateCache::create(Some(wallet), bindings.clone());
    (cache, bindings, connector)
}
