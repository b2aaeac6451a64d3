mod operations;
mod snapshot;
mod status;

#[cfg(test)]
mod mock;

pub use snapshot::{
    classify_health_factor, AccountSnapshot, HealthStatus, LiquidationPreview, PositionReport,
};
pub use status::{OperationKind, OperationReceipt, StatusStage, StatusUpdate};

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use alloy::primitives::Address;
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        watch, Mutex,
    },
    task::{AbortHandle, JoinHandle},
    time::MissedTickBehavior,
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    blockchain_manager::{BindingError, ContractBindings},
    errors::CacheError,
    wallet::{Subscription, WalletConnector, WalletEvent},
};

const STATUS_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected(Address),
}

impl ConnectionState {
    pub fn address(&self) -> Option<Address> {
        match self {
            Self::Disconnected => None,
            Self::Connected(address) => Some(*address),
        }
    }
}

struct CacheState {
    connection: ConnectionState,
    /// Ticket handed to the most recently started refresh
    next_ticket: u64,
    /// Refreshes holding a ticket at or below this one may no longer publish
    published_ticket: u64,
}

struct CacheInner {
    connector: Option<Arc<dyn WalletConnector>>,
    bindings: Arc<dyn ContractBindings>,
    state: Mutex<CacheState>,
    snapshot: watch::Sender<AccountSnapshot>,
    status: broadcast::Sender<StatusUpdate>,
    /// Listeners started by this cache, aborted on `teardown`
    listeners: Mutex<Vec<(&'static str, AbortHandle)>>,
}

/// Client-side view of one wallet account's position in the DSC protocol.
///
/// Holds the connection state and the latest `AccountSnapshot`, and runs every
/// state-changing operation against the injected `ContractBindings`. Clones share
/// the same cache.
///
/// Refreshes may overlap. The most recently started one wins: a refresh whose
/// result arrives after a newer refresh published, or after the active account
/// changed, is dropped.
#[derive(Clone)]
pub struct AccountStateCache {
    inner: Arc<CacheInner>,
}

impl AccountStateCache {
    /// Creates a disconnected cache. `connector` is `None` when no wallet is installed.
    pub fn create(
        connector: Option<Arc<dyn WalletConnector>>,
        bindings: Arc<dyn ContractBindings>,
    ) -> Self {
        let (snapshot, _) = watch::channel(AccountSnapshot::default());
        let (status, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(CacheInner {
                connector,
                bindings,
                state: Mutex::new(CacheState {
                    connection: ConnectionState::Disconnected,
                    next_ticket: 0,
                    published_ticket: 0,
                }),
                snapshot,
                status,
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<AccountSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusUpdate> {
        self.inner.status.subscribe()
    }

    pub async fn connection(&self) -> ConnectionState {
        self.inner.state.lock().await.connection
    }

    pub fn bindings(&self) -> &Arc<dyn ContractBindings> {
        &self.inner.bindings
    }

    /// Requests account access from the wallet and loads the first snapshot.
    #[instrument("CONNECT", skip_all)]
    pub async fn connect(&self) -> Result<AccountSnapshot, CacheError> {
        let operation = OperationKind::Connect;
        self.report(operation, StatusStage::InProgress, "Connecting wallet...");

        match self.try_connect().await {
            Ok(snapshot) => {
                self.report(operation, StatusStage::Success, "Wallet connected");
                Ok(snapshot)
            }
            Err(e) => {
                warn!("Failed to connect wallet: {}", e);
                self.report(operation, StatusStage::Failed, e.status_message());
                Err(e)
            }
        }
    }

    async fn try_connect(&self) -> Result<AccountSnapshot, CacheError> {
        let connector = self
            .inner
            .connector
            .as_ref()
            .ok_or(CacheError::WalletUnavailable)?;

        let accounts = connector.request_accounts().await?;
        let address = *accounts.first().ok_or(CacheError::UserRejected)?;

        let expected = self.inner.bindings.chain_id();
        let actual = connector.chain_id().await?;
        if actual != expected {
            return Err(CacheError::UnsupportedChain { expected, actual });
        }

        info!("Connected account {}", address);
        self.bind_and_refresh(address).await
    }

    /// Re-reads the account state and publishes it if still current.
    ///
    /// Does nothing while disconnected. On failure the previous snapshot stays
    /// published. When superseded, the current snapshot is returned instead.
    #[instrument("REFRESH", skip_all)]
    pub async fn refresh(&self) -> Result<AccountSnapshot, CacheError> {
        let (address, ticket) = {
            let mut state = self.inner.state.lock().await;
            let Some(address) = state.connection.address() else {
                debug!("Not connected, skipping refresh");
                return Ok(self.snapshot());
            };
            state.next_ticket += 1;
            (address, state.next_ticket)
        };

        let result = self.read_snapshot(address).await;

        let mut state = self.inner.state.lock().await;
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to refresh account {}: {}", address, e);
                return Err(CacheError::read_failure(e));
            }
        };

        if state.connection.address() != Some(address) || ticket <= state.published_ticket {
            debug!("Dropping superseded refresh #{} for {}", ticket, address);
            return Ok(self.snapshot());
        }

        state.published_ticket = ticket;
        self.inner.snapshot.send_replace(snapshot.clone());
        drop(state);

        debug!("Published snapshot #{}: {}", ticket, snapshot);
        Ok(snapshot)
    }

    async fn read_snapshot(&self, address: Address) -> Result<AccountSnapshot, BindingError> {
        let bindings = &self.inner.bindings;
        let token = bindings.collateral_token();

        let (
            native_balance,
            collateral_token_balance,
            stablecoin_balance,
            deposited_collateral,
            total_collateral_value_usd,
            health_factor,
        ) = futures::try_join!(
            bindings.native_balance(address),
            bindings.collateral_token_balance(address),
            bindings.stablecoin_balance(address),
            bindings.collateral_balance_of_user(address, token),
            bindings.account_collateral_value(address),
            bindings.health_factor(address),
        )?;

        Ok(AccountSnapshot {
            address: Some(address),
            native_balance,
            collateral_token_balance,
            stablecoin_balance,
            deposited_collateral,
            total_collateral_value_usd,
            health_factor,
        })
    }

    /// Forgets the account and publishes the empty snapshot. In-flight refreshes are dropped.
    pub async fn disconnect(&self) {
        let mut state = self.inner.state.lock().await;
        state.connection = ConnectionState::Disconnected;
        state.published_ticket = state.next_ticket;
        self.inner.snapshot.send_replace(AccountSnapshot::default());
        drop(state);

        info!("Wallet disconnected");
    }

    async fn bind(&self, address: Address) {
        let mut state = self.inner.state.lock().await;
        if state.connection.address() != Some(address) {
            state.connection = ConnectionState::Connected(address);
            state.published_ticket = state.next_ticket;
        }
    }

    async fn bind_and_refresh(&self, address: Address) -> Result<AccountSnapshot, CacheError> {
        self.bind(address).await;

        let result = self.refresh().await;
        if result.is_err() {
            // Never keep showing another account's numbers under the new address
            let state = self.inner.state.lock().await;
            if state.connection.address() == Some(address)
                && self.inner.snapshot.borrow().address != Some(address)
            {
                self.inner.snapshot.send_replace(AccountSnapshot::default());
            }
        }
        result
    }

    /// Applies a wallet notification to the cache.
    pub async fn handle_wallet_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => {
                let Some(&next) = accounts.first() else {
                    info!("Wallet revoked account access");
                    self.disconnect().await;
                    return;
                };

                match self.connection().await {
                    ConnectionState::Connected(current) if current != next => {
                        info!("Active account changed from {} to {}", current, next);
                        if let Err(e) = self.bind_and_refresh(next).await {
                            error!("Failed to load account {}: {}", next, e);
                        }
                    }
                    ConnectionState::Connected(_) => {
                        debug!("Active account unchanged");
                    }
                    ConnectionState::Disconnected => {
                        debug!("Ignoring account change while disconnected");
                    }
                }
            }
            WalletEvent::ChainChanged(chain_id) => {
                let expected = self.inner.bindings.chain_id();
                if chain_id == expected {
                    debug!("Wallet reported chain {}, nothing to do", chain_id);
                } else {
                    warn!(
                        "Wallet switched to chain {}, contracts live on chain {}",
                        chain_id, expected
                    );
                    self.disconnect().await;
                }
            }
        }
    }

    /// Starts applying wallet notifications. Runs until the returned
    /// subscription is dropped or the cache is torn down.
    pub async fn watch_wallet(&self) -> Result<Subscription, CacheError> {
        let connector = self
            .inner
            .connector
            .as_ref()
            .ok_or(CacheError::WalletUnavailable)?;

        let mut events = connector.subscribe();
        let cache = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} wallet events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(cache) = Self::upgrade(&cache) else {
                    break;
                };
                cache.handle_wallet_event(event).await;
            }
            debug!("Wallet event listener stopped");
        });

        Ok(self.register("wallet-events", handle).await)
    }

    /// Refreshes every `period` while the returned subscription is alive.
    pub async fn start_auto_refresh(&self, period: Duration) -> Subscription {
        let cache = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(cache) = Self::upgrade(&cache) else {
                    break;
                };
                if let Err(e) = cache.refresh().await {
                    error!("Auto refresh failed: {}", e);
                }
            }
        });

        info!("Auto refresh every {:?}", period);
        self.register("auto-refresh", handle).await
    }

    /// Stops every background listener and disconnects.
    pub async fn teardown(&self) {
        let listeners = std::mem::take(&mut *self.inner.listeners.lock().await);
        for (name, listener) in listeners {
            if !listener.is_finished() {
                debug!("Stopping {} listener", name);
                listener.abort();
            }
        }
        self.disconnect().await;
    }

    pub async fn active_subscriptions(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .await
            .iter()
            .filter(|(_, listener)| !listener.is_finished())
            .count()
    }

    async fn register(&self, name: &'static str, handle: JoinHandle<()>) -> Subscription {
        self.inner
            .listeners
            .lock()
            .await
            .push((name, handle.abort_handle()));
        Subscription::new(name, handle)
    }

    fn upgrade(inner: &Weak<CacheInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn report(
        &self,
        operation: OperationKind,
        stage: StatusStage,
        message: impl Into<String>,
    ) {
        let update = StatusUpdate::new(operation, stage, message);
        debug!("[{}] {}", update.operation, update.message);
        // No receivers is fine
        let _ = self.inner.status.send(update);
    }
}
