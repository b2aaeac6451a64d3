use alloy::{network::EthereumWallet, primitives::Address, signers::local::PrivateKeySigner};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use super::{ConnectorError, WalletConnector, WalletEvent};

const EVENT_CHANNEL_CAPACITY: usize = 16;

struct LocalWalletState {
    // Index into `signers`, `None` while access is revoked
    active: Option<usize>,
    chain_id: u64,
    locked: bool,
}

/// Wallet backed by private keys held in memory.
///
/// Behaves like an injected browser wallet: account access is granted on
/// request, the active account and chain can be switched, and every switch is
/// broadcast to subscribers.
pub struct LocalWalletConnector {
    signers: Vec<PrivateKeySigner>,
    state: Mutex<LocalWalletState>,
    events: broadcast::Sender<WalletEvent>,
}

impl LocalWalletConnector {
    /// Builds the wallet from hex private keys. The first key is the active account.
    pub fn new(private_keys: &[String], chain_id: u64) -> Result<Self> {
        let signers = private_keys
            .iter()
            .enumerate()
            .map(|(index, key)| {
                key.parse::<PrivateKeySigner>()
                    .context(format!("Invalid wallet private key at position {}", index))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_signers(signers, chain_id))
    }

    pub fn from_signers(signers: Vec<PrivateKeySigner>, chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            signers,
            state: Mutex::new(LocalWalletState {
                active: None,
                chain_id,
                locked: false,
            }),
            events,
        }
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.signers.iter().map(|signer| signer.address()).collect()
    }

    /// Signing wallet holding every account, for the transaction-sending provider
    pub fn ethereum_wallet(&self) -> Option<EthereumWallet> {
        let (first, rest) = self.signers.split_first()?;
        let mut wallet = EthereumWallet::new(first.clone());
        for signer in rest {
            wallet.register_signer(signer.clone());
        }
        Some(wallet)
    }

    pub async fn switch_account(&self, address: Address) -> Result<(), ConnectorError> {
        let index = self
            .signers
            .iter()
            .position(|signer| signer.address() == address)
            .ok_or_else(|| ConnectorError::Unavailable(format!("unknown account {}", address)))?;

        let accounts = {
            let mut state = self.state.lock().await;
            state.active = Some(index);
            self.ordered_accounts(index)
        };

        info!("Wallet switched to account {}", address);
        self.emit(WalletEvent::AccountsChanged(accounts));
        Ok(())
    }

    /// Revokes account access, as a wallet does when the user disconnects the site
    pub async fn disconnect_accounts(&self) {
        self.state.lock().await.active = None;
        info!("Wallet revoked account access");
        self.emit(WalletEvent::AccountsChanged(vec![]));
    }

    pub async fn switch_chain(&self, chain_id: u64) {
        self.state.lock().await.chain_id = chain_id;
        info!("Wallet switched to chain {}", chain_id);
        self.emit(WalletEvent::ChainChanged(chain_id));
    }

    /// A locked wallet rejects account requests
    pub async fn lock(&self) {
        self.state.lock().await.locked = true;
    }

    pub async fn unlock(&self) {
        self.state.lock().await.locked = false;
    }

    fn ordered_accounts(&self, active: usize) -> Vec<Address> {
        let mut accounts = Vec::with_capacity(self.signers.len());
        accounts.push(self.signers[active].address());
        accounts.extend(
            self.signers
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != active)
                .map(|(_, signer)| signer.address()),
        );
        accounts
    }

    fn emit(&self, event: WalletEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletConnector for LocalWalletConnector {
    async fn request_accounts(&self) -> Result<Vec<Address>, ConnectorError> {
        if self.signers.is_empty() {
            return Err(ConnectorError::Unavailable(
                "no accounts configured".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        if state.locked {
            return Err(ConnectorError::Rejected);
        }

        let active = *state.active.get_or_insert(0);
        Ok(self.ordered_accounts(active))
    }

    async fn chain_id(&self) -> Result<u64, ConnectorError> {
        Ok(self.state.lock().await.chain_id)
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
