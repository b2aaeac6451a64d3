mod local;

pub use local::LocalWalletConnector;

use alloy::primitives::Address;
use async_trait::async_trait;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::debug;

/// Notifications pushed by the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// New account list, active account first. Empty when the wallet revoked access.
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectorError {
    #[error("request rejected by user")]
    Rejected,
    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

/// The wallet the client talks to for account access and change notifications.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    /// Asks the wallet for account access. The active account comes first.
    async fn request_accounts(&self) -> Result<Vec<Address>, ConnectorError>;

    async fn chain_id(&self) -> Result<u64, ConnectorError>;

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

/// Handle to a background listener. Dropping it stops the listener.
#[derive(Debug)]
pub struct Subscription {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn new(name: &'static str, handle: JoinHandle<()>) -> Self {
        Self { name, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            debug!("Stopping {} subscription", self.name);
            self.handle.abort();
        }
    }
}
