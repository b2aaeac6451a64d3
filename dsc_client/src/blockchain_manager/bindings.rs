use std::future::Future;

use alloy::{
    network::{Ethereum, ReceiptResponse},
    primitives::{Address, Bytes, TxHash, U256},
    providers::PendingTransactionBuilder,
    transports::TransportError,
};
use async_trait::async_trait;
use futures::{future::BoxFuture, FutureExt};
use serde::Serialize;

/// EIP-1193 "user rejected request"
const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("{0}")]
    Transport(String),
    #[error("execution reverted: {message}")]
    Reverted {
        data: Option<Bytes>,
        message: String,
    },
    #[error("rejected by signer: {0}")]
    Rejected(String),
}

impl BindingError {
    pub fn from_transport(error: TransportError) -> Self {
        if let Some(payload) = error.as_error_resp() {
            if payload.code == USER_REJECTED_CODE {
                return Self::Rejected(payload.message.to_string());
            }
            if let Some(data) = payload.as_revert_data() {
                return Self::Reverted {
                    data: Some(data),
                    message: payload.message.to_string(),
                };
            }
            if payload.message.contains("revert") || payload.message.contains("insufficient funds")
            {
                return Self::Reverted {
                    data: None,
                    message: payload.message.to_string(),
                };
            }
        }
        Self::Transport(error.to_string())
    }

    pub fn from_contract(error: alloy::contract::Error) -> Self {
        match error {
            alloy::contract::Error::TransportError(error) => Self::from_transport(error),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Engine-side view of an account, as returned by `getAccountInformation`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AccountInformation {
    pub total_dsc_minted: U256,
    pub collateral_value_in_usd: U256,
}

/// A submitted transaction. Awaiting `confirm` resolves once it is mined;
/// a mined transaction with failed status resolves to `BindingError::Reverted`.
pub struct PendingTransaction {
    tx_hash: TxHash,
    confirmation: BoxFuture<'static, Result<TxHash, BindingError>>,
}

impl PendingTransaction {
    pub fn new<F>(tx_hash: TxHash, confirmation: F) -> Self
    where
        F: Future<Output = Result<TxHash, BindingError>> + Send + 'static,
    {
        Self {
            tx_hash,
            confirmation: confirmation.boxed(),
        }
    }

    pub fn from_alloy(pending: PendingTransactionBuilder<Ethereum>) -> Self {
        let tx_hash = *pending.tx_hash();
        Self::new(tx_hash, async move {
            let receipt = pending
                .get_receipt()
                .await
                .map_err(|e| BindingError::Transport(e.to_string()))?;

            if receipt.status() {
                Ok(receipt.transaction_hash)
            } else {
                Err(BindingError::Reverted {
                    data: None,
                    message: format!("transaction {} reverted", receipt.transaction_hash),
                })
            }
        })
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    pub async fn confirm(self) -> Result<TxHash, BindingError> {
        self.confirmation.await
    }
}

impl std::fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("tx_hash", &self.tx_hash)
            .finish_non_exhaustive()
    }
}

/// Read and write surface of the DSC contracts used by the account cache.
///
/// Write methods return once the transaction is accepted by the node; the
/// caller decides when to await confirmation.
#[async_trait]
pub trait ContractBindings: Send + Sync {
    fn chain_id(&self) -> u64;

    fn engine_address(&self) -> Address;

    /// The wrapped-native token tracked in the account snapshot
    fn collateral_token(&self) -> Address;

    // ---------- Reads ----------

    async fn native_balance(&self, account: Address) -> Result<U256, BindingError>;

    async fn collateral_token_balance(&self, account: Address) -> Result<U256, BindingError>;

    async fn stablecoin_balance(&self, account: Address) -> Result<U256, BindingError>;

    async fn collateral_balance_of_user(
        &self,
        account: Address,
        token: Address,
    ) -> Result<U256, BindingError>;

    async fn account_collateral_value(&self, account: Address) -> Result<U256, BindingError>;

    async fn health_factor(&self, account: Address) -> Result<U256, BindingError>;

    async fn account_information(
        &self,
        account: Address,
    ) -> Result<AccountInformation, BindingError>;

    async fn usd_value(&self, token: Address, amount: U256) -> Result<U256, BindingError>;

    async fn token_amount_from_usd(
        &self,
        token: Address,
        usd_amount: U256,
    ) -> Result<U256, BindingError>;

    async fn liquidation_bonus(&self) -> Result<U256, BindingError>;

    async fn liquidation_precision(&self) -> Result<U256, BindingError>;

    async fn min_health_factor(&self) -> Result<U256, BindingError>;

    async fn collateral_tokens(&self) -> Result<Vec<Address>, BindingError>;

    /// Collateral token allowance granted to the engine
    async fn collateral_allowance(&self, owner: Address) -> Result<U256, BindingError>;

    /// Stablecoin allowance granted to the engine
    async fn stablecoin_allowance(&self, owner: Address) -> Result<U256, BindingError>;

    // ---------- Writes ----------

    async fn approve_collateral(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError>;

    async fn approve_stablecoin(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError>;

    async fn deposit_collateral(
        &self,
        from: Address,
        token: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError>;

    async fn deposit_collateral_and_mint_dsc(
        &self,
        from: Address,
        token: Address,
        amount_collateral: U256,
        amount_dsc: U256,
    ) -> Result<PendingTransaction, BindingError>;

    async fn mint_dsc(&self, from: Address, amount: U256)
        -> Result<PendingTransaction, BindingError>;

    async fn burn_dsc(&self, from: Address, amount: U256)
        -> Result<PendingTransaction, BindingError>;

    async fn redeem_collateral(
        &self,
        from: Address,
        token: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError>;

    async fn redeem_collateral_for_dsc(
        &self,
        from: Address,
        token: Address,
        amount_collateral: U256,
        amount_dsc: U256,
    ) -> Result<PendingTransaction, BindingError>;

    async fn liquidate(
        &self,
        from: Address,
        collateral: Address,
        user: Address,
        debt_to_cover: U256,
    ) -> Result<PendingTransaction, BindingError>;

    /// Native currency -> collateral token (`deposit` with value)
    async fn wrap_native(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError>;

    /// Collateral token -> native currency (`withdraw`)
    async fn unwrap_token(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<PendingTransaction, BindingError>;
}
