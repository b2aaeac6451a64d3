use dsc_contracts::RevertReason;
use serde::Serialize;

use crate::{blockchain_manager::BindingError, wallet::ConnectorError};

/// Client-side amount validation failures. Raised before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ValidationError {
    #[error("please enter an amount")]
    Empty,
    #[error("'{0}' is not a valid amount")]
    Invalid(String),
    #[error("amount must be greater than zero, got '{0}'")]
    NotPositive(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum CacheError {
    #[error("no wallet found, please install a wallet to continue")]
    WalletUnavailable,
    #[error("request rejected in wallet")]
    UserRejected,
    #[error("wallet is not connected")]
    NotConnected,
    #[error("wallet is on chain {actual}, expected chain {expected}")]
    UnsupportedChain { expected: u64, actual: u64 },
    #[error("failed to read account state: {0}")]
    ReadFailure(String),
    #[error("transaction reverted: {0}")]
    TransactionReverted(RevertReason),
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
    #[error("invalid amount: {0}")]
    Validation(#[from] ValidationError),
}

impl CacheError {
    /// Message shown to the user for a failed operation
    pub fn status_message(&self) -> String {
        format!("Error: {}", self)
    }

    /// Wraps a failed read. Reads never carry a meaningful revert for the user.
    pub fn read_failure(error: BindingError) -> Self {
        Self::ReadFailure(error.to_string())
    }

    /// Distinguishes a failed transaction by cause
    pub fn from_transaction(error: BindingError) -> Self {
        match error {
            BindingError::Rejected(_) => Self::UserRejected,
            BindingError::Reverted { data, message } => {
                let data = data.as_ref().map(|data| &data[..]);
                Self::TransactionReverted(dsc_contracts::decode_revert(data, &message))
            }
            BindingError::Transport(message) => Self::TransactionFailed(message),
        }
    }
}

impl From<ConnectorError> for CacheError {
    fn from(error: ConnectorError) -> Self {
        match error {
            ConnectorError::Rejected => Self::UserRejected,
            ConnectorError::Unavailable(_) => Self::WalletUnavailable,
        }
    }
}
