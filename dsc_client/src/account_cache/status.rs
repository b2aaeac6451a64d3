use std::fmt;

use alloy::primitives::TxHash;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::snapshot::AccountSnapshot;
use crate::errors::CacheError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationKind {
    Connect,
    DepositCollateral,
    DepositCollateralAndMintDsc,
    MintDsc,
    BurnDsc,
    RedeemCollateral,
    RedeemCollateralForDsc,
    Liquidate,
    WrapNative,
    UnwrapToken,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::DepositCollateral => "deposit collateral",
            Self::DepositCollateralAndMintDsc => "deposit collateral and mint DSC",
            Self::MintDsc => "mint DSC",
            Self::BurnDsc => "burn DSC",
            Self::RedeemCollateral => "redeem collateral",
            Self::RedeemCollateralForDsc => "redeem collateral for DSC",
            Self::Liquidate => "liquidate",
            Self::WrapNative => "wrap native",
            Self::UnwrapToken => "unwrap token",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusStage {
    InProgress,
    Success,
    Failed,
}

/// Progress message for the UI, e.g. "Approving WETH for DSCEngine..."
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub operation: OperationKind,
    pub stage: StatusStage,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn new(operation: OperationKind, stage: StatusStage, message: impl Into<String>) -> Self {
        Self {
            operation,
            stage,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Result of a confirmed mutating operation
#[derive(Debug, Clone, Serialize)]
pub struct OperationReceipt {
    pub operation: OperationKind,
    /// Confirmed transactions in submission order, approvals included
    pub transactions: Vec<TxHash>,
    pub status: String,
    /// Snapshot after the post-confirmation refresh
    pub snapshot: AccountSnapshot,
    /// Set when the transactions confirmed but the refresh afterwards failed;
    /// `snapshot` is then the last known good one.
    pub refresh_error: Option<CacheError>,
}
