use std::fmt;

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::utils::{
    constants::{INFINITE_HEALTH_FACTOR, LIQUIDATION_THRESHOLD, TOKEN_DECIMALS, USD_VALUE_DECIMALS},
    math_helper::{format_health_factor, format_token_amount},
};

/// On-chain state of the connected account, read as one batch.
///
/// The default value is the disconnected state: no address, every amount zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct AccountSnapshot {
    pub address: Option<Address>,
    pub native_balance: U256,
    pub collateral_token_balance: U256,
    pub stablecoin_balance: U256,
    pub deposited_collateral: U256,
    /// 18-decimal USD value of every deposited collateral token
    pub total_collateral_value_usd: U256,
    /// 18-decimal ratio reported by the engine
    pub health_factor: U256,
}

impl AccountSnapshot {
    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    /// `None` while disconnected
    pub fn health_status(&self) -> Option<HealthStatus> {
        self.address
            .map(|_| classify_health_factor(self.health_factor))
    }
}

impl fmt::Display for AccountSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(address) = self.address else {
            return write!(f, "disconnected");
        };

        write!(
            f,
            "{} | native: {} | collateral token: {} | DSC: {} | deposited: {} | collateral value: ${} | health factor: {}",
            address,
            format_token_amount(self.native_balance, TOKEN_DECIMALS),
            format_token_amount(self.collateral_token_balance, TOKEN_DECIMALS),
            format_token_amount(self.stablecoin_balance, TOKEN_DECIMALS),
            format_token_amount(self.deposited_collateral, TOKEN_DECIMALS),
            format_token_amount(self.total_collateral_value_usd, USD_VALUE_DECIMALS),
            format_health_factor(self.health_factor),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HealthStatus {
    /// Nothing minted, the engine reports the infinite sentinel
    NoDebt,
    Healthy,
    Liquidatable,
}

/// Classifies a health factor exactly as reported by the engine.
///
/// Strictly above 1.0 is healthy; 1.0 and below is liquidatable.
pub fn classify_health_factor(health_factor: U256) -> HealthStatus {
    if health_factor == INFINITE_HEALTH_FACTOR {
        HealthStatus::NoDebt
    } else if health_factor > LIQUIDATION_THRESHOLD {
        HealthStatus::Healthy
    } else {
        HealthStatus::Liquidatable
    }
}

/// Engine view of an arbitrary account, used before liquidating it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionReport {
    pub address: Address,
    pub health_factor: U256,
    pub min_health_factor: U256,
    pub total_dsc_minted: U256,
    pub collateral_value_usd: U256,
    /// The engine only liquidates below its minimum health factor
    pub liquidatable: bool,
}

/// Collateral a liquidator would receive for covering `debt_to_cover`.
/// Informational only; the engine decides the real payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiquidationPreview {
    pub collateral_token: Address,
    pub debt_to_cover: U256,
    pub base_collateral: U256,
    pub bonus_collateral: U256,
    pub total_collateral: U256,
    /// USD value of `total_collateral` at the engine's price feed
    pub total_collateral_value_usd: U256,
}
