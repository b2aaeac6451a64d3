use alloy::primitives::U256;

/// Decimals of the stablecoin and of the wrapped-native collateral token
pub const TOKEN_DECIMALS: u8 = 18;

pub const HEALTH_FACTOR_DECIMALS: u8 = 18;

pub const USD_VALUE_DECIMALS: u8 = 18;

/// 1.0 in 18-decimal fixed point. A health factor at or below this is liquidatable.
pub const LIQUIDATION_THRESHOLD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Returned by the engine for accounts without any minted DSC
pub const INFINITE_HEALTH_FACTOR: U256 = U256::MAX;

/// Health factors above this are shown as infinite
pub const DISPLAY_MAX_HEALTH_FACTOR: f64 = 1_000_000.0;
