use alloy::{
    primitives::U256,
    sol_types::{decode_revert_reason, Revert, SolError, SolInterface},
};
use serde::Serialize;

use crate::{
    DSCEngine::DSCEngineErrors, DecentralizedStableCoin::DecentralizedStableCoinErrors,
    ERC20Errors::ERC20ErrorsErrors,
};

/// Known reasons a DSC transaction can revert with, mapped from the
/// contracts' custom errors. Anything else is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum RevertReason {
    #[error("would break minimum health factor")]
    BreaksHealthFactor { health_factor: Option<U256> },
    #[error("position is healthy, not liquidatable")]
    HealthFactorOk,
    #[error("liquidation did not improve the health factor")]
    HealthFactorNotImproved,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("insufficient allowance")]
    InsufficientAllowance,
    #[error("amount must be more than zero")]
    NeedsMoreThanZero,
    #[error("token is not allowed as collateral")]
    TokenNotAllowed,
    #[error("token transfer failed")]
    TransferFailed,
    #[error("stablecoin mint failed")]
    MintFailed,
    #[error("burn amount exceeds balance")]
    BurnAmountExceedsBalance,
    #[error("{0}")]
    Unrecognized(String),
}

// Substrings of error names as they show up in wallet / node messages
// when no revert data is attached.
const MESSAGE_PATTERNS: &[(&str, RevertReason)] = &[
    ("HealthFactorOk", RevertReason::HealthFactorOk),
    (
        "HealthFactorNotImproved",
        RevertReason::HealthFactorNotImproved,
    ),
    ("BurnAmountExceedsBalance", RevertReason::BurnAmountExceedsBalance),
    ("InsufficientBalance", RevertReason::InsufficientBalance),
    ("insufficient funds", RevertReason::InsufficientBalance),
    ("InsufficientAllowance", RevertReason::InsufficientAllowance),
    ("NeedsMoreThanZero", RevertReason::NeedsMoreThanZero),
    ("AmountMustBeMoreThanZero", RevertReason::NeedsMoreThanZero),
    ("NotAllowedToken", RevertReason::TokenNotAllowed),
    ("TransferFailed", RevertReason::TransferFailed),
    ("MintFailed", RevertReason::MintFailed),
];

/// Maps a revert to a known condition.
///
/// Revert data is tried first against the engine, stablecoin and ERC-20
/// error sets, then as a standard `Error(string)` / `Panic(uint256)`
/// payload. Without data, the node or wallet message is matched by error
/// name and otherwise returned as is.
pub fn decode_revert(data: Option<&[u8]>, message: &str) -> RevertReason {
    if let Some(data) = data.filter(|data| !data.is_empty()) {
        if let Some(reason) = decode_custom_error(data) {
            return reason;
        }
        if let Ok(revert) = Revert::abi_decode(data, false) {
            return match_message(&revert.reason)
                .unwrap_or(RevertReason::Unrecognized(revert.reason));
        }
        if let Some(reason) = decode_revert_reason(data) {
            return RevertReason::Unrecognized(reason);
        }
    }

    match_message(message).unwrap_or_else(|| RevertReason::Unrecognized(message.to_string()))
}

fn decode_custom_error(data: &[u8]) -> Option<RevertReason> {
    if let Ok(error) = DSCEngineErrors::abi_decode(data, false) {
        let reason = match error {
            DSCEngineErrors::DSCEngine__BreaksHealthFactor(inner) => {
                RevertReason::BreaksHealthFactor {
                    health_factor: Some(inner.healthFactorValue),
                }
            }
            DSCEngineErrors::DSCEngine__HealthFactorOk(_) => RevertReason::HealthFactorOk,
            DSCEngineErrors::DSCEngine__HealthFactorNotImproved(_) => {
                RevertReason::HealthFactorNotImproved
            }
            DSCEngineErrors::DSCEngine__NeedsMoreThanZero(_) => RevertReason::NeedsMoreThanZero,
            DSCEngineErrors::DSCEngine__NotAllowedToken(_) => RevertReason::TokenNotAllowed,
            DSCEngineErrors::DSCEngine__TransferFailed(_) => RevertReason::TransferFailed,
            DSCEngineErrors::DSCEngine__MintFailed(_) => RevertReason::MintFailed,
            DSCEngineErrors::DSCEngine__TokenAddressesAndPriceFeedAddressesAmountsDontMatch(_) => {
                RevertReason::Unrecognized(
                    "DSCEngine__TokenAddressesAndPriceFeedAddressesAmountsDontMatch".to_string(),
                )
            }
        };
        return Some(reason);
    }

    if let Ok(error) = DecentralizedStableCoinErrors::abi_decode(data, false) {
        let reason = match error {
            DecentralizedStableCoinErrors::DecentralizedStableCoin__AmountMustBeMoreThanZero(_) => {
                RevertReason::NeedsMoreThanZero
            }
            DecentralizedStableCoinErrors::DecentralizedStableCoin__BurnAmountExceedsBalance(_) => {
                RevertReason::BurnAmountExceedsBalance
            }
            DecentralizedStableCoinErrors::DecentralizedStableCoin__NotZeroAddress(_) => {
                RevertReason::Unrecognized("DecentralizedStableCoin__NotZeroAddress".to_string())
            }
        };
        return Some(reason);
    }

    ERC20ErrorsErrors::abi_decode(data, false)
        .ok()
        .map(|error| match error {
            ERC20ErrorsErrors::ERC20InsufficientBalance(_) => RevertReason::InsufficientBalance,
            ERC20ErrorsErrors::ERC20InsufficientAllowance(_) => RevertReason::InsufficientAllowance,
        })
}

fn match_message(message: &str) -> Option<RevertReason> {
    if message.contains("BreaksHealthFactor") {
        return Some(RevertReason::BreaksHealthFactor {
            health_factor: None,
        });
    }

    MESSAGE_PATTERNS
        .iter()
        .find(|(pattern, _)| message.contains(pattern))
        .map(|(_, reason)| reason.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DSCEngine, DecentralizedStableCoin, ERC20Errors};

    #[test]
    fn test_decode_engine_errors() {
        let data = DSCEngine::DSCEngine__HealthFactorOk {}.abi_encode();
        assert_eq!(
            decode_revert(Some(&data), "execution reverted"),
            RevertReason::HealthFactorOk
        );

        let data = DSCEngine::DSCEngine__BreaksHealthFactor {
            healthFactorValue: U256::from(5u64),
        }
        .abi_encode();
        assert_eq!(
            decode_revert(Some(&data), "execution reverted"),
            RevertReason::BreaksHealthFactor {
                health_factor: Some(U256::from(5u64))
            }
        );

        let data = DSCEngine::DSCEngine__NotAllowedToken {}.abi_encode();
        assert_eq!(
            decode_revert(Some(&data), ""),
            RevertReason::TokenNotAllowed
        );
    }

    #[test]
    fn test_decode_stablecoin_and_erc20_errors() {
        let data =
            DecentralizedStableCoin::DecentralizedStableCoin__BurnAmountExceedsBalance {}
                .abi_encode();
        assert_eq!(
            decode_revert(Some(&data), ""),
            RevertReason::BurnAmountExceedsBalance
        );

        let data = ERC20Errors::ERC20InsufficientBalance {
            sender: Default::default(),
            balance: U256::ZERO,
            needed: U256::from(1u64),
        }
        .abi_encode();
        assert_eq!(
            decode_revert(Some(&data), ""),
            RevertReason::InsufficientBalance
        );
    }

    #[test]
    fn test_decode_revert_string_passes_through() {
        let data = Revert {
            reason: "Ownable: caller is not the owner".to_string(),
        }
        .abi_encode();
        assert_eq!(
            decode_revert(Some(&data), "execution reverted"),
            RevertReason::Unrecognized("Ownable: caller is not the owner".to_string())
        );
    }

    #[test]
    fn test_decode_from_message() {
        assert_eq!(
            decode_revert(None, "execution reverted: DSCEngine__HealthFactorOk()"),
            RevertReason::HealthFactorOk
        );
        assert_eq!(
            decode_revert(None, "insufficient funds for gas * price + value"),
            RevertReason::InsufficientBalance
        );
        assert_eq!(
            decode_revert(None, "execution reverted: DSCEngine__BreaksHealthFactor(1)"),
            RevertReason::BreaksHealthFactor {
                health_factor: None
            }
        );
        assert_eq!(
            decode_revert(None, "nonce too low"),
            RevertReason::Unrecognized("nonce too low".to_string())
        );
    }

    #[test]
    fn test_reason_messages() {
        assert_eq!(
            RevertReason::HealthFactorOk.to_string(),
            "position is healthy, not liquidatable"
        );
        assert_eq!(
            RevertReason::BreaksHealthFactor {
                health_factor: None
            }
            .to_string(),
            "would break minimum health factor"
        );
    }
}
