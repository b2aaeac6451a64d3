use alloy::primitives::{
    utils::{format_units, parse_units, ParseUnits},
    U256,
};

use crate::{
    errors::ValidationError,
    utils::constants::{DISPLAY_MAX_HEALTH_FACTOR, HEALTH_FACTOR_DECIMALS},
};

/// Converts a fixed-point value to `f64` for display. Values that do not fit
/// saturate to `f64::MAX`.
pub fn divide_by_precision_f64(value: U256, precision: u8) -> f64 {
    let scale = U256::from(10).pow(U256::from(precision));

    let (Some(quotient), Some(remainder)) = (value.checked_div(scale), value.checked_rem(scale))
    else {
        return f64::MAX;
    };

    let (Ok(quotient), Ok(remainder), Ok(scale)) = (
        u128::try_from(quotient),
        u128::try_from(remainder),
        u128::try_from(scale),
    ) else {
        return f64::MAX;
    };

    quotient as f64 + (remainder as f64) / (scale as f64)
}

/// Parses a user-entered decimal amount into base units.
///
/// Rejects empty input, anything `parse_units` does not accept, negatives and zero.
pub fn parse_amount(input: &str, decimals: u8) -> Result<U256, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    if trimmed.starts_with('-') {
        return Err(ValidationError::NotPositive(trimmed.to_string()));
    }

    match parse_units(trimmed, decimals) {
        Ok(ParseUnits::U256(_)) => {}
        Ok(ParseUnits::I256(_)) => return Err(ValidationError::NotPositive(trimmed.to_string())),
        Err(_) => return Err(ValidationError::Invalid(trimmed.to_string())),
    }

    // parse_units wraps on overflow, so the scaling is redone with checked math
    let amount = scale_checked(trimmed, decimals)
        .ok_or_else(|| ValidationError::Invalid(trimmed.to_string()))?;

    if amount.is_zero() {
        return Err(ValidationError::NotPositive(trimmed.to_string()));
    }

    Ok(amount)
}

/// `whole * 10^decimals + fraction`, or `None` when it does not fit in a `U256`
fn scale_checked(amount: &str, decimals: u8) -> Option<U256> {
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let whole = whole.trim_start_matches('+');

    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).ok()?
    };
    let fraction = if fraction.is_empty() {
        U256::ZERO
    } else {
        match parse_units(&format!("0.{}", fraction), decimals).ok()? {
            ParseUnits::U256(fraction) => fraction,
            ParseUnits::I256(_) => return None,
        }
    };

    let scale = U256::from(10).checked_pow(U256::from(decimals))?;
    whole.checked_mul(scale)?.checked_add(fraction)
}

/// Formats base units as a decimal string, e.g. `1500000000000000000` -> `1.500000000000000000`
pub fn format_token_amount(value: U256, decimals: u8) -> String {
    format_units(value, decimals).unwrap_or_else(|_| value.to_string())
}

pub fn format_health_factor(health_factor: U256) -> String {
    if health_factor.is_zero() {
        return "0.000".to_string();
    }

    let factor = divide_by_precision_f64(health_factor, HEALTH_FACTOR_DECIMALS);
    if factor > DISPLAY_MAX_HEALTH_FACTOR {
        "∞".to_string()
    } else {
        format!("{:.3}", factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::{INFINITE_HEALTH_FACTOR, TOKEN_DECIMALS};

    fn ether(value: u64) -> U256 {
        U256::from(value) * U256::from(10).pow(U256::from(18))
    }

    #[test]
    fn test_divide_by_precision_f64() {
        assert_eq!(divide_by_precision_f64(ether(3), 18), 3.0);
        assert_eq!(
            divide_by_precision_f64(U256::from(1_500_000_000_000_000_000u64), 18),
            1.5
        );
        assert_eq!(divide_by_precision_f64(U256::MAX, 0), f64::MAX);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("10", TOKEN_DECIMALS).unwrap(), ether(10));
        assert_eq!(
            parse_amount(" 0.5 ", TOKEN_DECIMALS).unwrap(),
            U256::from(500_000_000_000_000_000u64)
        );
    }

    #[test]
    fn test_parse_amount_rejects_bad_input() {
        assert_eq!(parse_amount("", TOKEN_DECIMALS), Err(ValidationError::Empty));
        assert_eq!(parse_amount("   ", TOKEN_DECIMALS), Err(ValidationError::Empty));
        assert_eq!(
            parse_amount("0", TOKEN_DECIMALS),
            Err(ValidationError::NotPositive("0".to_string()))
        );
        assert_eq!(
            parse_amount("0.000", TOKEN_DECIMALS),
            Err(ValidationError::NotPositive("0.000".to_string()))
        );
        assert_eq!(
            parse_amount("-1", TOKEN_DECIMALS),
            Err(ValidationError::NotPositive("-1".to_string()))
        );
        assert_eq!(
            parse_amount("ten", TOKEN_DECIMALS),
            Err(ValidationError::Invalid("ten".to_string()))
        );
    }

    #[test]
    fn test_parse_amount_rejects_overflow() {
        let huge = format!("1{}", "0".repeat(70));
        assert_eq!(
            parse_amount(&huge, TOKEN_DECIMALS),
            Err(ValidationError::Invalid(huge.clone()))
        );

        let max = U256::MAX.to_string();
        assert_eq!(
            parse_amount(&max, TOKEN_DECIMALS),
            Err(ValidationError::Invalid(max.clone()))
        );

        let largest_whole = (U256::MAX / ether(1)).to_string();
        assert_eq!(
            parse_amount(&largest_whole, TOKEN_DECIMALS),
            Ok(U256::MAX / ether(1) * ether(1))
        );
    }

    #[test]
    fn test_format_health_factor() {
        assert_eq!(format_health_factor(U256::ZERO), "0.000");
        assert_eq!(
            format_health_factor(U256::from(1_200_000_000_000_000_000u64)),
            "1.200"
        );
        assert_eq!(format_health_factor(INFINITE_HEALTH_FACTOR), "∞");
    }

    #[test]
    fn test_format_token_amount() {
        assert_eq!(
            format_token_amount(ether(4), TOKEN_DECIMALS),
            "4.000000000000000000"
        );
    }
}
