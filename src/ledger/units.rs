// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversion between human-readable decimal amounts and integer base units.
//!
//! The ledger's native asset is subdivided into 10^9 base units. All
//! financial arithmetic in this crate happens on the integer side; decimal
//! strings exist only at the API boundary.

/// Number of decimal places of the native asset (1 unit = 10^9 base units).
pub const NATIVE_DECIMALS: u8 = 9;

/// Errors from decimal-amount parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Malformed amount: {0}")]
    Malformed(String),

    #[error("Amount must be greater than zero")]
    NotPositive,

    #[error("Amount rounds to zero base units")]
    TooSmall,
}

/// Parse a human-readable decimal amount to base units.
///
/// Excess fractional digits are truncated (round toward zero). An amount
/// that is positive as written but truncates to zero base units is rejected
/// with [`AmountError::TooSmall`]; zero and negative amounts are rejected
/// with [`AmountError::NotPositive`].
pub fn parse_amount(amount: &str, decimals: u8) -> Result<u64, AmountError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Malformed("empty amount".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(AmountError::NotPositive);
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() > 2 {
        return Err(AmountError::Malformed("too many decimal points".to_string()));
    }

    let whole = parts[0]
        .parse::<u128>()
        .map_err(|_| AmountError::Malformed("invalid whole number".to_string()))?;

    let frac_str = if parts.len() == 2 { parts[1] } else { "" };
    if !frac_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountError::Malformed("invalid decimal part".to_string()));
    }

    // Round toward zero: keep at most `decimals` fractional digits.
    let kept = &frac_str[..frac_str.len().min(decimals as usize)];
    let decimal_part = if kept.is_empty() {
        0u128
    } else {
        let padded = format!("{:0<width$}", kept, width = decimals as usize);
        padded
            .parse::<u128>()
            .map_err(|_| AmountError::Malformed("invalid decimal part".to_string()))?
    };

    let multiplier = 10u128.pow(decimals as u32);
    let total = whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or_else(|| AmountError::Malformed("amount overflow".to_string()))?;

    if total == 0 {
        let truncated_nonzero = frac_str.chars().any(|c| c != '0');
        return if truncated_nonzero {
            Err(AmountError::TooSmall)
        } else {
            Err(AmountError::NotPositive)
        };
    }

    u64::try_from(total).map_err(|_| AmountError::Malformed("amount overflow".to_string()))
}

/// Format base units as a human-readable decimal amount.
pub fn format_amount(amount: u64, decimals: u8) -> String {
    if amount == 0 {
        return "0".to_string();
    }

    let divisor = 10u64.pow(decimals as u32);
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder == 0 {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_whole() {
        let result = parse_amount("1", NATIVE_DECIMALS).unwrap();
        assert_eq!(result, 1_000_000_000);
    }

    #[test]
    fn parse_amount_decimal() {
        let result = parse_amount("1.5", NATIVE_DECIMALS).unwrap();
        assert_eq!(result, 1_500_000_000);
    }

    #[test]
    fn parse_amount_small() {
        let result = parse_amount("0.000000001", NATIVE_DECIMALS).unwrap();
        assert_eq!(result, 1);
    }

    #[test]
    fn parse_amount_truncates_toward_zero() {
        // The tenth fractional digit is below one base unit and is dropped.
        let result = parse_amount("0.1234567899", NATIVE_DECIMALS).unwrap();
        assert_eq!(result, 123_456_789);
    }

    #[test]
    fn parse_amount_rejects_sub_base_unit() {
        let result = parse_amount("0.0000000001", NATIVE_DECIMALS);
        assert_eq!(result, Err(AmountError::TooSmall));
    }

    #[test]
    fn parse_amount_rejects_zero_and_negative() {
        assert_eq!(parse_amount("0", NATIVE_DECIMALS), Err(AmountError::NotPositive));
        assert_eq!(parse_amount("0.0", NATIVE_DECIMALS), Err(AmountError::NotPositive));
        assert_eq!(parse_amount("-1", NATIVE_DECIMALS), Err(AmountError::NotPositive));
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        assert!(matches!(
            parse_amount("abc", NATIVE_DECIMALS),
            Err(AmountError::Malformed(_))
        ));
        assert!(matches!(
            parse_amount("1.2.3", NATIVE_DECIMALS),
            Err(AmountError::Malformed(_))
        ));
        assert!(matches!(
            parse_amount("", NATIVE_DECIMALS),
            Err(AmountError::Malformed(_))
        ));
    }

    #[test]
    fn format_amount_basic() {
        assert_eq!(format_amount(1_000_000_000, NATIVE_DECIMALS), "1");
        assert_eq!(format_amount(1_500_000_000, NATIVE_DECIMALS), "1.5");
        assert_eq!(format_amount(0, NATIVE_DECIMALS), "0");
        assert_eq!(format_amount(1, NATIVE_DECIMALS), "0.000000001");
    }

    #[test]
    fn parse_format_round_trip() {
        for input in ["0.5", "1", "12.345678901"] {
            let base = parse_amount(input, NATIVE_DECIMALS).unwrap();
            let parsed_again = parse_amount(&format_amount(base, NATIVE_DECIMALS), NATIVE_DECIMALS).unwrap();
            assert_eq!(base, parsed_again);
        }
    }
}
