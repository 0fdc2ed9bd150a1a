//! Conversion between human-readable decimal amounts and token base units.

use crate::error::{ClientError, Result};
use ethers::types::U256;

/// Amount string meaning "the whole balance/debt"
pub const MAX_AMOUNT_SENTINEL: &str = "-1";

/// Protocol sentinel for "everything"
pub const MAX_UINT_AMOUNT: U256 = U256::MAX;

/// Flash-loan padding, in percent
pub const SURPLUS: &str = "0.05";

// SURPLUS expressed as a fraction of 10_000 so padding stays in integers.
const SURPLUS_NUMERATOR: u64 = 5;
const SURPLUS_DENOMINATOR: u64 = 10_000;

/// Whether `amount` is the "-1" max sentinel
pub fn is_max_sentinel(amount: &str) -> bool {
    amount == MAX_AMOUNT_SENTINEL
}

/// Convert a decimal string to base units for a token with `decimals`.
///
/// Rejects signs, exponents, empty integer or fraction parts, more fractional
/// digits than the token supports, and values above `U256::MAX`.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256> {
    let invalid = |reason: &str| ClientError::InvalidAmount(format!("{:?}: {}", amount, reason));

    let (integer, fraction) = match amount.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (amount, ""),
    };

    if integer.is_empty() || !integer.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("not a non-negative decimal number"));
    }
    if amount.contains('.') && fraction.is_empty() {
        return Err(invalid("missing fractional digits"));
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("not a non-negative decimal number"));
    }
    if fraction.len() > decimals as usize {
        return Err(invalid(&format!(
            "more than {} fractional digits",
            decimals
        )));
    }

    let padding = "0".repeat(decimals as usize - fraction.len());
    let digits = format!("{}{}{}", integer, fraction, padding);

    U256::from_dec_str(&digits).map_err(|_| invalid("exceeds the maximum representable amount"))
}

/// Convert a request amount, mapping the "-1" sentinel to [`MAX_UINT_AMOUNT`]
pub fn convert_amount(amount: &str, decimals: u8) -> Result<U256> {
    if is_max_sentinel(amount) {
        return Ok(MAX_UINT_AMOUNT);
    }
    to_base_units(amount, decimals)
}

/// Format base units back into a decimal string without trailing zeros
pub fn format_base_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;

    let (integer, fraction) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
    };

    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer
    } else {
        format!("{}.{}", integer, fraction)
    }
}

/// Pad a flash-loan amount by [`SURPLUS`] percent
pub fn with_surplus(amount: U256) -> U256 {
    let surplus = amount / U256::from(SURPLUS_DENOMINATOR) * U256::from(SURPLUS_NUMERATOR)
        + amount % U256::from(SURPLUS_DENOMINATOR) * U256::from(SURPLUS_NUMERATOR)
            / U256::from(SURPLUS_DENOMINATOR);
    amount.saturating_add(surplus)
}
