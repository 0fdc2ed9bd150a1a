//! Precondition checks run at the top of every public builder operation.
//!
//! All checks are synchronous and happen before any network read.

use crate::amount::is_max_sentinel;
use crate::error::{ClientError, Result};
use ethers::types::Address;
use ethers::utils::to_checksum;
use std::str::FromStr;

/// Parse a required `0x`-prefixed address.
///
/// Mixed-case input must carry a valid EIP-55 checksum; all-lowercase and
/// all-uppercase hex are accepted as is.
pub fn require_address(field: &str, value: &str) -> Result<Address> {
    let hex_part = value
        .strip_prefix("0x")
        .ok_or_else(|| ClientError::validation(field, "address must start with 0x"))?;

    let address = Address::from_str(value)
        .map_err(|_| ClientError::validation(field, format!("{:?} is not a valid address", value)))?;

    let mixed_case = hex_part.bytes().any(|b| b.is_ascii_lowercase())
        && hex_part.bytes().any(|b| b.is_ascii_uppercase());
    if mixed_case && to_checksum(&address, None) != value {
        return Err(ClientError::validation(
            field,
            format!("{:?} has an invalid checksum", value),
        ));
    }

    Ok(address)
}

/// Parse an optional address, defaulting to `fallback` when absent
pub fn optional_address(field: &str, value: Option<&str>, fallback: Address) -> Result<Address> {
    match value {
        Some(value) => require_address(field, value),
        None => Ok(fallback),
    }
}

/// Parse a list of addresses
pub fn require_addresses(field: &str, values: &[String]) -> Result<Vec<Address>> {
    values
        .iter()
        .map(|value| require_address(field, value))
        .collect()
}

fn parse_decimal(field: &str, value: &str) -> Result<f64> {
    let well_formed = !value.is_empty()
        && value
            .trim_start_matches('-')
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b'.')
        && value.matches('.').count() <= 1;

    if !well_formed {
        return Err(ClientError::validation(
            field,
            format!("{:?} is not a number", value),
        ));
    }

    value
        .parse::<f64>()
        .map_err(|_| ClientError::validation(field, format!("{:?} is not a number", value)))
}

/// Amount must be strictly greater than zero
pub fn require_positive_amount(field: &str, value: &str) -> Result<()> {
    if parse_decimal(field, value)? > 0.0 {
        Ok(())
    } else {
        Err(ClientError::validation(field, "amount must be positive"))
    }
}

/// Amount must be strictly positive or the "-1" max sentinel
pub fn require_positive_or_max(field: &str, value: &str) -> Result<()> {
    if is_max_sentinel(value) {
        return Ok(());
    }
    if parse_decimal(field, value)? > 0.0 {
        Ok(())
    } else {
        Err(ClientError::validation(
            field,
            "amount must be positive or -1",
        ))
    }
}
