//! Address validation and canonicalization
//!
//! Chain addresses are Starknet field elements written as `0x`-prefixed hex
//! and must stay below 2^251. Recipient keys are 32-byte social-protocol
//! public keys, hex with or without the `0x` prefix. Both are stored in one
//! canonical form: lowercase, `0x`-prefixed, zero-padded to 64 hex digits.

use thiserror::Error;

/// Number of hex digits in a canonical address
const CANONICAL_DIGITS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address contains non-hex characters")]
    NotHex,
    #[error("address is longer than 64 hex digits")]
    TooLong,
    #[error("address is zero")]
    Zero,
    #[error("address is outside the field range")]
    OutOfRange,
}

fn strip_prefix(raw: &str) -> Option<&str> {
    raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))
}

/// Validates the hex digits and returns them without leading zeros
fn significant_digits(digits: &str) -> Result<&str, AddressError> {
    if digits.is_empty() {
        return Err(AddressError::Empty);
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::NotHex);
    }
    if digits.len() > CANONICAL_DIGITS {
        return Err(AddressError::TooLong);
    }
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return Err(AddressError::Zero);
    }
    Ok(trimmed)
}

fn canonical(significant: &str) -> String {
    format!(
        "0x{:0>width$}",
        significant.to_ascii_lowercase(),
        width = CANONICAL_DIGITS
    )
}

/// Validates a chain (Starknet) address and returns its canonical form
pub fn canonical_chain_address(raw: &str) -> Result<String, AddressError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AddressError::Empty);
    }
    let digits = strip_prefix(raw).ok_or(AddressError::MissingPrefix)?;
    let significant = significant_digits(digits)?;

    // 2^251 is 0x8 followed by 62 zeros
    let in_range = significant.len() < 63
        || (significant.len() == 63 && significant.as_bytes()[0] < b'8');
    if !in_range {
        return Err(AddressError::OutOfRange);
    }

    Ok(canonical(significant))
}

/// Validates a recipient key and returns its canonical form
pub fn canonical_recipient_key(raw: &str) -> Result<String, AddressError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AddressError::Empty);
    }
    let digits = strip_prefix(raw).unwrap_or(raw);
    let significant = significant_digits(digits)?;
    Ok(canonical(significant))
}
