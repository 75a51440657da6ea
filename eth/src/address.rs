//! Mixed-case checksum encoding for 20-byte addresses (EIP-55).

use serde::{Deserialize, Deserializer};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Errors from [`to_checksum_address`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Not 40 hex digits, with or without a `0x` prefix
    #[error("Invalid address: {0:?}")]
    Invalid(String),
}

/// Re-case `address` so its letters encode its own Keccak-256 checksum.
///
/// Accepts 40 hex digits in any case, optionally `0x`-prefixed, and always
/// returns a `0x`-prefixed string.
///
/// # Errors
///
/// Returns [`AddressError::Invalid`] if `address` is not 40 hex digits.
///
/// # Example
///
/// ```
/// use batchrpc_eth::address::to_checksum_address;
///
/// let checksummed = to_checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed")?;
/// assert_eq!(checksummed, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
/// # Ok::<(), batchrpc_eth::address::AddressError>(())
/// ```
pub fn to_checksum_address(address: &str) -> Result<String, AddressError> {
    let digits = address.strip_prefix("0x").unwrap_or(address);
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::Invalid(address.to_string()));
    }

    let lower = digits.to_ascii_lowercase();
    let hash = hex::encode(Keccak256::digest(lower.as_bytes()));

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (c, h) in lower.chars().zip(hash.chars()) {
        // Hash digit 8..=f upper-cases the letter at the same position
        if h.to_digit(16).is_some_and(|nibble| nibble > 7) {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// `deserialize_with` target for required addresses.
pub(crate) fn checksummed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    to_checksum_address(&raw).map_err(serde::de::Error::custom)
}

/// `deserialize_with` target for optional addresses; `null` reads as
/// `None` (contract creation).
pub(crate) fn opt_checksummed<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|raw| to_checksum_address(&raw).map_err(serde::de::Error::custom))
        .transpose()
}
