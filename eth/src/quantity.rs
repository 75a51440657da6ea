//! Numeric quantities as nodes encode them.
//!
//! Nodes send quantities as `0x`-prefixed hex strings, but some results
//! (`net_version` on most clients) are decimal strings and a few endpoints
//! answer with bare JSON numbers. Every parser here accepts all three.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// A string that is not a valid quantity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid quantity {0:?}")]
pub struct QuantityError(pub String);

fn split_radix(text: &str) -> (&str, u32) {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .map_or((text, 10), |digits| (digits, 16))
}

/// Parse a hex (`0x`-prefixed) or decimal quantity into a `u64`.
///
/// # Errors
///
/// Returns [`QuantityError`] for empty digits, invalid digits, or overflow.
pub fn parse_u64(text: &str) -> Result<u64, QuantityError> {
    let (digits, radix) = split_radix(text.trim());
    u64::from_str_radix(digits, radix).map_err(|_| QuantityError(text.to_string()))
}

/// Parse a hex (`0x`-prefixed) or decimal quantity into a `u128`.
///
/// # Errors
///
/// Returns [`QuantityError`] for empty digits, invalid digits, or overflow.
pub fn parse_u128(text: &str) -> Result<u128, QuantityError> {
    let (digits, radix) = split_radix(text.trim());
    u128::from_str_radix(digits, radix).map_err(|_| QuantityError(text.to_string()))
}

/// Encode a number as a `0x`-prefixed hex quantity.
#[must_use]
pub fn to_hex(value: u64) -> String {
    format!("{value:#x}")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Text(String),
    Number(u64),
}

/// `deserialize_with` target for required `u64` quantities.
pub(crate) fn quantity_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Repr::deserialize(deserializer)? {
        Repr::Text(text) => parse_u64(&text).map_err(serde::de::Error::custom),
        Repr::Number(n) => Ok(n),
    }
}

/// `deserialize_with` target for required `u128` quantities.
pub(crate) fn quantity_u128<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    match Repr::deserialize(deserializer)? {
        Repr::Text(text) => parse_u128(&text).map_err(serde::de::Error::custom),
        Repr::Number(n) => Ok(u128::from(n)),
    }
}

/// `deserialize_with` target for optional `u64` quantities. `null` and the
/// empty string both read as `None`.
pub(crate) fn quantity_opt_u64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    match Option::<Repr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Repr::Text(text)) if text.is_empty() => Ok(None),
        Some(Repr::Text(text)) => parse_u64(&text).map(Some).map_err(serde::de::Error::custom),
        Some(Repr::Number(n)) => Ok(Some(n)),
    }
}

/// `deserialize_with` target for optional `u128` quantities.
pub(crate) fn quantity_opt_u128<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u128>, D::Error> {
    match Option::<Repr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Repr::Text(text)) if text.is_empty() => Ok(None),
        Some(Repr::Text(text)) => parse_u128(&text).map(Some).map_err(serde::de::Error::custom),
        Some(Repr::Number(n)) => Ok(Some(u128::from(n))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_parse_hex_and_decimal() {
        assert_eq!(parse_u64("0x1"), Ok(1));
        assert_eq!(parse_u64("0x1388f58"), Ok(20_483_928));
        assert_eq!(parse_u64("0XfF"), Ok(255));
        assert_eq!(parse_u64("1"), Ok(1));
        assert_eq!(parse_u64("137"), Ok(137));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_u64("").is_err());
        assert!(parse_u64("0x").is_err());
        assert!(parse_u64("0xzz").is_err());
        assert!(parse_u64("-1").is_err());
        assert!(parse_u64("0x10000000000000000").is_err());
    }

    #[test]
    fn test_parse_u128_beyond_u64() {
        let wei = parse_u128("0x3635c9adc5dea00000").unwrap();
        assert_eq!(wei, 1_000_000_000_000_000_000_000);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(0), "0x0");
        assert_eq!(to_hex(20_455_000), "0x1381e58");
    }

    #[derive(Deserialize)]
    struct Fields {
        #[serde(deserialize_with = "quantity_u64")]
        a: u64,
        #[serde(default, deserialize_with = "quantity_opt_u128")]
        b: Option<u128>,
    }

    #[test]
    fn test_deserialize_forms() {
        let f: Fields = serde_json::from_value(json!({"a": "0x10", "b": "0x20"})).unwrap();
        assert_eq!((f.a, f.b), (16, Some(32)));

        let f: Fields = serde_json::from_value(json!({"a": 16, "b": null})).unwrap();
        assert_eq!((f.a, f.b), (16, None));

        let f: Fields = serde_json::from_value(json!({"a": "16"})).unwrap();
        assert_eq!((f.a, f.b), (16, None));

        assert!(serde_json::from_value::<Fields>(json!({"a": "0xq"})).is_err());
    }

    proptest! {
        #[test]
        fn prop_hex_round_trip(value in any::<u64>()) {
            prop_assert_eq!(parse_u64(&to_hex(value)), Ok(value));
        }
    }
}
