//! Converts alloy values into ChainWatch `NormalizedValue`s.

use alloy_core::dyn_abi::DynSolValue;
use alloy_primitives::{I256, U256};
use chainwatch_core::types::NormalizedValue;

/// Convert a decoded `DynSolValue` into a `NormalizedValue`.
pub fn normalize(val: DynSolValue) -> NormalizedValue {
    match val {
        DynSolValue::Bool(b) => NormalizedValue::Bool(b),

        DynSolValue::Int(i, _bits) => normalize_int(i),

        DynSolValue::Uint(u, _bits) => normalize_uint(u),

        DynSolValue::FixedBytes(word, size) => NormalizedValue::Bytes(word[..size].to_vec()),

        DynSolValue::Bytes(b) => NormalizedValue::Bytes(b),

        DynSolValue::String(s) => NormalizedValue::Str(s),

        DynSolValue::Address(a) => NormalizedValue::Address(a.to_checksum(None)),

        DynSolValue::Array(vals) | DynSolValue::FixedArray(vals) => {
            NormalizedValue::Array(vals.into_iter().map(normalize).collect())
        }

        DynSolValue::Tuple(vals) => {
            NormalizedValue::Tuple(vals.into_iter().map(normalize).collect())
        }

        // Function pointers (address + selector) fall back to bytes
        DynSolValue::Function(f) => NormalizedValue::Bytes(f.to_vec()),
    }
}

/// Small values stay numeric; anything beyond u128 becomes a decimal string.
pub fn normalize_uint(u: U256) -> NormalizedValue {
    match u128::try_from(u) {
        Ok(v) => NormalizedValue::Uint(v),
        Err(_) => NormalizedValue::BigUint(u.to_string()),
    }
}

pub fn normalize_int(i: I256) -> NormalizedValue {
    match i128::try_from(i) {
        Ok(v) => NormalizedValue::Int(v),
        Err(_) => NormalizedValue::BigInt(i.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    #[test]
    fn normalize_bool() {
        assert_eq!(normalize(DynSolValue::Bool(true)), NormalizedValue::Bool(true));
    }

    #[test]
    fn normalize_uint256_small() {
        let v = normalize(DynSolValue::Uint(U256::from(42u64), 256));
        assert_eq!(v, NormalizedValue::Uint(42));
    }

    #[test]
    fn normalize_uint256_large() {
        let v = normalize(DynSolValue::Uint(U256::MAX, 256));
        assert_eq!(
            v,
            NormalizedValue::BigUint(
                "115792089237316195423570985008687907853269984665640564039457584007913129639935"
                    .into()
            )
        );
    }

    #[test]
    fn normalize_negative_int() {
        let v = normalize(DynSolValue::Int(I256::try_from(-5i64).unwrap(), 24));
        assert_eq!(v, NormalizedValue::Int(-5));
    }

    #[test]
    fn normalize_address_is_checksummed() {
        let addr: Address = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045".parse().unwrap();
        let v = normalize(DynSolValue::Address(addr));
        assert_eq!(
            v.as_address(),
            Some("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")
        );
    }
}
