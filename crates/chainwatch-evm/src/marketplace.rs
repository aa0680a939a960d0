//! Typed projection of the NFT marketplace events.
//!
//! The bundled ABI declares `TokenMinted`, `TokenListedForSale` and
//! `TokenSold`. Listing and sale token IDs are reported as `u64`; the
//! `uint256` topic value is narrowed according to [`Narrowing`].

use alloy_primitives::{Address, U256};
use chainwatch_core::{
    error::DecodeError,
    event::{DecodedLog, FromLog},
    types::NormalizedValue,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ABI of the marketplace contract's events.
pub const MARKETPLACE_ABI: &str = include_str!("../abi/marketplace.json");

/// How a 256-bit token ID is narrowed to 64 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Narrowing {
    /// Keep the low 64 bits and silently drop the rest.
    #[default]
    Wrapping,
    /// Reject values above `u64::MAX` with `DecodeError::Overflow`.
    Checked,
}

/// A decoded marketplace event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketplaceEvent {
    TokenMinted {
        token_id: U256,
        owner: Address,
        token_uri: String,
    },
    TokenListedForSale {
        token_id: u64,
        price: U256,
        seller: Address,
    },
    TokenSold {
        token_id: u64,
        buyer: Address,
        price: U256,
    },
}

impl MarketplaceEvent {
    /// Event name as declared in the ABI.
    pub fn kind(&self) -> &'static str {
        match self {
            MarketplaceEvent::TokenMinted { .. } => "TokenMinted",
            MarketplaceEvent::TokenListedForSale { .. } => "TokenListedForSale",
            MarketplaceEvent::TokenSold { .. } => "TokenSold",
        }
    }
}

impl FromLog for MarketplaceEvent {
    type Options = Narrowing;

    fn from_log(log: DecodedLog, narrowing: &Narrowing) -> Result<Option<Self>, DecodeError> {
        let event = match log.event.as_str() {
            "TokenMinted" => MarketplaceEvent::TokenMinted {
                token_id: uint_field(&log, "tokenId")?,
                owner: address_field(&log, "owner")?,
                token_uri: string_field(&log, "tokenURI")?,
            },
            "TokenListedForSale" => MarketplaceEvent::TokenListedForSale {
                token_id: narrow_u64(uint_field(&log, "tokenId")?, "tokenId", *narrowing)?,
                price: uint_field(&log, "price")?,
                seller: address_field(&log, "seller")?,
            },
            "TokenSold" => MarketplaceEvent::TokenSold {
                token_id: narrow_u64(uint_field(&log, "tokenId")?, "tokenId", *narrowing)?,
                buyer: address_field(&log, "buyer")?,
                price: uint_field(&log, "price")?,
            },
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

impl fmt::Display for MarketplaceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketplaceEvent::TokenMinted {
                token_id,
                owner,
                token_uri,
            } => write!(
                f,
                "Token Minted: TokenId={token_id}, Owner={}, TokenURI={token_uri}",
                owner.to_checksum(None)
            ),
            MarketplaceEvent::TokenListedForSale {
                token_id,
                price,
                seller,
            } => write!(
                f,
                "Token Listed For Sale: TokenId={token_id}, Price={price}, Seller={}",
                seller.to_checksum(None)
            ),
            MarketplaceEvent::TokenSold {
                token_id,
                buyer,
                price,
            } => write!(
                f,
                "Token Sold: TokenId={token_id}, Buyer={}, Price={price}",
                buyer.to_checksum(None)
            ),
        }
    }
}

fn mismatch(field: &str, expected: &str, got: &NormalizedValue) -> DecodeError {
    DecodeError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        got: got.kind().to_string(),
    }
}

fn uint_field(log: &DecodedLog, name: &str) -> Result<U256, DecodeError> {
    match log.require(name)? {
        NormalizedValue::Uint(v) => Ok(U256::from(*v)),
        NormalizedValue::BigUint(s) => U256::from_str_radix(s, 10).map_err(|e| {
            DecodeError::TypeMismatch {
                field: name.to_string(),
                expected: "uint".into(),
                got: format!("unparseable decimal '{s}': {e}"),
            }
        }),
        other => Err(mismatch(name, "uint", other)),
    }
}

fn address_field(log: &DecodedLog, name: &str) -> Result<Address, DecodeError> {
    match log.require(name)? {
        NormalizedValue::Address(s) => s.parse::<Address>().map_err(|e| {
            DecodeError::TypeMismatch {
                field: name.to_string(),
                expected: "address".into(),
                got: format!("'{s}': {e}"),
            }
        }),
        other => Err(mismatch(name, "address", other)),
    }
}

fn string_field(log: &DecodedLog, name: &str) -> Result<String, DecodeError> {
    match log.require(name)? {
        NormalizedValue::Str(s) => Ok(s.clone()),
        other => Err(mismatch(name, "string", other)),
    }
}

fn narrow_u64(value: U256, field: &str, narrowing: Narrowing) -> Result<u64, DecodeError> {
    match narrowing {
        Narrowing::Wrapping => Ok(value.as_limbs()[0]),
        Narrowing::Checked => u64::try_from(value).map_err(|_| DecodeError::Overflow {
            field: field.to_string(),
            bits: 64,
            value: value.to_string(),
        }),
    }
}
