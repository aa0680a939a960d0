//! Registry + decoder round through the bundled marketplace ABI.

use alloy_core::dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};
use chainwatch_core::{EventFingerprint, FromLog, NormalizedValue, RawLog, SchemaRegistry};
use chainwatch_evm::{EvmDecoder, MarketplaceEvent, Narrowing, MARKETPLACE_ABI};
use chainwatch_registry::MemoryRegistry;

const OWNER: &str = "0xabcdabcdabcdabcdabcdabcdabcdabcdabcdabcd";

fn uint_topic(v: U256) -> String {
    format!("0x{}", hex::encode(v.to_be_bytes::<32>()))
}

fn address_topic(addr: &str) -> String {
    format!("0x{:0>64}", addr.trim_start_matches("0x"))
}

fn registry() -> MemoryRegistry {
    MemoryRegistry::load_json(MARKETPLACE_ABI).unwrap()
}

#[test]
fn marketplace_fingerprints_are_indexed() {
    let reg = registry();
    assert_eq!(reg.len(), 3);
    for sig in [
        "TokenMinted(uint256,address,string)",
        "TokenListedForSale(uint256,uint256,address)",
        "TokenSold(uint256,address,uint256)",
    ] {
        let schema = reg.lookup(&EventFingerprint::of_signature(sig)).unwrap();
        assert_eq!(schema.signature, sig);
    }
    // Transfer(address,address,uint256) is not part of the contract
    let transfer = EventFingerprint::new(
        "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef",
    );
    assert!(reg.lookup(&transfer).is_none());
}

#[test]
fn token_minted_decodes_indexed_and_data_fields() {
    let reg = registry();
    let schema = reg.get_by_name("TokenMinted").unwrap();
    let raw = RawLog {
        address: "0x0165878A594ca255338adfa4d48449f69242Eb8F".into(),
        topics: vec![
            schema.fingerprint.as_hex().to_string(),
            uint_topic(U256::from(42u64)),
            address_topic(OWNER),
        ],
        data: DynSolValue::Tuple(vec![DynSolValue::String("ipfs://x".into())]).abi_encode_params(),
        block_number: Some(7),
        ..Default::default()
    };

    let decoded = EvmDecoder::new().decode(&raw, schema).unwrap();
    assert_eq!(decoded.event, "TokenMinted");
    assert_eq!(decoded.block_number, Some(7));
    let names: Vec<&str> = decoded.fields.keys().map(String::as_str).collect();
    assert_eq!(names, ["tokenId", "owner", "tokenURI"]);
    assert_eq!(decoded.fields["tokenId"], NormalizedValue::Uint(42));
    assert_eq!(decoded.fields["tokenURI"], NormalizedValue::Str("ipfs://x".into()));

    let event = MarketplaceEvent::from_log(decoded, &Narrowing::default())
        .unwrap()
        .unwrap();
    assert_eq!(
        event,
        MarketplaceEvent::TokenMinted {
            token_id: U256::from(42u64),
            owner: OWNER.parse::<Address>().unwrap(),
            token_uri: "ipfs://x".into(),
        }
    );
}

#[test]
fn wide_token_id_is_truncated_to_low_64_bits() {
    let reg = registry();
    let schema = reg.get_by_name("TokenSold").unwrap();
    let wide = (U256::from(0xdeadu64) << 64) | U256::from(9u64);
    let raw = RawLog {
        topics: vec![
            schema.fingerprint.as_hex().to_string(),
            uint_topic(wide),
            address_topic("0x3333333333333333333333333333333333333333"),
        ],
        data: DynSolValue::Tuple(vec![DynSolValue::Uint(U256::from(1500u64), 256)])
            .abi_encode_params(),
        ..Default::default()
    };

    let decoded = EvmDecoder::new().decode(&raw, schema).unwrap();
    let wrapped = MarketplaceEvent::from_log(decoded.clone(), &Narrowing::Wrapping)
        .unwrap()
        .unwrap();
    assert!(matches!(
        wrapped,
        MarketplaceEvent::TokenSold { token_id: 9, .. }
    ));

    assert!(MarketplaceEvent::from_log(decoded, &Narrowing::Checked).is_err());
}
