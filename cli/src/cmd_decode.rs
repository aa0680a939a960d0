//! `chainwatch decode-log` and `chainwatch events` — offline registry tools.

use anyhow::{anyhow, Context, Result};
use chainwatch_core::{FromLog, RawLog, SchemaRegistry};
use chainwatch_evm::{EvmDecoder, MarketplaceEvent, Narrowing};
use std::path::Path;

pub fn decode_log(topics: &[String], data: &str, abi: Option<&Path>, as_json: bool) -> Result<()> {
    let registry = crate::load_registry(abi)?;

    let raw = RawLog {
        topics: topics.to_vec(),
        data: hex::decode(data.strip_prefix("0x").unwrap_or(data)).context("invalid data hex")?,
        ..Default::default()
    };

    let decoder = EvmDecoder::new();
    let fp = decoder
        .fingerprint(&raw)
        .ok_or_else(|| anyhow!("topics[0] must be a 32-byte hex signature hash"))?;
    let schema = registry
        .lookup(&fp)
        .ok_or_else(|| anyhow!("no event in the ABI has fingerprint {fp}"))?;

    let decoded = decoder.decode(&raw, schema)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
        return Ok(());
    }

    println!("Event:       {}", decoded.event);
    println!("Signature:   {}", schema.signature);
    println!("Fingerprint: {}", decoded.fingerprint);
    println!("Fields:");
    for (name, value) in &decoded.fields {
        println!("  {name}: {value}");
    }
    if let Some(event) = MarketplaceEvent::from_log(decoded, &Narrowing::default())? {
        println!();
        println!("{event}");
    }
    Ok(())
}

pub fn list_events(abi: Option<&Path>) -> Result<()> {
    let registry = crate::load_registry(abi)?;

    println!("{} event(s)", registry.len());
    for schema in registry.schemas() {
        let anonymous = if schema.anonymous { " [anonymous]" } else { "" };
        println!();
        println!("{}{}", schema.name, anonymous);
        println!("  Signature:   {}", schema.signature);
        println!("  Fingerprint: {}", schema.fingerprint);
        for field in schema.params() {
            let indexed = if schema.indexed.contains(field) {
                " [indexed]"
            } else {
                ""
            };
            println!("    - {}: {}{}", field.name, field.ty, indexed);
        }
    }
    Ok(())
}
