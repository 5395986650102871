use std::str::FromStr;

use alloy::primitives::U256;
use bridge_indexer_entity::bridge_transactions;
use chrono::NaiveDateTime;
use sea_orm::prelude::BigDecimal;

use crate::{
    registry::ChainContext,
    types::{DecodedHalf, InHalf, OutHalf},
};

/// Display enrichment of a half: token symbol and decimal-formatted value,
/// when the token is known on the observing chain. Always recomputed from the
/// raw value at write time, never read back from storage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenDisplay {
    pub symbol: Option<String>,
    pub formatted: Option<BigDecimal>,
}

/// `raw / 10^decimals`, exactly.
pub fn format_units(value: &U256, decimals: u8) -> BigDecimal {
    let raw = BigDecimal::from_str(&value.to_string()).expect("U256 renders as a decimal integer");
    let scale = BigDecimal::from_str(&format!("1e-{decimals}")).expect("valid scientific literal");
    raw * scale
}

/// Display fields for the half as seen from the chain that decoded it.
pub fn token_display(chain: &ChainContext, half: &DecodedHalf) -> TokenDisplay {
    let (token, value) = match half {
        DecodedHalf::Out(out) => (&out.sent_token, &out.sent_value),
        DecodedHalf::In(half) => (&half.received_token, &half.received_value),
    };

    match chain.token(token) {
        Some(meta) => TokenDisplay {
            symbol: Some(meta.symbol.clone()),
            formatted: Some(format_units(value, meta.decimals)),
        },
        None => TokenDisplay::default(),
    }
}

/// Merge a decoded half into the stored record, or start a fresh one.
///
/// Fields of the opposite, already-stored half are preserved; fields carried
/// by the incoming half always win, so a repeated observation of the same
/// side overwrites the earlier one. `pending` is recomputed from the merged
/// result.
pub fn merge_half(
    existing: Option<bridge_transactions::Model>,
    half: &DecodedHalf,
    display: &TokenDisplay,
    now: NaiveDateTime,
) -> bridge_transactions::Model {
    let mut record = existing.unwrap_or_else(|| empty_record(half, now));

    match half {
        DecodedHalf::Out(out) => apply_out(&mut record, out, display),
        DecodedHalf::In(half) => apply_in(&mut record, half, display),
    }

    record.pending = !record.is_complete();
    record.updated_at = now;
    record
}

fn empty_record(half: &DecodedHalf, now: NaiveDateTime) -> bridge_transactions::Model {
    bridge_transactions::Model {
        kappa: half.kappa().to_vec(),
        pending: true,
        from_tx_hash: None,
        to_tx_hash: None,
        from_address: None,
        to_address: Vec::new(),
        sent_value: None,
        received_value: None,
        sent_token: None,
        received_token: None,
        from_chain_id: None,
        to_chain_id: 0,
        sent_time: None,
        received_time: None,
        swap_success: None,
        sent_token_symbol: None,
        received_token_symbol: None,
        sent_value_formatted: None,
        received_value_formatted: None,
        created_at: now,
        updated_at: now,
    }
}

fn apply_out(record: &mut bridge_transactions::Model, out: &OutHalf, display: &TokenDisplay) {
    record.from_tx_hash = Some(out.from_tx_hash.to_vec());
    record.from_address = Some(out.from_address.to_vec());
    record.to_address = out.to_address.to_vec();
    record.sent_value = Some(out.sent_value.to_string());
    record.sent_token = Some(out.sent_token.to_vec());
    record.from_chain_id = Some(out.from_chain_id as i64);
    record.to_chain_id = out.to_chain_id as i64;
    record.sent_time = Some(out.sent_time as i64);
    record.sent_token_symbol = display.symbol.clone();
    record.sent_value_formatted = display.formatted.clone();
}

fn apply_in(record: &mut bridge_transactions::Model, half: &InHalf, display: &TokenDisplay) {
    record.to_tx_hash = Some(half.to_tx_hash.to_vec());
    record.to_address = half.to_address.to_vec();
    record.received_value = Some(half.received_value.to_string());
    record.received_token = Some(half.received_token.to_vec());
    record.to_chain_id = half.to_chain_id as i64;
    record.received_time = Some(half.received_time as i64);
    record.swap_success = half.swap_success;
    record.received_token_symbol = display.symbol.clone();
    record.received_value_formatted = display.formatted.clone();
}
