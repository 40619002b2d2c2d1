// Position sizing and price levels for an accepted signal

use std::collections::BTreeMap;

use chrono::Utc;
use thiserror::Error;

use crate::precision::truncate;
use crate::types::{Instrument, Signal, TradeDirection, TradeParams};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingRules {
    pub lot_fraction: f64,
    pub risk_reward: f64,
    pub trade_notional: f64,
    pub price_precision: u32,
    pub quantity_precision: u32,
}

/// Why a signal never reached the order service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SizingRejection {
    #[error("entry price {0} is not a positive finite number")]
    InvalidEntry(f64),

    #[error("position size {0} truncates to nothing")]
    EmptySize(f64),

    #[error("levels collapse onto entry {entry} (take profit {take_profit}, stop loss {stop_loss})")]
    SameLevels {
        entry: f64,
        take_profit: f64,
        stop_loss: f64,
    },
}

/// Turn a signal into a fully priced, exchange-precision trade.
///
/// stop distance = entry / lot fraction, target distance = stop distance × risk:reward,
/// size = notional × lot fraction / entry. Every price and the size are truncated
/// to the instrument's precision before the level checks run.
pub fn size_trade(
    instrument: &Instrument,
    signal: Signal,
    rules: &SizingRules,
    indicators: BTreeMap<String, f64>,
) -> Result<TradeParams, SizingRejection> {
    let raw_entry = signal.entry;
    if !raw_entry.is_finite() || raw_entry <= 0.0 {
        return Err(SizingRejection::InvalidEntry(raw_entry));
    }

    let stop_distance = raw_entry / rules.lot_fraction;
    let target_distance = stop_distance * rules.risk_reward;

    let (take_profit, stop_loss) = match signal.direction {
        TradeDirection::Long => (raw_entry + target_distance, raw_entry - stop_distance),
        TradeDirection::Short => (raw_entry - target_distance, raw_entry + stop_distance),
    };
    let size = (1.0 / raw_entry) * rules.trade_notional * rules.lot_fraction;

    let params = TradeParams {
        instrument: instrument.clone(),
        direction: signal.direction,
        entry: truncate(raw_entry, rules.price_precision),
        take_profit: truncate(take_profit, rules.price_precision),
        stop_loss: truncate(stop_loss, rules.price_precision),
        size: truncate(size, rules.quantity_precision),
        order_id: None,
        created_at: Utc::now(),
        indicators,
    };

    if !params.size.is_finite() || params.size <= 0.0 {
        return Err(SizingRejection::EmptySize(size));
    }

    if !params.has_distinct_levels() {
        return Err(SizingRejection::SameLevels {
            entry: params.entry,
            take_profit: params.take_profit,
            stop_loss: params.stop_loss,
        });
    }

    Ok(params)
}
