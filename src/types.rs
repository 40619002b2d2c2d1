// Common types used across the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque key identifying a tradable pair (e.g. `BTCUSDT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instrument(String);

impl Instrument {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Instrument {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for Instrument {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// One OHLCV bar. `indicators` holds values attached by the indicator pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub instrument: Instrument,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Open time of the bar in milliseconds since the epoch
    pub time: i64,
    /// False while the bar is still forming
    pub closed: bool,
    #[serde(default)]
    pub indicators: BTreeMap<String, f64>,
}

impl Candle {
    pub fn new(
        instrument: impl Into<Instrument>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        time: i64,
        closed: bool,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            open,
            high,
            low,
            close,
            volume,
            time,
            closed,
            indicators: BTreeMap::new(),
        }
    }

    pub fn is_up(&self) -> bool {
        self.close > self.open
    }

    /// Indicator value by name; `None` means "not yet decidable", never zero.
    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Long => "long",
            TradeDirection::Short => "short",
        }
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a strategy proposes: a side and the price to enter at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub direction: TradeDirection,
    pub entry: f64,
}

impl Signal {
    pub fn long(entry: f64) -> Self {
        Self { direction: TradeDirection::Long, entry }
    }

    pub fn short(entry: f64) -> Self {
        Self { direction: TradeDirection::Short, entry }
    }
}

/// An open (or about to be opened) position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeParams {
    pub instrument: Instrument,
    pub direction: TradeDirection,
    pub entry: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub size: f64,
    /// Assigned by the order service once the order is accepted
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Indicator values of the candle that justified the entry
    pub indicators: BTreeMap<String, f64>,
}

impl TradeParams {
    /// A position that opens and closes at the same price is meaningless.
    pub fn has_distinct_levels(&self) -> bool {
        self.entry != self.take_profit && self.entry != self.stop_loss
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    TakeProfit,
    StopLoss,
}

impl CloseReason {
    pub fn is_stop_loss(&self) -> bool {
        matches!(self, CloseReason::StopLoss)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::TakeProfit => f.write_str("take profit"),
            CloseReason::StopLoss => f.write_str("stop loss"),
        }
    }
}

/// Transient record used to drive a close call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellParams {
    pub instrument: Instrument,
    pub direction: TradeDirection,
    pub reason: CloseReason,
    pub exit: f64,
    /// Realized price delta in the position's favour
    pub delta: f64,
    pub size: f64,
    pub order_id: Option<String>,
}

impl SellParams {
    pub fn for_position(position: &TradeParams, reason: CloseReason, exit: f64) -> Self {
        let delta = match position.direction {
            TradeDirection::Long => exit - position.entry,
            TradeDirection::Short => position.entry - exit,
        };

        Self {
            instrument: position.instrument.clone(),
            direction: position.direction,
            reason,
            exit,
            delta,
            size: position.size,
            order_id: position.order_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(direction: TradeDirection) -> TradeParams {
        TradeParams {
            instrument: Instrument::from("BTCUSDT"),
            direction,
            entry: 100.0,
            take_profit: 110.0,
            stop_loss: 95.0,
            size: 0.5,
            order_id: Some("42".to_string()),
            created_at: Utc::now(),
            indicators: BTreeMap::new(),
        }
    }

    #[test]
    fn test_is_up() {
        let up = Candle::new("X", 1.0, 2.0, 0.5, 1.5, 10.0, 0, true);
        let down = Candle::new("X", 1.5, 2.0, 0.5, 1.0, 10.0, 0, true);
        let flat = Candle::new("X", 1.0, 2.0, 0.5, 1.0, 10.0, 0, true);
        assert!(up.is_up());
        assert!(!down.is_up());
        assert!(!flat.is_up());
    }

    #[test]
    fn test_sell_params_delta_follows_direction() {
        let long = SellParams::for_position(&position(TradeDirection::Long), CloseReason::TakeProfit, 112.0);
        assert_eq!(long.delta, 12.0);

        let short = SellParams::for_position(&position(TradeDirection::Short), CloseReason::StopLoss, 112.0);
        assert_eq!(short.delta, -12.0);
        assert_eq!(short.order_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_distinct_levels() {
        let mut params = position(TradeDirection::Long);
        assert!(params.has_distinct_levels());
        params.stop_loss = params.entry;
        assert!(!params.has_distinct_levels());
    }
}
