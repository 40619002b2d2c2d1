//! Pluggable entry strategies
//!
//! A strategy looks at the raw triggering candle and the smoothed history
//! window (oldest first, the smoothed trigger last) and may propose a side and
//! an entry price. Sizing, rounding and order placement belong to the engine.
//! Any state a strategy keeps is its own and is keyed by instrument.

use std::sync::Arc;

use crate::config::TradingConfig;
use crate::types::{Candle, Signal};

pub mod fixed_side;
pub mod order_block;

pub use fixed_side::{FixedSide, Side};
pub use order_block::OrderBlockRetracement;

/// Names accepted in `trading.strategy`
pub const STRATEGY_NAMES: &[&str] = &["order-block", "long", "short", "random"];

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, trigger: &Candle, window: &[Candle]) -> Option<Signal>;
}

/// Build the configured strategy
pub fn from_config(trading: &TradingConfig) -> Result<Arc<dyn Strategy>, String> {
    let strategy: Arc<dyn Strategy> = match trading.strategy.as_str() {
        "order-block" => Arc::new(OrderBlockRetracement::new(trading.order_block_size)),
        "long" => Arc::new(FixedSide::new(Side::Long)),
        "short" => Arc::new(FixedSide::new(Side::Short)),
        "random" => Arc::new(FixedSide::new(Side::Random)),
        other => return Err(format!("unknown strategy: {}", other)),
    };
    Ok(strategy)
}
