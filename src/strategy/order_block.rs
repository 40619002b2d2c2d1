//! Order block with retracement
//!
//! An order block is a candle followed by `block_size - 1` candles of the
//! opposite colour. A green block arms a short at its high, a red block arms a
//! long at its low. Once armed, the first trigger that retraces to the level
//! fires and both sides disarm.

use dashmap::DashMap;
use tracing::debug;

use super::Strategy;
use crate::types::{Candle, Instrument, Signal};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Levels {
    long_at: Option<f64>,
    short_at: Option<f64>,
}

#[derive(Debug)]
pub struct OrderBlockRetracement {
    block_size: usize,
    levels: DashMap<Instrument, Levels>,
}

impl OrderBlockRetracement {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(2),
            levels: DashMap::new(),
        }
    }

    /// Latest block in `window`, as (is the block green, level to arm).
    fn find_block(&self, window: &[Candle]) -> Option<(bool, f64)> {
        if window.len() < self.block_size {
            return None;
        }

        let recent = &window[window.len() - self.block_size..];
        let (block, followers) = recent.split_first()?;

        if block.is_up() {
            followers
                .iter()
                .all(|c| !c.is_up())
                .then_some((true, block.high))
        } else {
            followers
                .iter()
                .all(Candle::is_up)
                .then_some((false, block.low))
        }
    }
}

impl Strategy for OrderBlockRetracement {
    fn name(&self) -> &str {
        "order-block"
    }

    fn evaluate(&self, trigger: &Candle, window: &[Candle]) -> Option<Signal> {
        let mut levels = self.levels.entry(trigger.instrument.clone()).or_default();

        let signal = match (levels.long_at, levels.short_at) {
            (Some(low), _) if trigger.close <= low => Some(Signal::long(trigger.close)),
            (_, Some(high)) if trigger.close >= high => Some(Signal::short(trigger.close)),
            _ => None,
        };
        if signal.is_some() {
            *levels = Levels::default();
        }

        match self.find_block(window) {
            Some((true, high)) => {
                debug!(instrument = %trigger.instrument, level = high, "Bullish order block, short armed");
                levels.short_at = Some(high);
            }
            Some((false, low)) => {
                debug!(instrument = %trigger.instrument, level = low, "Bearish order block, long armed");
                levels.long_at = Some(low);
            }
            None => {}
        }

        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TradeDirection;

    fn green(high: f64) -> Candle {
        Candle::new("T", 10.0, high, 9.0, 11.0, 1.0, 0, true)
    }

    fn red(low: f64) -> Candle {
        Candle::new("T", 11.0, 12.0, low, 10.0, 1.0, 0, true)
    }

    fn trigger(close: f64) -> Candle {
        Candle::new("T", close, close, close, close, 1.0, 0, true)
    }

    #[test]
    fn test_green_block_arms_short() {
        let strategy = OrderBlockRetracement::new(3);
        let window = vec![red(8.0), green(15.0), red(9.0), red(9.0)];

        assert!(strategy.evaluate(&trigger(12.0), &window).is_none());
        assert!(strategy.evaluate(&trigger(14.9), &[]).is_none());

        let signal = strategy.evaluate(&trigger(15.5), &[]).unwrap();
        assert_eq!(signal.direction, TradeDirection::Short);
        assert_eq!(signal.entry, 15.5);

        // Disarmed after firing
        assert!(strategy.evaluate(&trigger(20.0), &[]).is_none());
    }

    #[test]
    fn test_red_block_arms_long() {
        let strategy = OrderBlockRetracement::new(2);
        let window = vec![red(7.0), green(13.0)];

        assert!(strategy.evaluate(&trigger(12.0), &window).is_none());
        let signal = strategy.evaluate(&trigger(6.5), &[]).unwrap();
        assert_eq!(signal.direction, TradeDirection::Long);
    }

    #[test]
    fn test_mixed_followers_do_not_arm() {
        let strategy = OrderBlockRetracement::new(3);
        let window = vec![green(15.0), red(9.0), green(15.0)];

        strategy.evaluate(&trigger(12.0), &window);
        assert!(strategy.evaluate(&trigger(100.0), &[]).is_none());
        assert!(strategy.evaluate(&trigger(0.1), &[]).is_none());
    }

    #[test]
    fn test_state_is_per_instrument() {
        let strategy = OrderBlockRetracement::new(2);
        strategy.evaluate(&trigger(12.0), &[green(15.0), red(9.0)]);

        let other = Candle::new("U", 16.0, 16.0, 16.0, 16.0, 1.0, 0, true);
        assert!(strategy.evaluate(&other, &[]).is_none());
        assert!(strategy.evaluate(&trigger(16.0), &[]).is_some());
    }
}
