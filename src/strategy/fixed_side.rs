// Enters on every evaluation at the trigger close

use rand::Rng;

use super::Strategy;
use crate::types::{Candle, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
    /// Coin flip per evaluation
    Random,
}

#[derive(Debug, Clone)]
pub struct FixedSide {
    side: Side,
}

impl FixedSide {
    pub fn new(side: Side) -> Self {
        Self { side }
    }
}

impl Strategy for FixedSide {
    fn name(&self) -> &str {
        match self.side {
            Side::Long => "long",
            Side::Short => "short",
            Side::Random => "random",
        }
    }

    fn evaluate(&self, trigger: &Candle, _window: &[Candle]) -> Option<Signal> {
        let long = match self.side {
            Side::Long => true,
            Side::Short => false,
            Side::Random => rand::thread_rng().gen_bool(0.5),
        };

        Some(if long {
            Signal::long(trigger.close)
        } else {
            Signal::short(trigger.close)
        })
    }
}
