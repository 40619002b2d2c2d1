// Built-in indicators

use super::Indicator;
use crate::types::Candle;

pub const MA: &str = "MA";
pub const VMA: &str = "VMA";
pub const RSI: &str = "RSI";
pub const TR: &str = "TR";
pub const ATR: &str = "ATR";
pub const LAST_CLOSE: &str = "LASTCLOSE";

pub(crate) fn by_name(name: &str, period: usize) -> Option<Indicator> {
    match name {
        MA => Some(moving_average(period)),
        VMA => Some(volume_moving_average(period)),
        RSI => Some(relative_strength(period)),
        TR => Some(true_range()),
        ATR => Some(average_true_range(period)),
        LAST_CLOSE => Some(last_close()),
        _ => None,
    }
}

/// Simple moving average of close
pub fn moving_average(period: usize) -> Indicator {
    Indicator::new(MA, period, |window| mean(window.iter().map(|c| c.close)))
}

/// Moving average of volume
pub fn volume_moving_average(period: usize) -> Indicator {
    Indicator::new(VMA, period, |window| mean(window.iter().map(|c| c.volume)))
}

/// Relative strength oscillator: `100 - 100 / (1 + up / down)` over close-to-close deltas.
///
/// A window with no downward movement reads 100; a window with no movement at all reads 50.
pub fn relative_strength(period: usize) -> Indicator {
    Indicator::new(RSI, period.max(2), |window| {
        let (mut up, mut down) = (0.0, 0.0);
        for pair in window.windows(2) {
            let delta = pair[1].close - pair[0].close;
            if delta > 0.0 {
                up += delta;
            } else {
                down -= delta;
            }
        }

        // Averages share the same denominator, so the sums give the same ratio.
        if up == 0.0 && down == 0.0 {
            return Some(50.0);
        }
        if down == 0.0 {
            return Some(100.0);
        }

        Some(100.0 - 100.0 / (1.0 + up / down))
    })
}

/// True range of the newest candle against its predecessor's close
pub fn true_range() -> Indicator {
    Indicator::new(TR, 2, |window| {
        let [previous, current] = window else {
            return None;
        };
        Some(range_between(previous, current))
    })
}

/// Mean true range over every consecutive pair in the window
pub fn average_true_range(period: usize) -> Indicator {
    Indicator::new(ATR, period.max(2), |window| {
        mean(window.windows(2).map(|pair| range_between(&pair[0], &pair[1])))
    })
}

/// Close of the newest candle
pub fn last_close() -> Indicator {
    Indicator::new(LAST_CLOSE, 1, |window| window.last().map(|c| c.close))
}

fn range_between(previous: &Candle, current: &Candle) -> f64 {
    (current.high - current.low)
        .max((current.high - previous.close).abs())
        .max((current.low - previous.close).abs())
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
