// Heikin-Ashi style trend smoothing

use crate::types::Candle;

/// Smooth `raw` against its predecessor.
///
/// open = midpoint of the predecessor's open and close; close = mean of the raw
/// OHLC; high and low widen to cover the smoothed open and close. Volume, time,
/// and the closed flag carry over from `raw`.
pub fn heikin_ashi(prev: &Candle, raw: &Candle) -> Candle {
    let open = 0.5 * (prev.open + prev.close);
    let close = 0.25 * (raw.open + raw.close + raw.high + raw.low);

    let mut smoothed = Candle::new(
        raw.instrument.clone(),
        open,
        raw.high.max(open).max(close),
        raw.low.min(open).min(close),
        close,
        raw.volume,
        raw.time,
        raw.closed,
    );
    smoothed.indicators = raw.indicators.clone();
    smoothed
}
