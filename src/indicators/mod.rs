//! Indicator pipeline
//!
//! An indicator is a named pure function over a window of candles (oldest
//! first, newest last) producing one scalar that is attached to the newest
//! candle under the indicator's name. Each indicator declares the number of
//! candles it needs; when the window is shorter the indicator is skipped and its
//! key is left absent.

use std::fmt;
use std::sync::Arc;

use crate::types::Candle;

pub mod builtin;

pub use builtin::{
    average_true_range, last_close, moving_average, relative_strength, true_range,
    volume_moving_average, ATR, LAST_CLOSE, MA, RSI, TR, VMA,
};

/// Names accepted by [`IndicatorPipeline::from_names`]
pub const BUILTIN_INDICATORS: &[&str] = &[MA, VMA, RSI, TR, ATR, LAST_CLOSE];

pub type WindowFn = Arc<dyn Fn(&[Candle]) -> Option<f64> + Send + Sync>;

#[derive(Clone)]
pub struct Indicator {
    name: String,
    period: usize,
    compute: WindowFn,
}

impl Indicator {
    pub fn new<F>(name: impl Into<String>, period: usize, compute: F) -> Self
    where
        F: Fn(&[Candle]) -> Option<f64> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            period: period.max(1),
            compute: Arc::new(compute),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Evaluate over the trailing `period` candles of `window`.
    pub fn evaluate(&self, window: &[Candle]) -> Option<f64> {
        if window.len() < self.period {
            return None;
        }

        let tail = &window[window.len() - self.period..];
        (self.compute)(tail).filter(|value| value.is_finite())
    }
}

impl fmt::Debug for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indicator")
            .field("name", &self.name)
            .field("period", &self.period)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorPipeline {
    indicators: Vec<Indicator>,
}

impl IndicatorPipeline {
    pub fn new(indicators: Vec<Indicator>) -> Self {
        Self { indicators }
    }

    /// Build a pipeline of built-in indicators sharing one lookback period.
    pub fn from_names<S: AsRef<str>>(names: &[S], period: usize) -> Result<Self, String> {
        let indicators = names
            .iter()
            .map(|name| {
                builtin::by_name(name.as_ref(), period)
                    .ok_or_else(|| format!("unknown indicator: {}", name.as_ref()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { indicators })
    }

    /// The lookback every indicator in the pipeline can be satisfied with.
    pub fn required_window(&self) -> usize {
        self.indicators.iter().map(Indicator::period).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Run every indicator over `history` followed by `candle` and attach the results to `candle`.
    ///
    /// All values are computed against the same snapshot before any is written,
    /// so no indicator can observe another one's output from this pass.
    pub fn apply(&self, history: &[Candle], candle: &mut Candle) {
        if self.indicators.is_empty() {
            return;
        }

        let mut window = Vec::with_capacity(history.len() + 1);
        window.extend_from_slice(history);
        window.push(candle.clone());

        let results: Vec<(String, f64)> = self
            .indicators
            .iter()
            .filter_map(|indicator| {
                indicator
                    .evaluate(&window)
                    .map(|value| (indicator.name().to_string(), value))
            })
            .collect();

        candle.indicators.extend(results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: f64) -> Candle {
        Candle::new("T", close, close, close, close, 1.0, 0, true)
    }

    #[test]
    fn test_short_window_skips_indicator() {
        let pipeline = IndicatorPipeline::new(vec![Indicator::new("wide", 5, |_| Some(1.0))]);
        let history = vec![candle(1.0), candle(2.0)];
        let mut newest = candle(3.0);

        pipeline.apply(&history, &mut newest);
        assert_eq!(newest.indicator("wide"), None);
    }

    #[test]
    fn test_window_is_trailing_and_newest_last() {
        let pipeline = IndicatorPipeline::new(vec![Indicator::new("last", 2, |w| {
            assert_eq!(w.len(), 2);
            Some(w[w.len() - 1].close)
        })]);
        let history = vec![candle(1.0), candle(2.0), candle(3.0)];
        let mut newest = candle(4.0);

        pipeline.apply(&history, &mut newest);
        assert_eq!(newest.indicator("last"), Some(4.0));
    }

    #[test]
    fn test_indicators_do_not_see_each_other() {
        let pipeline = IndicatorPipeline::new(vec![
            Indicator::new("a", 1, |_| Some(10.0)),
            Indicator::new("b", 1, |w| Some(w[0].indicator("a").unwrap_or(-1.0))),
        ]);
        let mut newest = candle(1.0);

        pipeline.apply(&[], &mut newest);
        assert_eq!(newest.indicator("a"), Some(10.0));
        assert_eq!(newest.indicator("b"), Some(-1.0));
    }

    #[test]
    fn test_non_finite_results_are_dropped() {
        let pipeline = IndicatorPipeline::new(vec![Indicator::new("nan", 1, |_| Some(f64::NAN))]);
        let mut newest = candle(1.0);

        pipeline.apply(&[], &mut newest);
        assert!(newest.indicators.is_empty());
    }

    #[test]
    fn test_from_names() {
        let pipeline = IndicatorPipeline::from_names(&["MA", "ATR", "LASTCLOSE"], 4).unwrap();
        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.required_window(), 4);

        assert!(IndicatorPipeline::from_names(&["MACD"], 4).is_err());
    }
}
