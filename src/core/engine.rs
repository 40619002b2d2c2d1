//! Decision engine
//!
//! `Engine::record` is the single per-candle entry point. For one instrument it
//! must be called sequentially; different instruments may call concurrently.
//!
//! Per candle:
//! 1. close-check the open position against the raw close
//! 2. stop if the candle is still forming
//! 3. smooth it against the newest stored candle and attach indicators
//! 4. persist it
//! 5. with no position open and at least two stored candles, ask the strategy
//! 6. size, truncate and place the order, registering it only on success

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::positions::{PositionTable, Reservation};
use super::retry::RetryPolicy;
use super::sizing::{size_trade, SizingRules};
use super::smoothing::heikin_ashi;
use crate::error::OrderError;
use crate::history::HistoryStore;
use crate::indicators::IndicatorPipeline;
use crate::orders::OrderService;
use crate::strategy::Strategy;
use crate::types::{
    Candle, CloseReason, Instrument, SellParams, Signal, TradeDirection, TradeParams,
};

/// Per-instrument trading parameters
#[derive(Debug, Clone)]
pub struct InstrumentConfig {
    pub instrument: Instrument,
    pub interval: String,
    pub lot_fraction: f64,
    pub risk_reward: f64,
    pub window_size: usize,
    pub price_precision: u32,
    pub quantity_precision: u32,
    pub indicators: Arc<IndicatorPipeline>,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub trade_notional: f64,
    pub order_retry: RetryPolicy,
    pub close_retry: RetryPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            trade_notional: 40.0,
            order_retry: RetryPolicy::default(),
            close_retry: RetryPolicy::default(),
        }
    }
}

pub struct Engine {
    history: Arc<dyn HistoryStore>,
    orders: Arc<dyn OrderService>,
    positions: Arc<dyn PositionTable>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        orders: Arc<dyn OrderService>,
        positions: Arc<dyn PositionTable>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            history,
            orders,
            positions,
            settings,
        }
    }

    pub fn positions(&self) -> &Arc<dyn PositionTable> {
        &self.positions
    }

    /// Process one incoming candle. All effects go through the order service
    /// and the position table; failures are logged and drop this candle's work.
    pub async fn record(
        &self,
        candle: &Candle,
        strategy: &dyn Strategy,
        config: &InstrumentConfig,
    ) {
        self.try_close(candle).await;

        if !candle.closed {
            return;
        }

        let instrument = &candle.instrument;
        let history = match self.history.fetch(instrument, config.window_size).await {
            Ok(history) => history,
            Err(e) => {
                error!(instrument = %instrument, "Failed to fetch history: {}", e);
                return;
            }
        };

        let prev = history.last().unwrap_or(candle);
        let mut smoothed = heikin_ashi(prev, candle);
        config.indicators.apply(&history, &mut smoothed);

        if let Err(e) = self.history.save(&smoothed).await {
            error!(instrument = %instrument, "Failed to persist candle: {}", e);
            return;
        }

        if self.positions.is_occupied(instrument) {
            return;
        }

        let window = match self.history.fetch(instrument, config.window_size).await {
            Ok(window) => window,
            Err(e) => {
                error!(instrument = %instrument, "Failed to fetch history: {}", e);
                return;
            }
        };

        if window.len() < 2 {
            debug!(instrument = %instrument, stored = window.len(), "Not enough history to evaluate");
            return;
        }

        if let Some(signal) = strategy.evaluate(candle, &window) {
            self.open_position(instrument, signal, &window, config).await;
        }
    }

    /// Forget the open position for `instrument` after it was closed out of band.
    pub fn trade_closed(&self, instrument: &Instrument) -> Option<TradeParams> {
        let removed = self.positions.remove(instrument);
        if removed.is_some() {
            info!(instrument = %instrument, "Position marked closed externally");
        }
        removed
    }

    async fn try_close(&self, candle: &Candle) {
        let Some(position) = self.positions.get(&candle.instrument) else {
            return;
        };

        let Some(reason) = close_reason(&position, candle.close) else {
            return;
        };

        let sell = SellParams::for_position(&position, reason, candle.close);
        let result = self
            .settings
            .close_retry
            .run(|_| self.orders.close_trade(&sell), OrderError::is_retryable)
            .await;

        match result {
            Ok(true) => {
                self.positions.remove(&sell.instrument);
                info!(
                    instrument = %sell.instrument,
                    direction = %sell.direction,
                    reason = %sell.reason,
                    exit = sell.exit,
                    delta = sell.delta,
                    order_id = sell.order_id.as_deref().unwrap_or("-"),
                    "✅ Position closed"
                );
            }
            Ok(false) => {
                warn!(instrument = %sell.instrument, reason = %sell.reason, "Order service declined to close position");
            }
            Err(e) if reason.is_stop_loss() => {
                self.positions.remove(&sell.instrument);
                warn!(
                    instrument = %sell.instrument,
                    exit = sell.exit,
                    "Stop loss close failed, assuming the exchange stop fired: {}",
                    e
                );
            }
            Err(e) => {
                error!(instrument = %sell.instrument, reason = %sell.reason, "❌ Failed to close position: {}", e);
            }
        }
    }

    async fn open_position(
        &self,
        instrument: &Instrument,
        signal: Signal,
        window: &[Candle],
        config: &InstrumentConfig,
    ) {
        let rules = SizingRules {
            lot_fraction: config.lot_fraction,
            risk_reward: config.risk_reward,
            trade_notional: self.settings.trade_notional,
            price_precision: config.price_precision,
            quantity_precision: config.quantity_precision,
        };
        let snapshot = window.last().map(|c| c.indicators.clone()).unwrap_or_default();

        let mut params = match size_trade(instrument, signal, &rules, snapshot) {
            Ok(params) => params,
            Err(rejection) => {
                warn!(
                    instrument = %instrument,
                    direction = %signal.direction,
                    entry = signal.entry,
                    "Signal rejected: {}",
                    rejection
                );
                return;
            }
        };

        let Some(reservation) = Reservation::acquire(self.positions.as_ref(), instrument) else {
            debug!(instrument = %instrument, "Placement already in flight, dropping signal");
            return;
        };

        let result = self
            .settings
            .order_retry
            .run(|_| self.orders.place_trade(&params), OrderError::is_retryable)
            .await;

        match result {
            Ok(order_id) => {
                info!(
                    instrument = %instrument,
                    direction = %params.direction,
                    entry = params.entry,
                    take_profit = params.take_profit,
                    stop_loss = params.stop_loss,
                    size = params.size,
                    order_id = %order_id,
                    "🚀 Position opened"
                );
                params.order_id = Some(order_id);
                reservation.commit(params);
            }
            Err(e) => {
                let retryable = e.is_retryable();
                error!(
                    instrument = %instrument,
                    direction = %params.direction,
                    retryable,
                    "❌ Order placement failed: {}",
                    e
                );
            }
        }
    }
}

/// Which level, if any, `close` has crossed for `position`.
pub fn close_reason(position: &TradeParams, close: f64) -> Option<CloseReason> {
    match position.direction {
        TradeDirection::Long if close >= position.take_profit => Some(CloseReason::TakeProfit),
        TradeDirection::Long if close <= position.stop_loss => Some(CloseReason::StopLoss),
        TradeDirection::Short if close <= position.take_profit => Some(CloseReason::TakeProfit),
        TradeDirection::Short if close >= position.stop_loss => Some(CloseReason::StopLoss),
        _ => None,
    }
}
