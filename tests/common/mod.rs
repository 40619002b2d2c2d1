// Common test utilities and helpers
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use expert_trader::clients::{CandleFeed, Subscription};
use expert_trader::{
    Candle, Engine, EngineSettings, FeedError, HistoryStore, InMemoryPositions, IndicatorPipeline,
    Instrument, InstrumentConfig, MemoryHistory, OrderError, OrderService, PositionTable,
    RetryPolicy, SellParams, Signal, Strategy, TradeDirection, TradeParams,
};
use tokio::sync::mpsc;

/// Closed candle with the given OHLC
pub fn candle(key: &str, time: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle::new(key, open, high, low, close, 100.0, time, true)
}

/// Closed candle that opens, closes and ranges at one price
pub fn flat(key: &str, time: i64, price: f64) -> Candle {
    candle(key, time, price, price, price, price)
}

pub fn forming(key: &str, time: i64, price: f64) -> Candle {
    Candle::new(key, price, price, price, price, 100.0, time, false)
}

pub fn instrument_config(key: &str) -> InstrumentConfig {
    InstrumentConfig {
        instrument: Instrument::from(key),
        interval: "3m".to_string(),
        lot_fraction: 14.0,
        risk_reward: 1.5,
        window_size: 5,
        price_precision: 2,
        quantity_precision: 3,
        indicators: Arc::new(IndicatorPipeline::default()),
    }
}

pub fn settings(order_attempts: u32, close_attempts: u32) -> EngineSettings {
    EngineSettings {
        trade_notional: 40.0,
        order_retry: RetryPolicy::new(order_attempts, Duration::ZERO),
        close_retry: RetryPolicy::new(close_attempts, Duration::ZERO),
    }
}

pub fn open_position(key: &str, direction: TradeDirection, take_profit: f64, stop_loss: f64) -> TradeParams {
    TradeParams {
        instrument: Instrument::from(key),
        direction,
        entry: 5.0,
        take_profit,
        stop_loss,
        size: 1.0,
        order_id: Some("seed".to_string()),
        created_at: Utc::now(),
        indicators: Default::default(),
    }
}

pub struct Harness {
    pub engine: Arc<Engine>,
    pub history: Arc<MemoryHistory>,
    pub orders: Arc<RecordingOrders>,
    pub positions: Arc<InMemoryPositions>,
}

pub fn harness(orders: RecordingOrders, settings: EngineSettings) -> Harness {
    let history = Arc::new(MemoryHistory::new());
    let orders = Arc::new(orders);
    let positions = Arc::new(InMemoryPositions::new());

    let engine = Arc::new(Engine::new(
        history.clone() as Arc<dyn HistoryStore>,
        orders.clone() as Arc<dyn OrderService>,
        positions.clone() as Arc<dyn PositionTable>,
        settings,
    ));

    Harness {
        engine,
        history,
        orders,
        positions,
    }
}

/// Order service that records every call and replays scripted outcomes.
/// Unscripted calls succeed.
#[derive(Default)]
pub struct RecordingOrders {
    place_script: Mutex<VecDeque<Result<String, OrderError>>>,
    close_script: Mutex<VecDeque<Result<bool, OrderError>>>,
    place_delay: Duration,
    pub place_calls: AtomicUsize,
    pub placed: Mutex<Vec<TradeParams>>,
    pub closes: Mutex<Vec<SellParams>>,
}

impl RecordingOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place_results(self, results: Vec<Result<String, OrderError>>) -> Self {
        *self.place_script.lock().unwrap() = results.into();
        self
    }

    pub fn with_close_results(self, results: Vec<Result<bool, OrderError>>) -> Self {
        *self.close_script.lock().unwrap() = results.into();
        self
    }

    pub fn with_place_delay(mut self, delay: Duration) -> Self {
        self.place_delay = delay;
        self
    }

    pub fn placed(&self) -> Vec<TradeParams> {
        self.placed.lock().unwrap().clone()
    }

    pub fn closes(&self) -> Vec<SellParams> {
        self.closes.lock().unwrap().clone()
    }

    pub fn place_calls(&self) -> usize {
        self.place_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderService for RecordingOrders {
    async fn place_trade(&self, params: &TradeParams) -> Result<String, OrderError> {
        let call = self.place_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.place_delay.is_zero() {
            tokio::time::sleep(self.place_delay).await;
        }

        let outcome = self
            .place_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("order-{}", call)));

        if outcome.is_ok() {
            self.placed.lock().unwrap().push(params.clone());
        }
        outcome
    }

    async fn close_trade(&self, params: &SellParams) -> Result<bool, OrderError> {
        self.closes.lock().unwrap().push(params.clone());
        self.close_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(true))
    }
}

/// Strategy that proposes the same side at the trigger close every time
pub struct Always {
    direction: TradeDirection,
    pub evaluations: AtomicUsize,
}

impl Always {
    pub fn long() -> Self {
        Self {
            direction: TradeDirection::Long,
            evaluations: AtomicUsize::new(0),
        }
    }

    pub fn short() -> Self {
        Self {
            direction: TradeDirection::Short,
            evaluations: AtomicUsize::new(0),
        }
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl Strategy for Always {
    fn name(&self) -> &str {
        "always"
    }

    fn evaluate(&self, trigger: &Candle, _window: &[Candle]) -> Option<Signal> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        Some(Signal {
            direction: self.direction,
            entry: trigger.close,
        })
    }
}

/// Feed that serves one scripted batch of candles per subscription
#[derive(Default)]
pub struct ScriptedFeed {
    sessions: Mutex<VecDeque<Result<Vec<Candle>, FeedError>>>,
    pub subscriptions: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new(sessions: Vec<Result<Vec<Candle>, FeedError>>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
            subscriptions: AtomicUsize::new(0),
        }
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandleFeed for ScriptedFeed {
    async fn subscribe(
        &self,
        _instrument: &Instrument,
        _interval: &str,
    ) -> Result<Subscription, FeedError> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let session = self.sessions.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))?;

        let (tx, rx) = mpsc::channel(session.len().max(1));
        for candle in session {
            tx.try_send(candle).expect("channel sized for the session");
        }
        // Sender dropped here: the subscription ends after the scripted candles.
        Ok(Subscription::new(rx))
    }
}
