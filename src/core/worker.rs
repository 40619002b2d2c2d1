//! Per-instrument workers
//!
//! A worker owns one instrument: it subscribes to the feed, hands every candle
//! to the engine in arrival order, and resubscribes after a fixed pause whenever
//! the subscription dies. It never gives up. The supervisor runs one worker per
//! instrument as independent tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::engine::{Engine, InstrumentConfig};
use crate::clients::CandleFeed;
use crate::error::{FeedError, TradingError, TradingResult};
use crate::strategy::Strategy;

pub struct Worker {
    engine: Arc<Engine>,
    feed: Arc<dyn CandleFeed>,
    strategy: Arc<dyn Strategy>,
    config: InstrumentConfig,
    reconnect_delay: Duration,
}

impl Worker {
    pub fn new(
        engine: Arc<Engine>,
        feed: Arc<dyn CandleFeed>,
        strategy: Arc<dyn Strategy>,
        config: InstrumentConfig,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            engine,
            feed,
            strategy,
            config,
            reconnect_delay,
        }
    }

    /// Subscribe once and process candles until the subscription ends.
    /// Returns the number of candles processed.
    pub async fn run_session(&self) -> Result<usize, FeedError> {
        let mut subscription = self
            .feed
            .subscribe(&self.config.instrument, &self.config.interval)
            .await?;

        let mut processed = 0;
        while let Some(candle) = subscription.next().await {
            self.engine
                .record(&candle, self.strategy.as_ref(), &self.config)
                .await;
            processed += 1;
        }
        Ok(processed)
    }

    /// Run until the process is terminated.
    pub async fn run(self) {
        let instrument = self.config.instrument.clone();
        info!(instrument = %instrument, interval = %self.config.interval, strategy = self.strategy.name(), "🔄 Worker started");

        loop {
            match self.run_session().await {
                Ok(processed) => {
                    warn!(instrument = %instrument, processed, "Feed ended, reconnecting in {:?}", self.reconnect_delay);
                }
                Err(e) => {
                    error!(instrument = %instrument, "Feed subscription failed, retrying in {:?}: {}", self.reconnect_delay, e);
                }
            }
            sleep(self.reconnect_delay).await;
        }
    }
}

pub struct Supervisor {
    workers: Vec<Worker>,
}

impl Supervisor {
    pub fn new(
        engine: Arc<Engine>,
        feed: Arc<dyn CandleFeed>,
        strategy: Arc<dyn Strategy>,
        instruments: Vec<InstrumentConfig>,
        reconnect_delay: Duration,
    ) -> Self {
        let workers = instruments
            .into_iter()
            .map(|config| {
                Worker::new(
                    Arc::clone(&engine),
                    Arc::clone(&feed),
                    Arc::clone(&strategy),
                    config,
                    reconnect_delay,
                )
            })
            .collect();

        Self { workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Spawn every worker and wait on them. Workers only stop if they panic.
    pub async fn run(self) -> TradingResult<()> {
        if self.workers.is_empty() {
            return Err(TradingError::NoInstruments(
                "discovery selected no instruments".to_string(),
            ));
        }

        info!(workers = self.workers.len(), "🚀 Starting workers");
        let mut tasks = JoinSet::new();
        for worker in self.workers {
            tasks.spawn(worker.run());
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!("Worker task terminated: {}", e);
            }
        }
        Ok(())
    }
}
