//! External market-data and exchange metadata clients

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::FeedError;
use crate::types::{Candle, Instrument};

pub mod binance_ws;
pub mod exchange_info;

pub use binance_ws::{parse_kline, BinanceKlineFeed};
pub use exchange_info::{discover_instruments, ExchangeInfo, SymbolInfo};

/// Live candle stream for one instrument. Ends when the transport dies.
pub struct Subscription {
    receiver: mpsc::Receiver<Candle>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(receiver: mpsc::Receiver<Candle>) -> Self {
        Self { receiver, task: None }
    }

    /// Tie a background reader task to the subscription's lifetime.
    pub fn with_task(receiver: mpsc::Receiver<Candle>, task: JoinHandle<()>) -> Self {
        Self {
            receiver,
            task: Some(task),
        }
    }

    pub async fn next(&mut self) -> Option<Candle> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[async_trait]
pub trait CandleFeed: Send + Sync {
    async fn subscribe(
        &self,
        instrument: &Instrument,
        interval: &str,
    ) -> Result<Subscription, FeedError>;
}
