// Expert Trader Library
//
// Candle-driven decision engine: smooths and enriches incoming candles, keeps a
// self-trimming rolling history per instrument, asks a pluggable strategy for
// entries and manages at most one open position per instrument.

pub mod clients;
pub mod config;
pub mod core;
pub mod error;       // Unified error handling
pub mod history;     // Rolling history store
pub mod indicators;
pub mod logging;
pub mod orders;
pub mod precision;
pub mod strategy;
pub mod types;

// Re-export engine types
pub use crate::core::{
    Engine, EngineSettings, InMemoryPositions, InstrumentConfig, PositionTable, RetryPolicy,
    Supervisor, Worker,
};

// Re-export error types
pub use error::{DiscoveryError, FeedError, OrderError, StoreError, TradingError, TradingResult};

// Re-export configuration
pub use config::{Config, ConfigError, LoggingConfig, StorageBackend, TradingConfig};

// Re-export collaborators
pub use clients::{BinanceKlineFeed, CandleFeed, Subscription};
pub use history::{HistoryStore, MemoryHistory, SqliteHistory};
pub use indicators::{Indicator, IndicatorPipeline};
pub use orders::{OrderService, PaperOrderService};
pub use strategy::Strategy;

// Re-export domain types
pub use types::{Candle, CloseReason, Instrument, SellParams, Signal, TradeDirection, TradeParams};
