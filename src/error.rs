//! Error types for the expert trader
//!
//! Each collaborator boundary (history store, order service, market-data feed,
//! instrument discovery) has its own error enum. `TradingError` is the
//! application-level umbrella used by the CLI and the supervisor.

use std::io;
use thiserror::Error;

use crate::config::ConfigError;

/// Rolling history store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history store unavailable: {0}")]
    Unavailable(String),

    #[error("history record could not be encoded: {0}")]
    Serialization(String),

    #[error("history query failed: {0}")]
    Query(String),
}

/// Order service failures
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order transport error: {0}")]
    Transport(String),

    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("unsupported trade direction: {0}")]
    UnsupportedDirection(String),
}

impl OrderError {
    /// Only transport failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrderError::Transport(_))
    }
}

/// Market-data feed failures
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed connection failed: {0}")]
    Connect(String),

    #[error("feed protocol error: {0}")]
    Protocol(String),

    #[error("feed closed")]
    Closed,
}

/// Instrument discovery failures
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("exchange info request failed: {0}")]
    Http(String),

    #[error("exchange info could not be parsed: {0}")]
    Parse(String),

    #[error("exchange info file error: {0}")]
    Io(String),
}

/// Main error type for the trader application
#[derive(Debug, Error)]
pub enum TradingError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("no instruments to trade: {0}")]
    NoInstruments(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TradingError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            TradingError::Order(err) => err.is_retryable(),
            TradingError::Feed(_) => true,
            TradingError::Store(StoreError::Unavailable(_)) => true,
            TradingError::Discovery(DiscoveryError::Http(_)) => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            TradingError::Config(_) => "config",
            TradingError::Store(_) => "store",
            TradingError::Order(_) => "order",
            TradingError::Feed(_) => "feed",
            TradingError::Discovery(_) | TradingError::NoInstruments(_) => "discovery",
            TradingError::Io(_) => "io",
            TradingError::Internal(_) => "internal",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => StoreError::Query(msg),
            rusqlite::Error::InvalidPath(path) => {
                StoreError::Unavailable(format!("invalid database path: {}", path.display()))
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Unavailable(format!("store task failed: {}", err))
    }
}

impl From<reqwest::Error> for DiscoveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DiscoveryError::Parse(err.to_string())
        } else {
            DiscoveryError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DiscoveryError {
    fn from(err: serde_json::Error) -> Self {
        DiscoveryError::Parse(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => FeedError::Closed,
            WsError::Io(e) => FeedError::Connect(e.to_string()),
            other => FeedError::Protocol(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for TradingError {
    fn from(err: rusqlite::Error) -> Self {
        TradingError::Store(err.into())
    }
}

impl From<reqwest::Error> for TradingError {
    fn from(err: reqwest::Error) -> Self {
        TradingError::Discovery(err.into())
    }
}

impl From<serde_json::Error> for TradingError {
    fn from(err: serde_json::Error) -> Self {
        TradingError::Internal(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for TradingError {
    fn from(err: toml::de::Error) -> Self {
        TradingError::Config(ConfigError::Parse(err.to_string()))
    }
}

impl From<String> for TradingError {
    fn from(msg: String) -> Self {
        TradingError::Internal(msg)
    }
}

impl From<&str> for TradingError {
    fn from(msg: &str) -> Self {
        TradingError::Internal(msg.to_string())
    }
}

/// Result type alias using TradingError
pub type TradingResult<T> = Result<T, TradingError>;
