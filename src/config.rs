// Configuration management for the expert trader

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::indicators::{IndicatorPipeline, BUILTIN_INDICATORS};
use crate::strategy::STRATEGY_NAMES;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub ws_url: String,
    pub rest_url: String,
    /// Read exchange metadata from this file instead of the REST endpoint
    #[serde(default)]
    pub exchange_info_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    pub interval: String,
    pub quote_asset: String,
    /// Allow-list of symbols; empty means every symbol quoted in `quote_asset`
    #[serde(default)]
    pub symbols: Vec<String>,
    pub strategy: String,
    #[serde(default = "default_order_block_size")]
    pub order_block_size: usize,
    pub lot_fraction: f64,
    pub risk_reward: f64,
    pub window_size: usize,
    pub trade_notional: f64,
    #[serde(default = "default_indicators")]
    pub indicators: Vec<String>,
    #[serde(default = "default_indicator_period")]
    pub indicator_period: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub order_attempts: u32,
    pub order_delay_ms: u64,
    pub close_attempts: u32,
    pub reconnect_delay_secs: u64,
}

impl RetryConfig {
    pub fn order_delay(&self) -> Duration {
        Duration::from_millis(self.order_delay_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    #[serde(default)]
    pub sqlite_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub trading: TradingConfig,
    pub retry: RetryConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Largest lookback a worker may ask the history store for
pub const MAX_WINDOW_SIZE: usize = 10_000;

fn default_order_block_size() -> usize {
    3
}

fn default_indicator_period() -> usize {
    10
}

fn default_indicators() -> Vec<String> {
    ["MA", "VMA", "RSI", "TR", "ATR"].iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchange: ExchangeConfig {
                ws_url: "wss://fstream.binance.com/ws".to_string(),
                rest_url: "https://fapi.binance.com".to_string(),
                exchange_info_file: None,
            },
            trading: TradingConfig {
                interval: "3m".to_string(),
                quote_asset: "USDT".to_string(),
                symbols: vec!["BTCUSDT".to_string()],
                strategy: "order-block".to_string(),
                order_block_size: default_order_block_size(),
                lot_fraction: 14.0,
                risk_reward: 1.5,
                window_size: 10,
                trade_notional: 40.0,
                indicators: default_indicators(),
                indicator_period: default_indicator_period(),
            },
            retry: RetryConfig {
                order_attempts: 3,
                order_delay_ms: 500,
                close_attempts: 3,
                reconnect_delay_secs: 30,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                sqlite_path: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// Load configuration from file, or create default if file doesn't exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.to_file(&path)?;
            info!("📁 Created default config file: {}", path.as_ref().display());
            Ok(config)
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        let trading = &self.trading;

        if trading.lot_fraction <= 0.0 {
            return Err(ConfigError::Validation("lot_fraction must be positive".to_string()));
        }

        if trading.risk_reward <= 0.0 {
            return Err(ConfigError::Validation("risk_reward must be positive".to_string()));
        }

        if trading.trade_notional <= 0.0 {
            return Err(ConfigError::Validation("trade_notional must be positive".to_string()));
        }

        if trading.window_size < 2 || trading.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::Validation(format!(
                "window_size must be between 2 and {}",
                MAX_WINDOW_SIZE
            )));
        }

        if trading.indicator_period == 0 {
            return Err(ConfigError::Validation("indicator_period must be greater than 0".to_string()));
        }

        if trading.order_block_size < 2 {
            return Err(ConfigError::Validation("order_block_size must be at least 2".to_string()));
        }

        if trading.quote_asset.trim().is_empty() {
            return Err(ConfigError::Validation("quote_asset must not be empty".to_string()));
        }

        if !STRATEGY_NAMES.contains(&trading.strategy.as_str()) {
            return Err(ConfigError::Validation(format!(
                "unknown strategy '{}', expected one of {:?}",
                trading.strategy, STRATEGY_NAMES
            )));
        }

        if let Some(unknown) = trading
            .indicators
            .iter()
            .find(|name| !BUILTIN_INDICATORS.contains(&name.as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "unknown indicator '{}', expected any of {:?}",
                unknown, BUILTIN_INDICATORS
            )));
        }

        // Indicators see the stored window plus the candle being enriched
        let pipeline = IndicatorPipeline::from_names(&trading.indicators, trading.indicator_period)
            .map_err(ConfigError::Validation)?;
        if pipeline.required_window() > trading.window_size + 1 {
            return Err(ConfigError::Validation(format!(
                "indicators need {} candles but window_size {} only provides {}",
                pipeline.required_window(),
                trading.window_size,
                trading.window_size + 1
            )));
        }

        if self.retry.order_attempts == 0 || self.retry.close_attempts == 0 {
            return Err(ConfigError::Validation("retry attempts must be greater than 0".to_string()));
        }

        if self.storage.backend == StorageBackend::Sqlite && self.storage.sqlite_path.is_none() {
            return Err(ConfigError::Validation("sqlite backend requires sqlite_path".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(String),

    #[error("Failed to write config file: {0}")]
    FileWrite(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
