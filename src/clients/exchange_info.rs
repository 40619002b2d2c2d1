// Instrument discovery from exchange metadata

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::InstrumentConfig;
use crate::error::DiscoveryError;
use crate::indicators::IndicatorPipeline;
use crate::precision::precision_of;
use crate::types::Instrument;

const EXCHANGE_INFO_PATH: &str = "/fapi/v1/exchangeInfo";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub quote_asset: Option<String>,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolFilter {
    pub filter_type: String,
    #[serde(default)]
    pub tick_size: Option<String>,
    #[serde(default)]
    pub step_size: Option<String>,
}

impl ExchangeInfo {
    pub async fn fetch(rest_url: &str) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let url = format!("{}{}", rest_url.trim_end_matches('/'), EXCHANGE_INFO_PATH);

        let info = client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<ExchangeInfo>()
            .await?;
        Ok(info)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DiscoveryError> {
        let content = std::fs::read_to_string(path).map_err(|e| DiscoveryError::Io(e.to_string()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, DiscoveryError> {
        Ok(serde_json::from_str(content)?)
    }
}

impl SymbolInfo {
    fn filter_value(
        &self,
        filter_type: &str,
        pick: fn(&SymbolFilter) -> Option<&String>,
    ) -> Option<&str> {
        self.filters
            .iter()
            .find(|f| f.filter_type == filter_type)
            .and_then(pick)
            .map(String::as_str)
    }

    pub fn tick_size(&self) -> Option<&str> {
        self.filter_value("PRICE_FILTER", |f| f.tick_size.as_ref())
    }

    pub fn step_size(&self) -> Option<&str> {
        self.filter_value("LOT_SIZE", |f| f.step_size.as_ref())
    }

    fn is_trading(&self) -> bool {
        self.status.as_deref().map_or(true, |status| status == "TRADING")
    }
}

/// True when `symbol` is quoted in `quote` and its base is not another USD variant
/// (so `BTCUSDT` qualifies for `USDT` but `USDCUSDT` does not).
pub fn is_quoted_in(symbol: &str, quote: &str) -> bool {
    let Some(base) = symbol.strip_suffix(quote) else {
        return false;
    };
    if base.is_empty() {
        return false;
    }
    !(quote.starts_with("USD") && base.contains("USD"))
}

/// Pick the tradable instruments out of `info` according to the trading config.
pub fn select_instruments(
    info: &ExchangeInfo,
    config: &Config,
    indicators: Arc<IndicatorPipeline>,
) -> Vec<InstrumentConfig> {
    let trading = &config.trading;

    info.symbols
        .iter()
        .filter(|s| s.is_trading())
        .filter(|s| is_quoted_in(&s.symbol, &trading.quote_asset))
        .filter(|s| match &s.quote_asset {
            Some(quote) => quote == &trading.quote_asset,
            None => true,
        })
        .filter(|s| trading.symbols.is_empty() || trading.symbols.contains(&s.symbol))
        .filter_map(|s| {
            let (Some(tick), Some(step)) = (s.tick_size(), s.step_size()) else {
                warn!(symbol = %s.symbol, "Skipping symbol without price or lot filter");
                return None;
            };
            let (Some(price_precision), Some(quantity_precision)) =
                (precision_of(tick), precision_of(step))
            else {
                warn!(symbol = %s.symbol, tick, step, "Skipping symbol with unparseable tick or step");
                return None;
            };

            Some(InstrumentConfig {
                instrument: Instrument::new(s.symbol.clone()),
                interval: trading.interval.clone(),
                lot_fraction: trading.lot_fraction,
                risk_reward: trading.risk_reward,
                window_size: trading.window_size,
                price_precision,
                quantity_precision,
                indicators: Arc::clone(&indicators),
            })
        })
        .collect()
}

/// Load exchange metadata (file if configured, otherwise REST) and select instruments.
pub async fn discover_instruments(
    config: &Config,
    indicators: Arc<IndicatorPipeline>,
) -> Result<Vec<InstrumentConfig>, DiscoveryError> {
    let info = match &config.exchange.exchange_info_file {
        Some(path) => {
            info!("📁 Loading exchange info from {}", path);
            ExchangeInfo::from_file(path)?
        }
        None => {
            info!("🌐 Fetching exchange info from {}", config.exchange.rest_url);
            ExchangeInfo::fetch(&config.exchange.rest_url).await?
        }
    };

    let instruments = select_instruments(&info, config, indicators);
    info!(
        listed = info.symbols.len(),
        selected = instruments.len(),
        quote = %config.trading.quote_asset,
        "Instrument discovery complete"
    );
    Ok(instruments)
}
