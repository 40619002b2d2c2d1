// Command implementations for expert-bot

use std::path::Path;
use std::sync::Arc;

use expert_trader::clients::exchange_info::discover_instruments;
use expert_trader::{
    BinanceKlineFeed, Config, Engine, EngineSettings, HistoryStore, InMemoryPositions,
    IndicatorPipeline, InstrumentConfig, MemoryHistory, PaperOrderService, RetryPolicy,
    SqliteHistory, StorageBackend, Supervisor, TradingError, TradingResult,
};
use tracing::{info, warn};

pub fn init_config(path: &str, force: bool) -> TradingResult<()> {
    if Path::new(path).exists() && !force {
        warn!("⚠️  {} already exists, skipping (use --force to overwrite)", path);
        return Ok(());
    }

    Config::default().to_file(path)?;
    info!("📝 Created {}", path);
    info!("💡 Next steps:");
    info!("   1. Edit {} (symbols, strategy, risk)", path);
    info!("   2. Run: expert-bot instruments");
    info!("   3. Run: expert-bot run");
    Ok(())
}

pub fn show_config(config: &Config) {
    let trading = &config.trading;
    info!("✅ Configuration is valid");
    info!("   Interval:      {}", trading.interval);
    info!("   Quote asset:   {}", trading.quote_asset);
    info!(
        "   Symbols:       {}",
        if trading.symbols.is_empty() { "all".to_string() } else { trading.symbols.join(", ") }
    );
    info!("   Strategy:      {}", trading.strategy);
    info!("   Lot fraction:  {}", trading.lot_fraction);
    info!("   Risk:reward:   {}", trading.risk_reward);
    info!("   Window:        {}", trading.window_size);
    info!("   Notional:      {}", trading.trade_notional);
    info!("   Indicators:    {} (period {})", trading.indicators.join(", "), trading.indicator_period);
    info!("   Storage:       {:?}", config.storage.backend);
}

fn build_pipeline(config: &Config) -> TradingResult<Arc<IndicatorPipeline>> {
    let pipeline = IndicatorPipeline::from_names(&config.trading.indicators, config.trading.indicator_period)
        .map_err(TradingError::Internal)?;
    Ok(Arc::new(pipeline))
}

async fn discover(config: &Config) -> TradingResult<Vec<InstrumentConfig>> {
    let instruments = discover_instruments(config, build_pipeline(config)?).await?;
    if instruments.is_empty() {
        return Err(TradingError::NoInstruments(format!(
            "no {} symbols matched the configuration",
            config.trading.quote_asset
        )));
    }
    Ok(instruments)
}

pub async fn list_instruments(config: &Config) -> TradingResult<()> {
    let instruments = discover(config).await?;

    info!("{:<14} {:>10} {:>10}", "SYMBOL", "PRICE DP", "QTY DP");
    for instrument in &instruments {
        info!(
            "{:<14} {:>10} {:>10}",
            instrument.instrument.as_str(),
            instrument.price_precision,
            instrument.quantity_precision
        );
    }
    info!("📊 {} instruments", instruments.len());
    Ok(())
}

fn build_history(config: &Config) -> TradingResult<Arc<dyn HistoryStore>> {
    let history: Arc<dyn HistoryStore> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryHistory::new()),
        StorageBackend::Sqlite => {
            let path = config
                .storage
                .sqlite_path
                .as_deref()
                .ok_or_else(|| TradingError::Internal("sqlite backend requires sqlite_path".to_string()))?;
            info!("💾 Using SQLite history at {}", path);
            Arc::new(SqliteHistory::open(path)?)
        }
    };
    Ok(history)
}

pub async fn run(config: Config) -> TradingResult<()> {
    info!("🧪 Paper trading mode: orders are journaled, never sent");

    let instruments = discover(&config).await?;
    let strategy = expert_trader::strategy::from_config(&config.trading).map_err(TradingError::Internal)?;

    let retry = &config.retry;
    let settings = EngineSettings {
        trade_notional: config.trading.trade_notional,
        order_retry: RetryPolicy::new(retry.order_attempts, retry.order_delay()),
        close_retry: RetryPolicy::new(retry.close_attempts, retry.order_delay()),
    };

    let engine = Arc::new(Engine::new(
        build_history(&config)?,
        Arc::new(PaperOrderService::new()),
        Arc::new(InMemoryPositions::new()),
        settings,
    ));
    let feed = Arc::new(BinanceKlineFeed::new(config.exchange.ws_url.clone()));

    info!(
        instruments = instruments.len(),
        strategy = strategy.name(),
        interval = %config.trading.interval,
        "Starting engine"
    );

    Supervisor::new(engine, feed, strategy, instruments, retry.reconnect_delay())
        .run()
        .await
}
