// Tracing subscriber setup

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{TradingError, TradingResult};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level; `verbose` raises this crate to debug.
pub fn init_tracing(logging: &LoggingConfig, verbose: bool) -> TradingResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(logging, verbose)));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if logging.json {
        registry
            .with(fmt::layer().with_ansi(false).json())
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).compact())
            .try_init()
    };

    result.map_err(|e| TradingError::Internal(format!("failed to install tracing subscriber: {}", e)))
}

fn default_directive(logging: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        format!("expert_trader=debug,{}", logging.level)
    } else {
        logging.level.clone()
    }
}
