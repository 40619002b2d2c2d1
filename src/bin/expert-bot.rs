// Expert Trader - CLI
// Single entry point for configuring and running the decision engine

use clap::{Parser, Subcommand};
use expert_trader::logging::init_tracing;
use expert_trader::{Config, ConfigError};
use tracing::{error, info};

// Load command modules from cli directory
#[path = "../cli/run_commands.rs"]
mod run_commands;

#[derive(Parser)]
#[command(name = "expert-bot")]
#[command(version = "0.3.0")]
#[command(about = "Candle-driven trading decision engine", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Load and validate the configuration
    Validate,

    /// Discover tradable instruments and print their precision
    Instruments,

    /// Run one worker per instrument until terminated (paper orders)
    Run,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logging settings come from the config when it loads; init works without one.
    let loaded = Config::from_file(&cli.config);
    let logging = match &loaded {
        Ok(config) => config.logging.clone(),
        Err(_) => Config::default().logging,
    };
    init_tracing(&logging, cli.verbose)?;

    info!("🚀 Expert Trader v0.3.0");
    info!("📁 Config: {}", cli.config);

    match cli.command {
        // Init doesn't require config (it creates it)
        Commands::Init { force } => {
            run_commands::init_config(&cli.config, force)?;
        }

        Commands::Validate => {
            let config = load_config_or_exit(loaded);
            run_commands::show_config(&config);
        }

        Commands::Instruments => {
            let config = load_config_or_exit(loaded);
            run_commands::list_instruments(&config).await?;
        }

        Commands::Run => {
            let config = load_config_or_exit(loaded);
            run_commands::run(config).await?;
        }
    }

    Ok(())
}

/// Unwrap the loaded config or exit with a helpful error message
fn load_config_or_exit(loaded: Result<Config, ConfigError>) -> Config {
    match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Configuration Error");
            error!("{}", e);

            if matches!(e, ConfigError::FileRead(_)) {
                error!("");
                error!("💡 Quick fix:");
                error!("   1. Run: expert-bot init");
                error!("   2. Edit config.toml");
                error!("   3. Try again");
            }

            std::process::exit(1);
        }
    }
}
