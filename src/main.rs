//! BinanceMarketMonitor - Main Entry Point
//!
//! Watches Binance market streams and posts price alerts to a Telegram
//! channel.

use anyhow::Result;
use binance_market_monitor::config::load_config;
use binance_market_monitor::config::types::AppEnvironment;
use binance_market_monitor::MonitorRuntime;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "monitor.toml")]
    config: String,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

/// Install the global subscriber for the environment
///
/// Production logs JSON at info, development logs readable lines at debug.
/// `RUST_LOG` replaces the default level and `--log-level` replaces both.
fn init_tracing(environment: AppEnvironment, log_level: Option<&str>) {
    let default_level = if environment.is_production() { "info" } else { "debug" };
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
    };

    if environment.is_production() {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = match load_config(Some(&args.config)) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(AppEnvironment::Development, args.log_level.as_deref());
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    init_tracing(config.monitor.environment, args.log_level.as_deref());

    info!("Starting BinanceMarketMonitor");
    info!("Configuration file: {}", args.config);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, cleaning up...");
                signal_token.cancel();
            }
            Err(e) => error!(error = %e, "Unable to listen for shutdown signal"),
        }
    });

    let runtime = MonitorRuntime::from_config(config)?;
    if let Err(e) = runtime.run(shutdown).await {
        error!(error = %e, "Monitor failed to start");
        return Err(e.into());
    }

    info!("Shutdown complete");
    Ok(())
}
