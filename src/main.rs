//! MVola payment bridge.
//!
//! ```text
//!   Caller                       Bridge                          MVola
//!     │ POST /mvola/transaction    │                                │
//!     ├───────────────────────────▶│ register slot                  │
//!     │                            ├── create merchant-pay ────────▶│
//!     │                            │◀─────────── 202 + handle ──────┤
//!     │                            │ wait (bounded)                 │
//!     │                            │◀────── PUT /mvola/callback ────┤
//!     │                            │ deliver → wake waiter          │
//!     │◀──────── 200 SUCCESS ──────┤                                │
//!     │                            │                                │
//!     │   (no callback in time)    ├── status / details ───────────▶│
//!     │◀──── 200 or 202 PENDING ───┤                                │
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use mvola_bridge::config::{self, validation::validate_config, BridgeConfig, ConfigError};
use mvola_bridge::lifecycle::{spawn_signal_handler, Shutdown};
use mvola_bridge::observability::{init_metrics, init_tracing};
use mvola_bridge::HttpServer;

#[derive(Parser)]
#[command(name = "mvola-bridge")]
#[command(about = "Synchronous bridge over the MVola merchant-pay API", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn load(args: &Args) -> Result<BridgeConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => {
            let mut config = BridgeConfig::default();
            config::apply_env_overrides(&mut config);
            config
        }
    };
    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load(&args)?;

    init_tracing(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mvola-bridge starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        gateway = %config.gateway.base_url,
        callback_wait_secs = config.transactions.callback_wait_secs,
        fallback = ?config.transactions.fallback,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
