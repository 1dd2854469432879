//! Edge governor gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                  EDGE GOVERNOR                    │
//!                          │                                                   │
//!   Client Request         │  ┌────────┐   ┌────────────┐   ┌──────────────┐  │
//!   ───────────────────────┼─▶│  http  │──▶│  governor  │──▶│   forward    │──┼──▶ Upstream
//!                          │  │ server │   │ rate limit │   │  (rewritten  │  │    application
//!                          │  └────────┘   │ tenant/www │   │   or as-is)  │  │
//!                          │               └─────┬──────┘   └──────────────┘  │
//!   Client Response        │                     │ 429 / 301                   │
//!   ◀──────────────────────┼─────────────────────┘                             │
//!                          │                                                   │
//!                          │  config (TOML + hot reload) · health monitor/SSE  │
//!                          │  admin API · metrics · structured logging         │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_governor::config::loader::{apply_env_overrides, load_config, MODE_ENV};
use edge_governor::config::validation::validate_config;
use edge_governor::config::watcher::ConfigWatcher;
use edge_governor::config::{ConfigError, GatewayConfig};
use edge_governor::lifecycle::signals::spawn_signal_handler;
use edge_governor::observability::{logging, metrics};
use edge_governor::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "edge-governor")]
#[command(about = "Edge request governor for multi-tenant web applications", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not reload the configuration file when it changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = GatewayConfig::default();
            apply_env_overrides(&mut config, std::env::var(MODE_ENV).ok().as_deref())?;
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("edge-governor v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        mode = config.governor.mode.as_str(),
        window_secs = config.rate_limit.window_secs,
        max_requests = config.rate_limit.max_requests,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (config_updates, _watcher) = match (&args.config, args.no_watch) {
        (Some(path), false) => {
            let (watcher, updates) = ConfigWatcher::new(path, &config);
            (updates, Some(watcher.run()?))
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let shutdown = Shutdown::new();
    spawn_signal_handler(&shutdown);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
