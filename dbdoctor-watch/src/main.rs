//! DB-Doctor alert watcher
//!
//! Follows the real-time alert stream of a DB-Doctor server and prints each
//! alert as it fires or resolves.

mod config;
mod output;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use config::{ConfigLoader, Overrides};
use dbdoctor_core::channel::{ChannelState, ChannelStatus};
use dbdoctor_core::runtime::AlertChannel;
use output::{AlertPrinter, OutputFormat};
use shutdown::{shutdown_signal, spawn_config_reload_handler};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// DB-Doctor alert watcher - prints slow-query alerts as they happen
#[derive(Parser, Debug)]
#[command(name = "dbdoctor-watch")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file [default: ./dbdoctor-watch.toml if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Alert stream URL (ws:// or wss://), overrides the config file
    #[arg(short, long, env = "DBDOCTOR_ALERTS_URL")]
    url: Option<Url>,

    /// Output format for alerts, overrides the config file
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Emit logs as JSON
    #[arg(long, default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.log_json);

    tracing::info!("Starting dbdoctor-watch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(
        args.config,
        Overrides {
            url: args.url,
            output: args.output,
        },
    ));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    match config_loader.source() {
        Some(path) => tracing::info!("Configuration loaded from {:?}", path),
        None => tracing::info!("No configuration file, using defaults"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (channel, driver) = AlertChannel::spawn(&loaded_config.channel, shutdown_rx);

    let printer = AlertPrinter::new(loaded_config.output.clone());
    let _subscription = channel.on_event(move |alert| printer.print(alert));

    tokio::spawn(log_status_changes(channel.watch_status()));

    tracing::info!(endpoint = %loaded_config.endpoint, "Connecting to alert stream");
    channel.connect(loaded_config.endpoint.clone()).await?;

    // Spawn config reload handler (listens for SIGHUP)
    let reload_notify =
        spawn_config_reload_handler(channel.clone(), config_loader, loaded_config)?;

    let result = shutdown_signal().await;

    reload_notify.notify_one();
    let _ = shutdown_tx.send(true);
    driver.await?;
    tracing::info!("dbdoctor-watch shutdown complete");

    result.map_err(Into::into)
}

async fn log_status_changes(mut status_rx: watch::Receiver<ChannelStatus>) {
    while status_rx.changed().await.is_ok() {
        let status = *status_rx.borrow_and_update();
        match status.state {
            ChannelState::Open => tracing::info!("Alert stream connected"),
            ChannelState::Reconnecting => tracing::info!(
                attempt = status.reconnect_attempts,
                "Alert stream lost, reconnecting"
            ),
            ChannelState::GivenUp => tracing::warn!(
                attempts = status.reconnect_attempts,
                "Alert stream unreachable, giving up. Send SIGHUP to retry"
            ),
            ChannelState::Idle | ChannelState::Connecting => {
                tracing::debug!(state = %status.state, "Alert stream state changed")
            }
        }
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
///
/// Logs go to stderr so stdout carries only alerts.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tokio_tungstenite=warn,tungstenite=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
