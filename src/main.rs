//! Standalone Device Catalog.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                   DEVICE CATALOG                      │
//!                 │                                                       │
//!   HTTP clients ─┼─▶ http::server (static files + catalog API routes)    │
//!                 │                                                       │
//!                 │  registration::descriptor ─▶ registrar (per target) ──┼──▶ service catalog A
//!                 │                              registrar (per target) ──┼──▶ service catalog B
//!                 │  discovery::announcer ─────────────────────────────── ┼──▶ mDNS (DNS-SD)
//!                 │                                                       │
//!   SIGTERM ──────┼─▶ lifecycle::shutdown: stop all, wait ≤ grace, exit 0 │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tokio::net::TcpListener;

use device_catalog::config::{load_config, ObservabilityConfig};
use device_catalog::http::HttpServer;
use device_catalog::lifecycle::startup::start_registration;
use device_catalog::lifecycle::{Shutdown, ShutdownCoordinator, TerminationSignals};
use device_catalog::observability::{logging, metrics};
use device_catalog::registration::RegistrationDescriptor;

#[derive(Parser)]
#[command(name = "device-catalog")]
#[command(about = "Device Catalog with service catalog self-registration", long_about = None)]
struct Args {
    /// Device catalog configuration file path
    #[arg(long, default_value = "conf/device-catalog.toml")]
    conf: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(&args.conf) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&ObservabilityConfig::default());
            tracing::error!(path = %args.conf.display(), error = %e, "Error reading config file");
            return Err(e.into());
        }
    };

    logging::init(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        targets = config.service_catalog.len(),
        dnssd = config.dnssd_enabled,
        "device-catalog starting"
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

    // Everything fallible and fatal happens before the first registration.
    let descriptor = RegistrationDescriptor::from_config(&config)?;
    let server = HttpServer::new(config.clone())?;
    let signals = TerminationSignals::install()?;
    let listener = TcpListener::bind(config.bind_address()).await?;

    let shutdown = Shutdown::new();
    let mut coordinator = ShutdownCoordinator::new(config.shutdown.grace_period(), shutdown.clone());
    start_registration(&config, &descriptor, &mut coordinator);

    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let mut server_failed = false;
    let trigger = async {
        tokio::select! {
            signal = signals.recv() => signal,
            result = &mut server_task => {
                match result {
                    Ok(Ok(())) => tracing::error!("HTTP server exited unexpectedly"),
                    Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
                    Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
                }
                server_failed = true;
                "server failure"
            }
        }
    };
    coordinator.run(trigger).await;

    // Abandon whatever is still withdrawing.
    process::exit(if server_failed { 1 } else { 0 })
}
