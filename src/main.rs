//! gothere: redirect request paths to destinations listed in `urls.txt`.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                    GOTHERE                       │
//!                 │                                                  │
//!   Client ───────┼─▶ net::listener ─▶ http::server ─▶ routing      │
//!   Request       │                                   │ resolver    │
//!                 │                                   ▼             │
//!   302 / 404 ◀───┼── http::response ◀──── mapping::store (ArcSwap)  │
//!                 │                                   ▲             │
//!                 │                                   │ publish     │
//!   SIGHUP ───────┼─▶ lifecycle::signals ─▶ coordinator ─▶ loader    │
//!   SIGTERM/INT ──┼─▶ lifecycle::signals ─▶ coordinator ─▶ drain     │
//!                 └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use gothere::config::cli::Cli;
use gothere::lifecycle;
use gothere::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        port = config.listener.port,
        mappings = %config.mappings_path.display(),
        default_url = config.default_destination().unwrap_or(""),
        "gothere starting"
    );

    if let Some(addr) = config.metrics.address {
        if let Err(e) = metrics::init_exporter(addr) {
            tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter");
        }
    }

    let mut coordinator = match lifecycle::start(config).await {
        Ok(coordinator) => coordinator,
        Err(e) => {
            tracing::error!(error = %e, "Fatal startup error");
            return Err(e.into());
        }
    };

    if let Err(e) = coordinator.install_signal_watchers() {
        tracing::error!(error = %e, "Fatal startup error");
        return Err(e.into());
    }

    if let Err(e) = coordinator.run().await {
        tracing::error!(error = %e, "Service stopped unexpectedly");
        return Err(e.into());
    }

    Ok(())
}
