//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the initial mapping snapshot
//! - Bind the listener
//! - Assemble the coordinator, optionally with a mapping file watcher
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Mappings load before the port is bound (traffic only when ready)
//! - Signal watchers are registered by the caller, so tests can run without them

use std::sync::Arc;

use thiserror::Error;

use crate::config::ServerConfig;
use crate::lifecycle::coordinator::LifecycleCoordinator;
use crate::mapping::{LoadError, MappingLoader, MappingStore};
use crate::net::listener::{bind_listener, ListenerError};
use crate::observability::metrics;

/// Conditions that abort the process before it serves traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("initial mapping load failed: {0}")]
    Load(#[from] LoadError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to register signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error("failed to watch mapping file: {0}")]
    Watch(#[from] notify::Error),
}

/// Perform the `Starting` phase and return a coordinator ready to run.
pub async fn start(config: ServerConfig) -> Result<LifecycleCoordinator, StartupError> {
    let config = Arc::new(config);

    let loader = MappingLoader::new(&config.mappings_path);
    let outcome = loader.load()?;
    metrics::set_mapping_entries(outcome.entries());
    let store = MappingStore::new(outcome.snapshot);

    let addr = config.listener.socket_addr();
    let listener = bind_listener(addr).await?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { addr, source })?;

    let watch = config.watch_mappings;
    let mut coordinator = LifecycleCoordinator::new(config, loader, store, listener, local_addr);
    if watch {
        coordinator.watch_mapping_file()?;
    }

    Ok(coordinator)
}
