//! Lifecycle coordination.
//!
//! # Responsibilities
//! - Own every concurrent unit: HTTP server, signal watchers, file watcher
//! - Drive `Starting → Running → Stopping → Stopped`
//! - Apply reload and shutdown events in arrival order
//!
//! # Design Decisions
//! - A reload builds the new snapshot on a blocking thread, then publishes it in one swap
//! - A failed reload is logged and leaves the live snapshot untouched
//! - The drain after a shutdown trigger is bounded by the configured grace period

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinSet};

use crate::config::watcher::MappingWatcher;
use crate::config::ServerConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::lifecycle::startup::StartupError;
use crate::mapping::{LoadError, MappingLoader, MappingStore};
use crate::observability::metrics;
use crate::routing::RedirectResolver;

const EVENT_QUEUE_DEPTH: usize = 16;

/// Lifecycle phase of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// A trigger delivered to the coordinator.
#[derive(Debug)]
pub enum LifecycleEvent {
    /// Reload the mapping source. `ack` receives the outcome when present.
    Reload {
        ack: Option<oneshot::Sender<Result<ReloadSummary, LoadError>>>,
    },
    /// Stop accepting, drain, stop. A second one while draining ends the drain.
    Shutdown,
}

/// What a successful reload published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSummary {
    pub entries: usize,
    pub anomalies: usize,
    pub generation: u64,
}

/// The coordinator has stopped listening for events.
#[derive(Debug, Error)]
#[error("lifecycle coordinator is no longer running")]
pub struct EventError;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Stopped(#[from] EventError),
}

/// The coordinator ended for a reason other than a shutdown trigger.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("HTTP server failed: {0}")]
    Serve(#[from] std::io::Error),
    #[error("HTTP server task failed: {0}")]
    ServerTask(#[from] JoinError),
    #[error("HTTP server exited without a shutdown trigger")]
    ServerExited,
}

/// Cloneable control surface for a coordinator.
#[derive(Debug, Clone)]
pub struct LifecycleHandle {
    events: mpsc::Sender<LifecycleEvent>,
    state: watch::Receiver<LifecycleState>,
    store: MappingStore,
    local_addr: SocketAddr,
}

impl LifecycleHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Sender for units that produce events of their own.
    pub fn events(&self) -> mpsc::Sender<LifecycleEvent> {
        self.events.clone()
    }

    /// Reload and wait for the outcome.
    pub async fn reload(&self) -> Result<ReloadSummary, ReloadError> {
        let (ack, outcome) = oneshot::channel();
        self.events
            .send(LifecycleEvent::Reload { ack: Some(ack) })
            .await
            .map_err(|_| EventError)?;
        let result = outcome.await.map_err(|_| EventError)?;
        Ok(result?)
    }

    /// Queue a shutdown trigger.
    pub async fn shutdown(&self) -> Result<(), EventError> {
        self.events
            .send(LifecycleEvent::Shutdown)
            .await
            .map_err(|_| EventError)
    }

    /// Wait until the coordinator reaches `target` or a later state.
    pub async fn wait_for(&self, target: LifecycleState) -> LifecycleState {
        let mut state = self.state.clone();
        let reached = match state.wait_for(|current| *current >= target).await {
            Ok(reached) => Some(*reached),
            Err(_) => None,
        };
        reached.unwrap_or_else(|| *state.borrow())
    }
}

/// Loads the mapping source and publishes the result.
#[derive(Debug, Clone)]
pub struct Reloader {
    loader: MappingLoader,
    store: MappingStore,
}

impl Reloader {
    pub fn new(loader: MappingLoader, store: MappingStore) -> Self {
        Self { loader, store }
    }

    /// Load off the async workers, then publish. The live snapshot is only
    /// replaced after the load has completed in full.
    pub async fn reload(&self) -> Result<ReloadSummary, LoadError> {
        let path = self.loader.path().to_path_buf();
        tracing::info!(path = %path.display(), "Reloading mappings");

        let loader = self.loader.clone();
        let loaded = match tokio::task::spawn_blocking(move || loader.load()).await {
            Ok(result) => result,
            Err(e) => Err(LoadError::Interrupted {
                path,
                reason: e.to_string(),
            }),
        };

        match loaded {
            Ok(outcome) => {
                let entries = outcome.entries();
                let anomalies = outcome.anomalies.len();
                let generation = self.store.publish(outcome.snapshot);

                metrics::record_reload(true);
                metrics::set_mapping_entries(entries);
                tracing::info!(generation, entries, anomalies, "Mappings reloaded");

                Ok(ReloadSummary {
                    entries,
                    anomalies,
                    generation,
                })
            }
            Err(e) => {
                metrics::record_reload(false);
                tracing::error!(
                    error = %e,
                    generation = self.store.generation(),
                    "Reload failed; keeping previous mappings"
                );
                Err(e)
            }
        }
    }
}

/// Owns the process-scoped state and every concurrent unit.
pub struct LifecycleCoordinator {
    config: Arc<ServerConfig>,
    reloader: Reloader,
    store: MappingStore,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Shutdown,
    events_tx: mpsc::Sender<LifecycleEvent>,
    events_rx: mpsc::Receiver<LifecycleEvent>,
    state: watch::Sender<LifecycleState>,
    units: JoinSet<()>,
    file_watcher: Option<notify::RecommendedWatcher>,
}

impl LifecycleCoordinator {
    /// Assemble a coordinator from the results of startup.
    pub fn new(
        config: Arc<ServerConfig>,
        loader: MappingLoader,
        store: MappingStore,
        listener: TcpListener,
        local_addr: SocketAddr,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (state, _) = watch::channel(LifecycleState::Starting);

        Self {
            config,
            reloader: Reloader::new(loader, store.clone()),
            store,
            listener,
            local_addr,
            shutdown: Shutdown::new(),
            events_tx,
            events_rx,
            state,
            units: JoinSet::new(),
            file_watcher: None,
        }
    }

    pub fn handle(&self) -> LifecycleHandle {
        LifecycleHandle {
            events: self.events_tx.clone(),
            state: self.state.subscribe(),
            store: self.store.clone(),
            local_addr: self.local_addr,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Register the OS reload and shutdown watchers.
    pub fn install_signal_watchers(&mut self) -> Result<(), StartupError> {
        let reload = signals::reload_watcher(self.events_tx.clone()).map_err(StartupError::Signals)?;
        let shutdown = signals::shutdown_watcher(self.events_tx.clone()).map_err(StartupError::Signals)?;
        self.units.spawn(reload);
        self.units.spawn(shutdown);
        tracing::debug!("Signal watchers registered");
        Ok(())
    }

    /// Reload whenever the mapping file changes on disk.
    pub fn watch_mapping_file(&mut self) -> Result<(), StartupError> {
        let watcher = MappingWatcher::new(&self.config.mappings_path, self.events_tx.clone()).run()?;
        self.file_watcher = Some(watcher);
        Ok(())
    }

    /// Run an additional unit that is stopped together with the coordinator.
    pub fn spawn_unit<F>(&mut self, unit: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.units.spawn(unit);
    }

    /// Serve until a shutdown trigger, then drain and stop every unit.
    pub async fn run(self) -> Result<(), CoordinatorError> {
        let LifecycleCoordinator {
            config,
            reloader,
            store,
            listener,
            local_addr,
            shutdown,
            events_tx,
            mut events_rx,
            state,
            mut units,
            file_watcher,
        } = self;

        let resolver = RedirectResolver::new(store, config.default_destination());
        let server = HttpServer::new(resolver, &config);
        let in_flight = server.in_flight();
        let (terminate, terminate_rx) = oneshot::channel();
        let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe(), terminate_rx));

        transition(&state, LifecycleState::Running);
        tracing::info!(
            address = %local_addr,
            pid = std::process::id(),
            default_url = config.default_destination().unwrap_or(""),
            "Serving redirects"
        );

        let mut server_done = false;
        let outcome = loop {
            tokio::select! {
                event = events_rx.recv() => match event {
                    Some(LifecycleEvent::Reload { ack }) => {
                        let result = reloader.reload().await;
                        if let Some(ack) = ack {
                            let _ = ack.send(result);
                        }
                    }
                    Some(LifecycleEvent::Shutdown) | None => break Ok(()),
                },
                joined = &mut server_task => {
                    server_done = true;
                    break Err(match joined {
                        Ok(Ok(())) => CoordinatorError::ServerExited,
                        Ok(Err(e)) => CoordinatorError::Serve(e),
                        Err(e) => CoordinatorError::ServerTask(e),
                    });
                }
            }
        };

        transition(&state, LifecycleState::Stopping);
        let notified = shutdown.trigger();
        tracing::debug!(receivers = notified, "Shutdown broadcast sent");

        if !server_done {
            let grace = config.timeouts.shutdown_grace();
            let drained = tokio::select! {
                joined = &mut server_task => Some(joined),
                _ = tokio::time::sleep(grace) => {
                    tracing::warn!(
                        in_flight = in_flight.active(),
                        grace_secs = grace.as_secs(),
                        "Grace period elapsed; terminating remaining connections"
                    );
                    None
                }
                _ = next_shutdown(&mut events_rx) => {
                    tracing::warn!(
                        in_flight = in_flight.active(),
                        "Repeated shutdown trigger; terminating remaining connections"
                    );
                    None
                }
            };

            let joined = match drained {
                Some(joined) => joined,
                None => {
                    // The server aborts its connections and returns once they are closed.
                    let _ = terminate.send(());
                    server_task.await
                }
            };
            match joined {
                Ok(Ok(())) => tracing::info!("In-flight requests finished"),
                Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed while draining"),
                Err(e) => tracing::error!(error = %e, "HTTP server task failed while draining"),
            }
        }

        drop(file_watcher);
        units.abort_all();
        while units.join_next().await.is_some() {}
        drop(events_tx);

        transition(&state, LifecycleState::Stopped);
        tracing::info!(requests = in_flight.total(), "Shutdown complete");
        outcome
    }
}

fn transition(state: &watch::Sender<LifecycleState>, next: LifecycleState) {
    let previous = state.send_replace(next);
    tracing::info!(from = %previous, to = %next, "Lifecycle state changed");
}

/// Resolves on the next shutdown trigger; reload requests are dropped.
async fn next_shutdown(events: &mut mpsc::Receiver<LifecycleEvent>) {
    loop {
        match events.recv().await {
            Some(LifecycleEvent::Shutdown) => return,
            Some(LifecycleEvent::Reload { .. }) => {
                tracing::debug!("Ignoring reload request during shutdown");
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    use crate::lifecycle::startup::start;
    use crate::routing::RedirectDecision;

    fn write_mappings(file: &mut tempfile::NamedTempFile, lines: &[&str]) {
        let f = file.as_file_mut();
        f.set_len(0).unwrap();
        std::io::Seek::rewind(f).unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        f.flush().unwrap();
    }

    fn config_for(path: &std::path::Path) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.listener.bind = "127.0.0.1".parse().unwrap();
        config.listener.port = 0;
        config.mappings_path = path.to_path_buf();
        config.default_url = String::new();
        config.timeouts.shutdown_grace_secs = 5;
        config
    }

    #[tokio::test]
    async fn reload_publishes_new_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_mappings(&mut file, &["/a http://old.test"]);

        let coordinator = start(config_for(file.path())).await.unwrap();
        let handle = coordinator.handle();
        let running = tokio::spawn(coordinator.run());
        assert_eq!(handle.wait_for(LifecycleState::Running).await, LifecycleState::Running);

        write_mappings(&mut file, &["/a http://new.test", "/b http://b.test", "/bad"]);
        let summary = handle.reload().await.unwrap();
        assert_eq!(summary, ReloadSummary { entries: 2, anomalies: 1, generation: 2 });

        let resolver = RedirectResolver::new(handle.store().clone(), None);
        assert_eq!(resolver.resolve("/A"), RedirectDecision::Found("http://new.test".into()));

        handle.shutdown().await.unwrap();
        running.await.unwrap().unwrap();
        assert_eq!(handle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "/keep http://kept.test\n").unwrap();

        let coordinator = start(config_for(&path)).await.unwrap();
        let handle = coordinator.handle();
        let running = tokio::spawn(coordinator.run());

        std::fs::remove_file(&path).unwrap();
        let err = handle.reload().await.unwrap_err();
        assert!(matches!(err, ReloadError::Load(LoadError::Read { .. })));

        assert_eq!(handle.store().generation(), 1);
        assert_eq!(handle.store().current().get("/keep"), Some("http://kept.test"));

        handle.shutdown().await.unwrap();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_stops_extra_units() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_mappings(&mut file, &["/a http://a.test"]);

        let mut coordinator = start(config_for(file.path())).await.unwrap();
        let (dropped_tx, dropped_rx) = oneshot::channel::<()>();
        coordinator.spawn_unit(async move {
            let _dropped = dropped_tx;
            std::future::pending::<()>().await
        });

        let handle = coordinator.handle();
        let running = tokio::spawn(coordinator.run());
        handle.shutdown().await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        // The unit's sender was dropped when it was aborted.
        assert!(dropped_rx.await.is_err());
        assert!(handle.reload().await.is_err());
    }

    #[test]
    fn states_are_ordered() {
        assert!(LifecycleState::Starting < LifecycleState::Running);
        assert!(LifecycleState::Running < LifecycleState::Stopping);
        assert!(LifecycleState::Stopping < LifecycleState::Stopped);
        assert_eq!(LifecycleState::Stopping.to_string(), "stopping");
    }
}
