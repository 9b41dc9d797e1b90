//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to lifecycle events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Registration happens up front so failures abort startup
//! - Each watcher stops once the coordinator stops listening
//! - SIGHUP is Unix-only; elsewhere the reload watcher idles

use std::future::Future;
use std::io;

use tokio::sync::mpsc;

use crate::lifecycle::coordinator::LifecycleEvent;

/// Register the reload trigger and return the unit that forwards it.
#[cfg(unix)]
pub fn reload_watcher(
    events: mpsc::Sender<LifecycleEvent>,
) -> io::Result<impl Future<Output = ()> + Send + 'static> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    Ok(async move {
        while hangup.recv().await.is_some() {
            tracing::info!(signal = "SIGHUP", "Reload signal received");
            if events.send(LifecycleEvent::Reload { ack: None }).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(not(unix))]
pub fn reload_watcher(
    events: mpsc::Sender<LifecycleEvent>,
) -> io::Result<impl Future<Output = ()> + Send + 'static> {
    tracing::warn!("Reload on SIGHUP is only supported on Unix platforms");
    Ok(async move {
        let _events = events;
        std::future::pending::<()>().await
    })
}

/// Register the shutdown triggers and return the unit that forwards them.
#[cfg(unix)]
pub fn shutdown_watcher(
    events: mpsc::Sender<LifecycleEvent>,
) -> io::Result<impl Future<Output = ()> + Send + 'static> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    Ok(async move {
        loop {
            let name = tokio::select! {
                Some(()) = terminate.recv() => "SIGTERM",
                Some(()) = interrupt.recv() => "SIGINT",
                else => break,
            };
            tracing::info!(signal = name, "Shutdown signal received");
            if events.send(LifecycleEvent::Shutdown).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(not(unix))]
pub fn shutdown_watcher(
    events: mpsc::Sender<LifecycleEvent>,
) -> io::Result<impl Future<Output = ()> + Send + 'static> {
    Ok(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(signal = "ctrl-c", "Shutdown signal received");
            if events.send(LifecycleEvent::Shutdown).await.is_err() {
                break;
            }
        }
    })
}
