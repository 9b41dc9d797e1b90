//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load mappings (fatal on failure) → Bind listener → Build coordinator
//!
//! Running (coordinator.rs):
//!     HTTP server task ─┐
//!     signal watchers ──┼─▶ LifecycleEvent channel ─▶ coordinator loop
//!     file watcher ─────┘         Reload   → load off-thread → publish snapshot
//!                                 Shutdown → stop accepting → drain (bounded) → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown event (a second one ends the drain early)
//!     SIGHUP → Reload event
//! ```
//!
//! # Design Decisions
//! - Triggers are messages, so tests inject them without OS signals
//! - Reloads run one at a time on the coordinator; a failed reload keeps the live snapshot
//! - Shutdown has timeout: forced exit after deadline

pub mod coordinator;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use coordinator::{
    CoordinatorError, EventError, LifecycleCoordinator, LifecycleEvent, LifecycleHandle,
    LifecycleState, ReloadError, ReloadSummary,
};
pub use shutdown::Shutdown;
pub use startup::{start, StartupError};
