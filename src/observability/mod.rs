//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and gauges via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every resolution is logged with client address, path, destination and status
//! - Metrics are no-ops until an exporter is installed
//! - Counters live for the process only; nothing is persisted

pub mod logging;
pub mod metrics;
