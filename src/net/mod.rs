//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Startup
//!     → listener.rs (bind configured address; failure is fatal)
//!     → Hand off to HTTP layer
//!
//! Per request:
//!     → connection.rs (in-flight tracking for shutdown reporting)
//! ```
//!
//! # Design Decisions
//! - Binding happens during startup so a taken port aborts before traffic
//! - In-flight requests are counted so a forced shutdown can report what it cut off

pub mod connection;
pub mod listener;
