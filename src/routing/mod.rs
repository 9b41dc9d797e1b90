//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → resolver.rs (case-insensitive exact lookup in the live snapshot)
//!     → Found(destination) | DefaultRedirect(default) | NotFound
//! ```
//!
//! # Design Decisions
//! - Exact match only: no prefixes, no wildcards
//! - The default destination is fixed at startup and never reloaded
//! - A miss is a defined outcome, not an error

pub mod resolver;

pub use resolver::{RedirectDecision, RedirectResolver};
