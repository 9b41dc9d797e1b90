//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment and flags (cli.rs)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! Mapping file changes (optional):
//!     watcher.rs detects change
//!     → reload event sent to the lifecycle coordinator
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the mapping table reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::{ListenerConfig, LogFormat, LoggingConfig, MetricsConfig, ServerConfig, TimeoutConfig};
