//! Path redirect service library.
//!
//! Maps request paths to destination URLs listed in a flat mapping file and
//! answers with a `302 Found`, a redirect to a default destination, or a 404.
//! The mapping reloads on SIGHUP without dropping in-flight requests.

// Core subsystems
pub mod config;
pub mod http;
pub mod mapping;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::{LifecycleCoordinator, LifecycleHandle, LifecycleState, Shutdown};
pub use mapping::{MappingLoader, MappingSnapshot, MappingStore};
pub use routing::{RedirectDecision, RedirectResolver};
