//! Mapping subsystem.
//!
//! # Data Flow
//! ```text
//! urls.txt
//!     → loader.rs (trim, skip comments, split, lower-case keys)
//!     → snapshot.rs (fully built, immutable table)
//!     → store.rs (single atomic swap of Arc<MappingSnapshot>)
//!     → readers load the current Arc per request, never blocking
//!
//! On reload:
//!     loader.rs builds a new snapshot off to the side
//!     → store.rs publishes it in one step
//!     → requests already holding the old Arc finish against it
//! ```
//!
//! # Design Decisions
//! - Snapshots are never mutated after construction; reload means replacement
//! - Line-level anomalies are reported, not propagated as failures
//! - Only an unreadable source is an error

pub mod loader;
pub mod snapshot;
pub mod store;

pub use loader::{Anomaly, LoadError, LoadOutcome, MappingLoader};
pub use snapshot::MappingSnapshot;
pub use store::MappingStore;
