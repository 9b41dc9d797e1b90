//! Live mapping reference.
//!
//! # Responsibilities
//! - Hold the currently active snapshot
//! - Replace it in a single atomic step on reload
//! - Serve readers without locks
//!
//! # Design Decisions
//! - `ArcSwap` rather than `RwLock`: readers never wait on a publish
//! - A publish never touches the old snapshot; in-flight readers keep their `Arc`
//! - Generation counter is advisory (logging, tests), not part of the swap

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};

use crate::mapping::snapshot::MappingSnapshot;

/// Cloneable handle to the process-wide live snapshot.
#[derive(Debug, Clone)]
pub struct MappingStore {
    live: Arc<ArcSwap<MappingSnapshot>>,
    generation: Arc<AtomicU64>,
}

impl MappingStore {
    /// Create a store whose first generation is `initial`.
    pub fn new(initial: MappingSnapshot) -> Self {
        Self {
            live: Arc::new(ArcSwap::from_pointee(initial)),
            generation: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Replace the live snapshot. Returns the new generation number.
    pub fn publish(&self, snapshot: MappingSnapshot) -> u64 {
        let entries = snapshot.len();
        self.live.store(Arc::new(snapshot));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        tracing::debug!(generation, entries, "Mapping snapshot published");
        generation
    }

    /// The live snapshot, as an owned reference that outlives later publishes.
    pub fn current(&self) -> Arc<MappingSnapshot> {
        self.live.load_full()
    }

    /// Cheap short-lived access for the request path.
    pub fn peek(&self) -> Guard<Arc<MappingSnapshot>> {
        self.live.load()
    }

    /// Number of snapshots published so far, counting the initial one.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for MappingStore {
    fn default() -> Self {
        Self::new(MappingSnapshot::empty())
    }
}
