//! Immutable path → destination table.

use std::collections::HashMap;

/// A fully built mapping table.
///
/// Keys are stored lower-cased; lookups lower-case the requested path, so
/// matching is exact but case-insensitive. Destinations are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingSnapshot {
    entries: HashMap<String, String>,
}

impl MappingSnapshot {
    /// An empty table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a request path.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(&path.to_lowercase()).map(String::as_str)
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a mapping while the snapshot is still being built, returning the
    /// destination it replaced. Only the loader constructs snapshots, and it
    /// hands them over by value, so nothing can observe this mutation.
    pub(crate) fn insert(&mut self, key: String, destination: String) -> Option<String> {
        self.entries.insert(key, destination)
    }
}

impl<K, V> FromIterator<(K, V)> for MappingSnapshot
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut snapshot = Self::empty();
        for (key, destination) in iter {
            snapshot.insert(key.as_ref().trim().to_lowercase(), destination.into());
        }
        snapshot
    }
}
