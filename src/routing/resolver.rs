//! Path → redirect decision.
//!
//! # Responsibilities
//! - Look up the request path in the current snapshot
//! - Fall back to the default destination on a miss
//! - Report the outcome as a typed decision
//!
//! # Design Decisions
//! - Reads the live snapshot once per call; a concurrent reload affects the
//!   next call, never half of this one
//! - Immutable after construction (thread-safe without locks)

use std::sync::Arc;

use axum::http::StatusCode;

use crate::mapping::MappingStore;

/// What to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    /// The path is mapped.
    Found(String),
    /// No mapping; redirect to the configured default.
    DefaultRedirect(String),
    /// No mapping and no default.
    NotFound,
}

impl RedirectDecision {
    /// HTTP status for this decision.
    pub fn status(&self) -> StatusCode {
        match self {
            RedirectDecision::Found(_) | RedirectDecision::DefaultRedirect(_) => StatusCode::FOUND,
            RedirectDecision::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Redirect target, if any.
    pub fn destination(&self) -> Option<&str> {
        match self {
            RedirectDecision::Found(dest) | RedirectDecision::DefaultRedirect(dest) => Some(dest),
            RedirectDecision::NotFound => None,
        }
    }

    /// Label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            RedirectDecision::Found(_) => "found",
            RedirectDecision::DefaultRedirect(_) => "default",
            RedirectDecision::NotFound => "not_found",
        }
    }
}

/// Resolves request paths against the live mapping.
#[derive(Debug, Clone)]
pub struct RedirectResolver {
    store: MappingStore,
    default_destination: Option<Arc<str>>,
}

impl RedirectResolver {
    /// An empty `default_destination` disables the fallback.
    pub fn new(store: MappingStore, default_destination: Option<&str>) -> Self {
        Self {
            store,
            default_destination: default_destination.filter(|d| !d.is_empty()).map(Arc::from),
        }
    }

    pub fn resolve(&self, path: &str) -> RedirectDecision {
        let snapshot = self.store.peek();
        if let Some(dest) = snapshot.get(path) {
            return RedirectDecision::Found(dest.to_string());
        }

        match &self.default_destination {
            Some(default) => RedirectDecision::DefaultRedirect(default.to_string()),
            None => RedirectDecision::NotFound,
        }
    }

    pub fn default_destination(&self) -> Option<&str> {
        self.default_destination.as_deref()
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{MappingLoader, MappingSnapshot};
    use proptest::prelude::*;

    fn resolver(lines: &[&str], default: Option<&str>) -> RedirectResolver {
        let outcome = MappingLoader::parse(lines.iter().copied());
        RedirectResolver::new(MappingStore::new(outcome.snapshot), default)
    }

    #[test]
    fn mapped_path_matches_any_case() {
        let resolver = resolver(
            &["/foo http://example.com/foo", "/bar http://example.com/bar"],
            None,
        );

        let decision = resolver.resolve("/FOO");
        assert_eq!(decision, RedirectDecision::Found("http://example.com/foo".into()));
        assert_eq!(decision.status(), StatusCode::FOUND);
    }

    #[test]
    fn miss_uses_default() {
        let resolver = resolver(&["# comment", "", "/a http://x.test"], Some("http://fallback.test"));

        let decision = resolver.resolve("/missing");
        assert_eq!(decision, RedirectDecision::DefaultRedirect("http://fallback.test".into()));
        assert_eq!(decision.destination(), Some("http://fallback.test"));
        assert_eq!(decision.status(), StatusCode::FOUND);
    }

    #[test]
    fn miss_without_default_is_not_found() {
        let resolver = resolver(&["/a http://x.test"], Some(""));
        assert_eq!(resolver.default_destination(), None);

        let decision = resolver.resolve("/missing");
        assert_eq!(decision, RedirectDecision::NotFound);
        assert_eq!(decision.status(), StatusCode::NOT_FOUND);
        assert_eq!(decision.destination(), None);
    }

    #[test]
    fn no_prefix_matching() {
        let resolver = resolver(&["/docs http://docs.test"], None);
        assert_eq!(resolver.resolve("/docs/intro"), RedirectDecision::NotFound);
        assert_eq!(resolver.resolve("/doc"), RedirectDecision::NotFound);
    }

    #[test]
    fn sees_published_snapshot() {
        let resolver = resolver(&["/a http://old.test"], None);
        resolver
            .store()
            .publish([("/a", "http://new.test")].into_iter().collect::<MappingSnapshot>());

        assert_eq!(resolver.resolve("/a"), RedirectDecision::Found("http://new.test".into()));
    }

    proptest! {
        #[test]
        fn lookup_is_case_insensitive_and_value_verbatim(
            key in "/[a-zA-Z0-9_-]{1,16}",
            dest in "https?://[a-zA-Z]{1,10}\\.test/[a-zA-Z0-9]{0,8}",
            flips in proptest::collection::vec(any::<bool>(), 17),
        ) {
            let line = format!("{key} {dest}");
            let resolver = resolver(&[line.as_str()], None);

            let query: String = key
                .chars()
                .zip(flips.iter().cycle())
                .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
                .collect();

            prop_assert_eq!(resolver.resolve(&query), RedirectDecision::Found(dest));
        }
    }
}
