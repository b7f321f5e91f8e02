//! LoadCache - memoized children per PathKey plus the in-flight set
//!
//! A key is loaded at most once until it is explicitly invalidated. Every
//! `begin_load` hands out a fresh fetch token and the in-flight map records
//! it, so a completion that arrives after its marker was dropped (refresh,
//! filter change) or replaced by a newer fetch is recognised and discarded
//! instead of landing on stale state.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::node::Node;
use super::path::PathKey;

/// Identifies one fetch of one key
pub type FetchToken = u64;

#[derive(Debug, Default, Clone)]
pub struct LoadCache {
    entries: HashMap<PathKey, Vec<Arc<Node>>>,
    in_flight: HashMap<PathKey, FetchToken>,
    next_token: FetchToken,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached children of `path`, no side effects
    pub fn get(&self, path: &str) -> Option<&[Arc<Node>]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn is_in_flight(&self, path: &str) -> bool {
        self.in_flight.contains_key(path)
    }

    /// Check-and-mark. Returns `None` (caller must not fetch) when the key is
    /// already cached or already being fetched.
    pub fn begin_load(&mut self, path: &PathKey) -> Option<FetchToken> {
        if self.entries.contains_key(path.as_str()) || self.in_flight.contains_key(path.as_str())
        {
            return None;
        }
        self.next_token += 1;
        let token = self.next_token;
        self.in_flight.insert(path.clone(), token);
        debug!(path = %path, token, "load started");
        Some(token)
    }

    /// Store a finished fetch. Returns `false` and discards the children when
    /// the marker for `token` is gone (invalidated or superseded meanwhile).
    pub fn complete_load(
        &mut self,
        path: &PathKey,
        token: FetchToken,
        children: Vec<Arc<Node>>,
    ) -> bool {
        if self.in_flight.get(path.as_str()) != Some(&token) {
            debug!(path = %path, token, "discarding stale load completion");
            return false;
        }
        self.in_flight.remove(path.as_str());

        if self.entries.contains_key(path.as_str()) {
            warn!(path = %path, "load completed for a key that is already cached, keeping cached entry");
            return false;
        }
        debug!(path = %path, children = children.len(), "load completed");
        self.entries.insert(path.clone(), children);
        true
    }

    /// Clear the in-flight marker without caching anything, so the next
    /// expand retries. Markers of other fetches are left alone.
    pub fn fail_load(&mut self, path: &PathKey, token: FetchToken) -> bool {
        if self.in_flight.get(path.as_str()) == Some(&token) {
            self.in_flight.remove(path.as_str());
            true
        } else {
            false
        }
    }

    /// Drop `path` and every descendant key from the cache and the in-flight
    /// set. Returns the number of cache entries removed.
    pub fn invalidate(&mut self, path: &PathKey) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key, _| key != path && !path.is_ancestor_of(key));
        self.in_flight
            .retain(|key, _| key != path && !path.is_ancestor_of(key));
        let removed = before - self.entries.len();
        debug!(path = %path, removed, "cache invalidated");
        removed
    }

    /// Full reset
    pub fn invalidate_all(&mut self) {
        debug!(entries = self.entries.len(), in_flight = self.in_flight.len(), "cache cleared");
        self.entries.clear();
        self.in_flight.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::node::{materialize, NodeKind, NodeSpec, Scope};

    fn villages(parent: &PathKey, names: &[&str]) -> Vec<Arc<Node>> {
        let specs = names
            .iter()
            .map(|name| NodeSpec::new(NodeKind::Village, *name))
            .collect();
        materialize(parent, &Scope::default(), specs, &mut Vec::new())
    }

    #[test]
    fn test_begin_load_is_at_most_once() {
        let mut cache = LoadCache::new();
        let path = PathKey::root().derive("Taluka: Haveli");

        let token = cache.begin_load(&path).unwrap();
        assert_eq!(cache.begin_load(&path), None);
        assert!(cache.is_in_flight(path.as_str()));

        assert!(cache.complete_load(&path, token, villages(&path, &["Wagholi"])));
        assert!(!cache.is_in_flight(path.as_str()));
        // cached keys are never fetched again
        assert_eq!(cache.begin_load(&path), None);
        assert_eq!(cache.get(path.as_str()).map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_fail_load_allows_retry() {
        let mut cache = LoadCache::new();
        let path = PathKey::root().derive("Salesman: Rao");

        let token = cache.begin_load(&path).unwrap();
        assert!(cache.fail_load(&path, token));
        assert!(cache.get(path.as_str()).is_none());
        let retry = cache.begin_load(&path).unwrap();
        assert_ne!(retry, token);
    }

    #[test]
    fn test_superseded_completion_is_discarded() {
        let mut cache = LoadCache::new();
        let path = PathKey::root().derive("Salesman: Rao");

        let old = cache.begin_load(&path).unwrap();
        cache.invalidate_all();
        let new = cache.begin_load(&path).unwrap();

        // the first fetch lands late
        assert!(!cache.complete_load(&path, old, villages(&path, &["Old"])));
        assert!(!cache.fail_load(&path, old));
        assert!(cache.is_in_flight(path.as_str()));

        assert!(cache.complete_load(&path, new, villages(&path, &["New"])));
        assert_eq!(cache.get(path.as_str()).unwrap()[0].label, "New");
    }

    #[test]
    fn test_subtree_invalidation_orphans_running_fetch() {
        let mut cache = LoadCache::new();
        let parent = PathKey::root().derive("Salesman: Rao");
        let child = parent.derive("District: Pune");

        let old = cache.begin_load(&child).unwrap();
        cache.invalidate(&parent);
        assert!(!cache.is_in_flight(child.as_str()));
        let new = cache.begin_load(&child).unwrap();

        assert!(!cache.complete_load(&child, old, villages(&child, &["Old"])));
        assert!(cache.complete_load(&child, new, villages(&child, &["New"])));
        assert_eq!(cache.get(child.as_str()).unwrap()[0].label, "New");
    }

    #[test]
    fn test_empty_result_is_cached() {
        let mut cache = LoadCache::new();
        let path = PathKey::root().derive("Village: Wagholi");
        let token = cache.begin_load(&path).unwrap();
        assert!(cache.complete_load(&path, token, Vec::new()));
        assert_eq!(cache.get(path.as_str()).map(<[_]>::len), Some(0));
    }

    #[test]
    fn test_invalidate_removes_descendants_only() {
        let mut cache = LoadCache::new();
        let a = PathKey::root().derive("A");
        let ab = a.derive("B");
        let other = PathKey::root().derive("AB");

        for key in [&a, &ab, &other] {
            let token = cache.begin_load(key).unwrap();
            assert!(cache.complete_load(key, token, Vec::new()));
        }

        assert_eq!(cache.invalidate(&a), 2);
        assert!(!cache.contains(a.as_str()));
        assert!(!cache.contains(ab.as_str()));
        assert!(cache.contains(other.as_str()));
    }
}
