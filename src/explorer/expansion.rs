//! ExpansionSet - which nodes are currently expanded
//!
//! Alongside the flat set, a parent -> expanded-children index is kept so a
//! cascading collapse only visits the expanded descendants of the collapsed
//! node instead of scanning every expanded key.

use std::collections::{HashMap, HashSet};

use super::path::PathKey;

#[derive(Debug, Default, Clone)]
pub struct ExpansionSet {
    expanded: HashSet<PathKey>,
    /// Expanded keys grouped under their parent key
    children: HashMap<PathKey, HashSet<PathKey>>,
}

impl ExpansionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    /// Returns `false` if the key was already present
    pub fn insert(&mut self, path: PathKey) -> bool {
        if self.expanded.contains(path.as_str()) {
            return false;
        }
        if let Some(parent) = path.parent() {
            self.children.entry(parent).or_default().insert(path.clone());
        }
        self.expanded.insert(path)
    }

    /// Remove `path` and every expanded descendant. Returns the removed keys,
    /// `path` first when it was present.
    pub fn remove_cascading(&mut self, path: &PathKey) -> Vec<PathKey> {
        let mut removed = Vec::new();

        if let Some(parent) = path.parent() {
            if let Some(siblings) = self.children.get_mut(parent.as_str()) {
                siblings.remove(path.as_str());
                if siblings.is_empty() {
                    self.children.remove(parent.as_str());
                }
            }
        }

        let mut stack = vec![path.clone()];
        while let Some(key) = stack.pop() {
            if let Some(taken) = self.expanded.take(key.as_str()) {
                removed.push(taken);
            }
            if let Some(expanded_children) = self.children.remove(key.as_str()) {
                stack.extend(expanded_children);
            }
        }

        removed
    }

    pub fn clear(&mut self) {
        self.expanded.clear();
        self.children.clear();
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathKey> {
        self.expanded.iter()
    }

    /// Expanded keys in lexical order, for stable output
    pub fn sorted(&self) -> Vec<PathKey> {
        let mut keys: Vec<_> = self.expanded.iter().cloned().collect();
        keys.sort();
        keys
    }
}
