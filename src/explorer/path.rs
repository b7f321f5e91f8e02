//! PathKey - canonical structural identity of a tree node
//!
//! A key is the root sentinel followed by every ancestor segment, joined
//! with [`SEPARATOR`]: `root.Salesman: Rao.District: Pune`.
//!
//! The key doubles as the cache key, the expansion-set member and the
//! renderer reconciliation key, so it must be stable for a logical node.
//! Equality and hashing look at the joined string only. Segment boundaries
//! are recorded at derivation time so `parent()` and `depth()` never have
//! to re-split a string whose labels may themselves contain the separator.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

/// Separator placed between segments
pub const SEPARATOR: char = '.';

/// Sentinel key of the root node
pub const ROOT_KEY: &str = "root";

/// Hierarchical node identity derived from ancestor labels
#[derive(Clone)]
pub struct PathKey {
    raw: String,
    /// Byte offset where each segment ends; `ends[0]` closes the root segment.
    ends: SmallVec<[usize; 8]>,
}

impl PathKey {
    /// The root sentinel key (`"root"`)
    pub fn root() -> Self {
        let mut ends = SmallVec::new();
        ends.push(ROOT_KEY.len());
        Self {
            raw: ROOT_KEY.to_string(),
            ends,
        }
    }

    /// Derive a child key: `parent + "." + segment`
    pub fn derive(&self, segment: &str) -> Self {
        let mut raw = String::with_capacity(self.raw.len() + 1 + segment.len());
        raw.push_str(&self.raw);
        raw.push(SEPARATOR);
        raw.push_str(segment);

        let mut ends = self.ends.clone();
        ends.push(raw.len());
        Self { raw, ends }
    }

    /// Parse a key received from outside the engine (e.g. a renderer event).
    ///
    /// Splitting is naive, so the recovered boundaries are only exact when no
    /// label contains the separator. Lookups are unaffected because equality
    /// ignores boundaries; the engine always continues with the key stored on
    /// the node it resolves.
    pub fn parse(key: &str) -> Self {
        let mut ends = SmallVec::new();
        for (offset, ch) in key.char_indices() {
            if ch == SEPARATOR {
                ends.push(offset);
            }
        }
        ends.push(key.len());
        Self {
            raw: key.to_string(),
            ends,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Depth below the root (root = 0)
    pub fn depth(&self) -> usize {
        self.ends.len() - 1
    }

    pub fn is_root(&self) -> bool {
        self.ends.len() == 1
    }

    /// Key of the parent node, `None` for the root
    pub fn parent(&self) -> Option<PathKey> {
        if self.is_root() {
            return None;
        }
        let mut ends = self.ends.clone();
        ends.pop();
        let cut = *ends.last()?;
        Some(Self {
            raw: self.raw[..cut].to_string(),
            ends,
        })
    }

    /// Segments from the root sentinel down to this node
    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        let mut start = 0;
        self.ends.iter().map(move |&end| {
            let segment = &self.raw[start..end];
            start = end + SEPARATOR.len_utf8();
            segment
        })
    }

    /// Final segment (the node's own qualified label)
    pub fn last_segment(&self) -> &str {
        let end = self.raw.len();
        let start = match self.ends.len() {
            1 => 0,
            n => self.ends[n - 2] + SEPARATOR.len_utf8(),
        };
        &self.raw[start..end]
    }

    /// True when `other` lies strictly below this key
    pub fn is_ancestor_of(&self, other: &PathKey) -> bool {
        let depth = self.depth();
        other.depth() > depth
            && other.ends[depth] == self.raw.len()
            && other.raw.starts_with(&self.raw)
    }

    /// String-level check used when only a raw key is at hand
    pub fn is_ancestor_of_str(&self, other: &str) -> bool {
        other.len() > self.raw.len()
            && other.starts_with(&self.raw)
            && other[self.raw.len()..].starts_with(SEPARATOR)
    }
}

impl PartialEq for PathKey {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PathKey {}

impl Hash for PathKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for PathKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl Borrow<str> for PathKey {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl AsRef<str> for PathKey {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathKey({:?})", self.raw)
    }
}

impl Serialize for PathKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for PathKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PathKey::parse(&raw))
    }
}
