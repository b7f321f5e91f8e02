//! Child loaders - pluggable async fetch strategies per node kind
//!
//! The explorer never talks to a backend directly. When an uncached node is
//! expanded it looks up the loader registered for the node's kind and awaits
//! it. Loaders must be idempotent for equal filters; that is what makes the
//! cache valid.

mod dimension;
pub mod grouping;
pub mod source;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LoadError;
use crate::explorer::node::{KindTag, Node};
use crate::filters::Filters;

pub use dimension::{DimensionLoader, MeasureRule, OrderLeafLoader};
pub use grouping::{group_orders, Group, Grouping};
pub use source::{InMemoryOrderSource, Measure, OrderPredicate, OrderRecord, OrderSource};

/// Fetches the children of one node
#[async_trait]
pub trait ChildLoader: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn load(&self, node: &Node, filters: &Filters) -> Result<Vec<Arc<Node>>, LoadError>;
}

/// Loader per node kind
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: BTreeMap<KindTag, Arc<dyn ChildLoader>>,
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (tag, loader) in &self.loaders {
            map.entry(tag, &loader.name());
        }
        map.finish()
    }
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the loader for a kind
    pub fn register(&mut self, kind: KindTag, loader: Arc<dyn ChildLoader>) -> &mut Self {
        self.loaders.insert(kind, loader);
        self
    }

    pub fn with(mut self, kind: KindTag, loader: Arc<dyn ChildLoader>) -> Self {
        self.register(kind, loader);
        self
    }

    pub fn get(&self, kind: KindTag) -> Option<Arc<dyn ChildLoader>> {
        self.loaders.get(&kind).cloned()
    }

    /// Resolve the loader for `node`, or the error a missing one produces
    pub fn for_node(&self, node: &Node) -> Result<Arc<dyn ChildLoader>, LoadError> {
        let tag = node.kind.tag();
        self.get(tag).ok_or_else(|| LoadError::NoLoader {
            kind: tag.to_string(),
        })
    }

    pub fn kinds(&self) -> impl Iterator<Item = KindTag> + '_ {
        self.loaders.keys().copied()
    }
}
