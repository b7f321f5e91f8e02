//! Order-backed loader variants
//!
//! `DimensionLoader` fetches the orders under a node and aggregates them by
//! one or more dimensions. `OrderLeafLoader` returns the orders themselves.
//! Both accept an [`OrderPredicate`], which turns them into the
//! filter-then-aggregate variants used by the outstanding-balance tree.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::grouping::group_orders;
use super::source::{Measure, OrderPredicate, OrderRecord, OrderSource};
use super::ChildLoader;
use crate::error::LoadError;
use crate::explorer::node::{materialize, Dimension, Node, NodeKind, NodeSpec};
use crate::filters::Filters;

/// How a loader decides which amount to measure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureRule {
    Fixed(Measure),
    /// Follow the bucket the node sits under, falling back to the given
    /// measure outside any bucket
    FromBucket(Measure),
}

impl MeasureRule {
    pub fn resolve(self, node: &Node) -> Measure {
        match self {
            MeasureRule::Fixed(measure) => measure,
            MeasureRule::FromBucket(fallback) => node
                .scope
                .bucket
                .as_deref()
                .and_then(Measure::from_bucket)
                .unwrap_or(fallback),
        }
    }
}

/// Fetch-by-aggregation-dimension
pub struct DimensionLoader {
    source: Arc<dyn OrderSource>,
    dimensions: Vec<Dimension>,
    measure: MeasureRule,
    predicate: OrderPredicate,
    /// Whether the deepest synthesized level can be expanded further
    leaf_expandable: bool,
}

impl DimensionLoader {
    pub fn new(source: Arc<dyn OrderSource>, dimensions: Vec<Dimension>) -> Self {
        Self {
            source,
            dimensions,
            measure: MeasureRule::Fixed(Measure::Amount),
            predicate: OrderPredicate::All,
            leaf_expandable: true,
        }
    }

    pub fn measure(mut self, measure: MeasureRule) -> Self {
        self.measure = measure;
        self
    }

    pub fn predicate(mut self, predicate: OrderPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn leaf_expandable(mut self, expandable: bool) -> Self {
        self.leaf_expandable = expandable;
        self
    }
}

#[async_trait]
impl ChildLoader for DimensionLoader {
    fn name(&self) -> &'static str {
        "dimension"
    }

    async fn load(&self, node: &Node, filters: &Filters) -> Result<Vec<Arc<Node>>, LoadError> {
        let measure = self.measure.resolve(node);
        let rows = self.source.fetch_orders(&node.scope, filters).await?;
        let fetched = rows.len();
        let kept: Vec<&OrderRecord> = rows
            .iter()
            .filter(|row| self.predicate.keeps(row, measure))
            .collect();

        let grouping = group_orders(kept, &self.dimensions, measure);
        debug!(
            path = %node.path,
            fetched,
            groups = grouping.groups.len(),
            dropped = grouping.dropped.len(),
            "aggregated children"
        );

        let mut issues = Vec::new();
        let children = materialize(
            &node.path,
            &node.scope,
            grouping.into_specs(self.leaf_expandable),
            &mut issues,
        );
        if !issues.is_empty() {
            debug!(path = %node.path, duplicates = issues.len(), "disambiguated duplicate labels");
        }
        Ok(children)
    }
}

/// Fetch-leaf-records: one node per order
pub struct OrderLeafLoader {
    source: Arc<dyn OrderSource>,
    measure: MeasureRule,
    predicate: OrderPredicate,
}

impl OrderLeafLoader {
    pub fn new(source: Arc<dyn OrderSource>) -> Self {
        Self {
            source,
            measure: MeasureRule::Fixed(Measure::Amount),
            predicate: OrderPredicate::All,
        }
    }

    pub fn measure(mut self, measure: MeasureRule) -> Self {
        self.measure = measure;
        self
    }

    pub fn predicate(mut self, predicate: OrderPredicate) -> Self {
        self.predicate = predicate;
        self
    }
}

#[async_trait]
impl ChildLoader for OrderLeafLoader {
    fn name(&self) -> &'static str {
        "order-leaf"
    }

    async fn load(&self, node: &Node, filters: &Filters) -> Result<Vec<Arc<Node>>, LoadError> {
        let measure = self.measure.resolve(node);
        let rows = self.source.fetch_orders(&node.scope, filters).await?;
        let specs: Vec<NodeSpec> = rows
            .iter()
            .filter(|row| self.predicate.keeps(row, measure))
            .map(|row| {
                NodeSpec::new(NodeKind::Order { id: row.id.clone() }, row.label())
                    .value(measure.of(row))
                    .count(1)
            })
            .collect();
        debug!(path = %node.path, orders = specs.len(), "loaded order leaves");

        let mut issues = Vec::new();
        Ok(materialize(&node.path, &node.scope, specs, &mut issues))
    }
}
