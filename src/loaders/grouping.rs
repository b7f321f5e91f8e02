//! Group-by-dimension aggregation shared by every aggregate loader
//!
//! Rows are grouped by the composite key of the requested dimensions and
//! nested in the order given (district -> taluka -> village). Each group sums
//! the measured value and counts its rows. Groups appear in first-seen order,
//! never sorted, so the same rows always produce the same tree.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::warn;

use super::source::{Measure, OrderRecord};
use crate::error::ExplorerError;
use crate::explorer::node::{Dimension, NodeSpec};

/// One aggregated group and its nested sub-groups
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub dimension: Dimension,
    pub key: String,
    pub value: Decimal,
    /// Number of rows folded into this group
    pub count: u64,
    pub children: Vec<Group>,
}

/// Grouping result plus the rows that could not be placed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping {
    pub groups: Vec<Group>,
    pub dropped: Vec<ExplorerError>,
}

impl Grouping {
    pub fn total(&self) -> Decimal {
        self.groups.iter().map(|g| g.value).sum()
    }

    pub fn count(&self) -> u64 {
        self.groups.iter().map(|g| g.count).sum()
    }

    /// Node specs for the groups. Leaf-level groups get
    /// `leaf_expandable`; inner levels are embedded eagerly.
    pub fn into_specs(self, leaf_expandable: bool) -> Vec<NodeSpec> {
        self.groups
            .into_iter()
            .map(|g| g.into_spec(leaf_expandable))
            .collect()
    }
}

impl Group {
    fn into_spec(self, leaf_expandable: bool) -> NodeSpec {
        let spec = NodeSpec::new(self.dimension.kind(), self.key)
            .value(self.value)
            .count(self.count);
        if self.children.is_empty() {
            spec.expandable(leaf_expandable)
        } else {
            spec.children(
                self.children
                    .into_iter()
                    .map(|c| c.into_spec(leaf_expandable))
                    .collect(),
            )
        }
    }
}

#[derive(Default)]
struct GroupBuilder {
    value: Decimal,
    count: u64,
    index: HashMap<String, usize>,
    children: Vec<(String, GroupBuilder)>,
}

impl GroupBuilder {
    fn add(&mut self, keys: &[&str], value: Decimal) {
        self.value += value;
        self.count += 1;
        let Some((first, rest)) = keys.split_first() else {
            return;
        };
        let slot = match self.index.get(*first) {
            Some(&slot) => slot,
            None => {
                self.children
                    .push((first.to_string(), GroupBuilder::default()));
                let slot = self.children.len() - 1;
                self.index.insert(first.to_string(), slot);
                slot
            }
        };
        self.children[slot].1.add(rest, value);
    }

    fn finish(self, dimensions: &[Dimension]) -> Vec<Group> {
        let Some((&dimension, rest)) = dimensions.split_first() else {
            return Vec::new();
        };
        self.children
            .into_iter()
            .map(|(key, builder)| Group {
                dimension,
                key,
                value: builder.value,
                count: builder.count,
                children: builder.finish(rest),
            })
            .collect()
    }
}

/// Group `records` by `dimensions`, measuring each row with `measure`.
///
/// A row missing any of the dimensions is dropped and reported as
/// `MalformedData`; the remaining rows are unaffected.
pub fn group_orders<'a, I>(records: I, dimensions: &[Dimension], measure: Measure) -> Grouping
where
    I: IntoIterator<Item = &'a OrderRecord>,
{
    let mut root = GroupBuilder::default();
    let mut dropped = Vec::new();
    let mut keys: Vec<&str> = Vec::with_capacity(dimensions.len());

    for record in records {
        keys.clear();
        let mut missing = None;
        for &dimension in dimensions {
            match record.dimension(dimension) {
                Some(key) => keys.push(key),
                None => {
                    missing = Some(dimension);
                    break;
                }
            }
        }

        if let Some(dimension) = missing {
            warn!(order = %record.id, dimension = dimension.name(), "order missing dimension, dropped");
            dropped.push(ExplorerError::malformed(
                record.id.clone(),
                format!("missing {}", dimension.name()),
            ));
            continue;
        }

        root.add(&keys, measure.of(record));
    }

    Grouping {
        groups: root.finish(dimensions),
        dropped,
    }
}
