//! TreeProjector - pure derivation of the render-ready tree
//!
//! Inputs are the root node plus the current expansion, cache, in-flight and
//! error state and the search term. The output is a fresh tree of
//! [`ProjectedNode`]s. Calling it twice with the same inputs yields the same
//! tree, and it does not care in which order loads completed.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use super::cache::LoadCache;
use super::expansion::ExpansionSet;
use super::node::{Node, NodeKind};
use super::path::PathKey;
use crate::format::ValueFormatter;

/// Segment used for the synthetic loading child
pub const LOADING_SEGMENT: &str = "(loading)";

/// Display state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Cannot have children
    Leaf,
    Collapsed,
    /// Fetch in flight
    Expanding,
    Expanded,
    /// Collapsed after a failed fetch; toggling retries
    Failed,
}

/// What a projected node stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectedKind {
    Node { kind: NodeKind },
    /// Placeholder child shown while a fetch is in flight
    Loading,
}

/// Render-ready node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedNode {
    pub path: PathKey,
    pub kind: ProjectedKind,
    pub label: String,
    pub value: Decimal,
    pub display_value: String,
    pub auxiliary_count: u64,
    /// Width as a share of the parent, in `0..=100`
    pub percentage: f64,
    pub highlighted: bool,
    pub state: NodeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub children: Vec<ProjectedNode>,
}

impl ProjectedNode {
    pub fn is_loading(&self) -> bool {
        self.kind == ProjectedKind::Loading
    }

    /// Number of nodes in this subtree, self included
    pub fn visible_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ProjectedNode::visible_count)
            .sum::<usize>()
    }

    /// Depth-first search by path
    pub fn find(&self, path: &str) -> Option<&ProjectedNode> {
        if self.path.as_str() == path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(path))
    }

    /// Paths of every node in depth-first order
    pub fn paths(&self) -> Vec<PathKey> {
        let mut out = Vec::with_capacity(self.visible_count());
        fn walk(node: &ProjectedNode, out: &mut Vec<PathKey>) {
            out.push(node.path.clone());
            for child in &node.children {
                walk(child, out);
            }
        }
        walk(self, &mut out);
        out
    }
}

/// Everything the projector reads
pub struct ProjectionInput<'a> {
    pub root: &'a Node,
    pub expansion: &'a ExpansionSet,
    pub cache: &'a LoadCache,
    pub errors: &'a HashMap<PathKey, String>,
    pub search: &'a str,
    pub formatter: &'a dyn ValueFormatter,
}

/// Share of `parent` taken by `value`, clamped to `0..=100`.
///
/// No parent, or a parent value that is not positive, means full width. So
/// does a ratio too large for `Decimal`.
pub fn percentage(value: Decimal, parent: Option<Decimal>) -> f64 {
    match parent {
        Some(parent) if parent > Decimal::ZERO => value
            .checked_div(parent)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map_or(100.0, |share| {
                share
                    .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
                    .to_f64()
                    .unwrap_or(100.0)
            }),
        _ => 100.0,
    }
}

/// Case-insensitive substring match; an empty term never highlights
pub fn matches_search(label: &str, term_lower: &str) -> bool {
    !term_lower.is_empty() && label.to_lowercase().contains(term_lower)
}

/// Display state of `node` given the engine state
pub fn node_state(
    node: &Node,
    expansion: &ExpansionSet,
    cache: &LoadCache,
    errors: &HashMap<PathKey, String>,
) -> NodeState {
    let key = node.path.as_str();
    if !node.expandable {
        NodeState::Leaf
    } else if cache.is_in_flight(key) {
        NodeState::Expanding
    } else if expansion.contains(key) {
        NodeState::Expanded
    } else if errors.contains_key(key) {
        NodeState::Failed
    } else {
        NodeState::Collapsed
    }
}

/// Project the whole tree from the root
pub fn project(input: &ProjectionInput<'_>) -> ProjectedNode {
    let term = input.search.trim().to_lowercase();
    project_node(input, input.root, None, &term)
}

fn project_node(
    input: &ProjectionInput<'_>,
    node: &Node,
    parent_value: Option<Decimal>,
    term: &str,
) -> ProjectedNode {
    let key = node.path.as_str();
    let mut children = Vec::new();

    if input.expansion.contains(key) {
        let visible: Option<&[Arc<Node>]> =
            node.eager_children().or_else(|| input.cache.get(key));
        match visible {
            Some(nodes) => {
                children.reserve(nodes.len());
                for child in nodes {
                    children.push(project_node(input, child, Some(node.value), term));
                }
            }
            None if input.cache.is_in_flight(key) => {
                children.push(loading_placeholder(&node.path));
            }
            None => {}
        }
    }

    ProjectedNode {
        path: node.path.clone(),
        kind: ProjectedKind::Node {
            kind: node.kind.clone(),
        },
        label: node.label.clone(),
        value: node.value,
        display_value: input.formatter.format_value(node.value),
        auxiliary_count: node.auxiliary_count,
        percentage: percentage(node.value, parent_value),
        highlighted: matches_search(&node.label, term),
        state: node_state(node, input.expansion, input.cache, input.errors),
        error: input.errors.get(key).cloned(),
        children,
    }
}

fn loading_placeholder(parent: &PathKey) -> ProjectedNode {
    ProjectedNode {
        path: parent.derive(LOADING_SEGMENT),
        kind: ProjectedKind::Loading,
        label: "Loading…".to_string(),
        value: Decimal::ZERO,
        display_value: String::new(),
        auxiliary_count: 0,
        percentage: 100.0,
        highlighted: false,
        state: NodeState::Leaf,
        error: None,
        children: Vec::new(),
    }
}
