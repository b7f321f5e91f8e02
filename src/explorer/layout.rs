//! LayoutEngine - (depth, order) positions for a projected tree
//!
//! Nodes are visited depth-first. Each visited node after the root advances
//! a running `order` cursor. The step is `sibling_separation` when the last
//! node placed at the same depth shares its parent, and `cousin_separation`
//! for the first child of a parent. The canvas height grows with the visible
//! node count.
//!
//! The output carries no drawing instructions. Any renderer that maps
//! (depth, order, height) to pixels reproduces the same relative spacing for
//! the same tree.

use rust_decimal::Decimal;
use serde::Serialize;

use super::path::PathKey;
use super::projector::{NodeState, ProjectedKind, ProjectedNode};
use crate::config::LayoutConfig;

/// Positioned node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutNode {
    pub path: PathKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<PathKey>,
    pub depth: usize,
    pub order: f64,
    pub label: String,
    pub kind: ProjectedKind,
    pub value: Decimal,
    pub display_value: String,
    pub auxiliary_count: u64,
    pub percentage: f64,
    pub highlighted: bool,
    pub state: NodeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parent -> child edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutEdge {
    pub parent: PathKey,
    pub child: PathKey,
}

/// Complete layout handed to a renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    /// Nodes in depth-first order
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub height: f64,
    pub max_depth: usize,
}

impl Layout {
    pub fn node(&self, path: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.path.as_str() == path)
    }
}

/// `max(minimum_height, count * node_spacing + padding)`
pub fn canvas_height(visible_count: usize, config: &LayoutConfig) -> f64 {
    let natural = visible_count as f64 * config.node_spacing + config.padding;
    natural.max(config.minimum_height)
}

/// Lay out a projected tree
pub fn layout(root: &ProjectedNode, config: &LayoutConfig) -> Layout {
    let mut walker = Walker {
        config,
        nodes: Vec::with_capacity(root.visible_count()),
        edges: Vec::new(),
        cursor: 0.0,
        last_parent: Vec::new(),
        max_depth: 0,
    };
    walker.visit(root, None, 0);

    let height = canvas_height(walker.nodes.len(), config);
    Layout {
        nodes: walker.nodes,
        edges: walker.edges,
        height,
        max_depth: walker.max_depth,
    }
}

struct Walker<'a> {
    config: &'a LayoutConfig,
    nodes: Vec<LayoutNode>,
    edges: Vec<LayoutEdge>,
    cursor: f64,
    /// Parent of the last node placed at each depth
    last_parent: Vec<Option<PathKey>>,
    max_depth: usize,
}

impl Walker<'_> {
    fn visit(&mut self, node: &ProjectedNode, parent: Option<&PathKey>, depth: usize) {
        if let Some(parent) = parent {
            if self.last_parent.len() <= depth {
                self.last_parent.resize(depth + 1, None);
            }
            let slot = &mut self.last_parent[depth];
            self.cursor += if slot.as_ref() == Some(parent) {
                self.config.sibling_separation
            } else {
                self.config.cousin_separation
            };
            *slot = Some(parent.clone());
        }
        self.max_depth = self.max_depth.max(depth);

        if let Some(parent) = parent {
            self.edges.push(LayoutEdge {
                parent: parent.clone(),
                child: node.path.clone(),
            });
        }

        self.nodes.push(LayoutNode {
            path: node.path.clone(),
            parent: parent.cloned(),
            depth,
            order: self.cursor,
            label: node.label.clone(),
            kind: node.kind.clone(),
            value: node.value,
            display_value: node.display_value.clone(),
            auxiliary_count: node.auxiliary_count,
            percentage: node.percentage,
            highlighted: node.highlighted,
            state: node.state,
            error: node.error.clone(),
        });

        for child in &node.children {
            self.visit(child, Some(&node.path), depth + 1);
        }
    }
}
