//! Node - immutable tree entity
//!
//! Nodes are built once, either from root data (eager levels) or from a
//! loader response (lazy levels), and shared as `Arc<Node>`. Nothing in the
//! engine mutates a node after construction; a changed tree is a new tree.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::path::PathKey;
use crate::error::ExplorerError;

// =============================================================================
// NODE KIND
// =============================================================================

/// Closed set of node kinds. Picks the child loader and decides whether a
/// node is intrinsically a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Salesman,
    District,
    Taluka,
    Village,
    /// Aggregation bucket such as "Collected" or "Outstanding"
    Bucket { name: String },
    /// Individual order record
    Order { id: String },
}

/// Payload-free discriminant of [`NodeKind`], used as the loader registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTag {
    Root,
    Salesman,
    District,
    Taluka,
    Village,
    Bucket,
    Order,
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Salesman => write!(f, "salesman"),
            Self::District => write!(f, "district"),
            Self::Taluka => write!(f, "taluka"),
            Self::Village => write!(f, "village"),
            Self::Bucket => write!(f, "bucket"),
            Self::Order => write!(f, "order"),
        }
    }
}

impl NodeKind {
    pub fn tag(&self) -> KindTag {
        match self {
            NodeKind::Root => KindTag::Root,
            NodeKind::Salesman => KindTag::Salesman,
            NodeKind::District => KindTag::District,
            NodeKind::Taluka => KindTag::Taluka,
            NodeKind::Village => KindTag::Village,
            NodeKind::Bucket { .. } => KindTag::Bucket,
            NodeKind::Order { .. } => KindTag::Order,
        }
    }

    /// Orders never have children
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Order { .. })
    }

    /// PathKey segment for a node of this kind with the given label.
    ///
    /// Dimension levels are qualified (`"District: Pune"`) so a district and a
    /// taluka sharing a name never collide; buckets and orders use the label.
    pub fn segment(&self, label: &str) -> String {
        match self {
            NodeKind::Salesman => format!("Salesman: {}", label),
            NodeKind::District => format!("District: {}", label),
            NodeKind::Taluka => format!("Taluka: {}", label),
            NodeKind::Village => format!("Village: {}", label),
            NodeKind::Root | NodeKind::Bucket { .. } | NodeKind::Order { .. } => label.to_string(),
        }
    }
}

// =============================================================================
// DIMENSIONS & SCOPE
// =============================================================================

/// Aggregation dimension of an order record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Salesman,
    District,
    Taluka,
    Village,
}

impl Dimension {
    /// Node kind synthesized for a group of this dimension
    pub fn kind(self) -> NodeKind {
        match self {
            Dimension::Salesman => NodeKind::Salesman,
            Dimension::District => NodeKind::District,
            Dimension::Taluka => NodeKind::Taluka,
            Dimension::Village => NodeKind::Village,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Salesman => "salesman",
            Dimension::District => "district",
            Dimension::Taluka => "taluka",
            Dimension::Village => "village",
        }
    }
}

/// Dimension coordinates accumulated from a node's ancestors.
///
/// This is what a loader needs to ask the backend for "the orders under this
/// node". Values are the raw dimension values, never disambiguated labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salesman: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taluka: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
}

impl Scope {
    pub fn get(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Salesman => self.salesman.as_deref(),
            Dimension::District => self.district.as_deref(),
            Dimension::Taluka => self.taluka.as_deref(),
            Dimension::Village => self.village.as_deref(),
        }
    }

    /// Scope of a child of the given kind whose raw value is `value`
    pub fn narrowed(&self, kind: &NodeKind, value: &str) -> Scope {
        let mut scope = self.clone();
        match kind {
            NodeKind::Salesman => scope.salesman = Some(value.to_string()),
            NodeKind::District => scope.district = Some(value.to_string()),
            NodeKind::Taluka => scope.taluka = Some(value.to_string()),
            NodeKind::Village => scope.village = Some(value.to_string()),
            NodeKind::Bucket { name } => scope.bucket = Some(name.clone()),
            NodeKind::Root | NodeKind::Order { .. } => {}
        }
        scope
    }
}

// =============================================================================
// NODE
// =============================================================================

/// A node of the explorer tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Display label (may carry a disambiguating suffix)
    pub label: String,
    /// Magnitude used for percentage-of-parent
    pub value: Decimal,
    /// Secondary metric (e.g. order count), display only
    pub auxiliary_count: u64,
    pub path: PathKey,
    /// Children known at construction time; `None` means fetch lazily
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_eager: Option<Vec<Arc<Node>>>,
    pub expandable: bool,
    #[serde(skip)]
    pub scope: Scope,
}

impl Node {
    /// Build the root node from its top-level children.
    ///
    /// Returns the root plus every data-quality issue found while placing
    /// the children (duplicate labels, malformed records).
    pub fn root(
        label: impl Into<String>,
        value: Decimal,
        auxiliary_count: u64,
        children: Vec<NodeSpec>,
    ) -> (Arc<Node>, Vec<ExplorerError>) {
        let path = PathKey::root();
        let scope = Scope::default();
        let mut issues = Vec::new();
        let children = materialize(&path, &scope, children, &mut issues);
        let root = Node {
            kind: NodeKind::Root,
            label: label.into(),
            value,
            auxiliary_count,
            path,
            children_eager: Some(children),
            expandable: true,
            scope,
        };
        (Arc::new(root), issues)
    }

    pub fn is_leaf(&self) -> bool {
        !self.expandable
    }

    pub fn eager_children(&self) -> Option<&[Arc<Node>]> {
        self.children_eager.as_deref()
    }
}

/// Construction recipe for a node whose path is not yet known
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub kind: NodeKind,
    pub label: String,
    pub value: Decimal,
    pub auxiliary_count: u64,
    /// Defaults to "not an order"
    pub expandable: Option<bool>,
    pub children: Option<Vec<NodeSpec>>,
}

impl NodeSpec {
    pub fn new(kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            value: Decimal::ZERO,
            auxiliary_count: 0,
            expandable: None,
            children: None,
        }
    }

    pub fn value(mut self, value: Decimal) -> Self {
        self.value = value;
        self
    }

    pub fn count(mut self, count: u64) -> Self {
        self.auxiliary_count = count;
        self
    }

    pub fn expandable(mut self, expandable: bool) -> Self {
        self.expandable = Some(expandable);
        self
    }

    /// Embed children eagerly
    pub fn children(mut self, children: Vec<NodeSpec>) -> Self {
        self.children = Some(children);
        self
    }
}

/// Turn sibling specs into nodes under `parent`.
///
/// Labels whose segment collides with an earlier sibling get a ` (n)` suffix
/// so every sibling keeps a distinct key; the collision is recorded in
/// `issues` and logged. Children are placed recursively in input order.
pub fn materialize(
    parent: &PathKey,
    parent_scope: &Scope,
    specs: Vec<NodeSpec>,
    issues: &mut Vec<ExplorerError>,
) -> Vec<Arc<Node>> {
    let mut seen: HashSet<String> = HashSet::with_capacity(specs.len());
    let mut nodes = Vec::with_capacity(specs.len());

    for spec in specs {
        if spec.kind == NodeKind::Root {
            warn!(parent = %parent, label = %spec.label, "root kind below the root, dropping");
            issues.push(ExplorerError::malformed(
                spec.label,
                "root kind can only appear at the top of the tree",
            ));
            continue;
        }

        let mut label = spec.label.clone();
        let mut segment = spec.kind.segment(&label);
        if seen.contains(&segment) {
            let original = parent.derive(&segment);
            let mut n = 2;
            while seen.contains(&segment) {
                label = format!("{} ({})", spec.label, n);
                segment = spec.kind.segment(&label);
                n += 1;
            }
            warn!(path = %original, relabelled = %label, "duplicate sibling path");
            issues.push(ExplorerError::DuplicatePath {
                path: original,
                relabelled: label.clone(),
            });
        }
        seen.insert(segment.clone());

        let path = parent.derive(&segment);
        let scope = parent_scope.narrowed(&spec.kind, &spec.label);
        let expandable = spec.expandable.unwrap_or(!spec.kind.is_leaf());
        let children_eager = spec
            .children
            .map(|children| materialize(&path, &scope, children, issues));

        nodes.push(Arc::new(Node {
            kind: spec.kind,
            label,
            value: spec.value,
            auxiliary_count: spec.auxiliary_count,
            path,
            children_eager,
            expandable,
            scope,
        }));
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn test_root_paths_and_scope() {
        let (root, issues) = Node::root(
            "All sales",
            dec(100),
            3,
            vec![NodeSpec::new(NodeKind::Salesman, "Rao")
                .value(dec(60))
                .children(vec![NodeSpec::new(NodeKind::District, "Pune").value(dec(60))])],
        );
        assert!(issues.is_empty());
        assert_eq!(root.path.as_str(), "root");

        let rao = &root.eager_children().unwrap()[0];
        assert_eq!(rao.path.as_str(), "root.Salesman: Rao");
        assert!(rao.expandable);

        let pune = &rao.eager_children().unwrap()[0];
        assert_eq!(pune.path.as_str(), "root.Salesman: Rao.District: Pune");
        assert_eq!(pune.scope.salesman.as_deref(), Some("Rao"));
        assert_eq!(pune.scope.district.as_deref(), Some("Pune"));
        assert!(pune.children_eager.is_none());
    }

    #[test]
    fn test_duplicate_labels_are_disambiguated() {
        let mut issues = Vec::new();
        let nodes = materialize(
            &PathKey::root(),
            &Scope::default(),
            vec![
                NodeSpec::new(NodeKind::Village, "Unknown"),
                NodeSpec::new(NodeKind::Village, "Unknown"),
                NodeSpec::new(NodeKind::Village, "Unknown"),
            ],
            &mut issues,
        );

        let labels: Vec<_> = nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["Unknown", "Unknown (2)", "Unknown (3)"]);
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], ExplorerError::DuplicatePath { .. }));
        // scope keeps the raw value for backend queries
        assert_eq!(nodes[2].scope.village.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_orders_are_leaves_by_default() {
        let mut issues = Vec::new();
        let nodes = materialize(
            &PathKey::root(),
            &Scope::default(),
            vec![NodeSpec::new(
                NodeKind::Order {
                    id: "SO-1".into(),
                },
                "SO-1",
            )],
            &mut issues,
        );
        assert!(nodes[0].is_leaf());
        assert_eq!(nodes[0].path.as_str(), "root.SO-1");
    }

    #[test]
    fn test_nested_root_kind_is_dropped() {
        let mut issues = Vec::new();
        let nodes = materialize(
            &PathKey::root(),
            &Scope::default(),
            vec![NodeSpec::new(NodeKind::Root, "again")],
            &mut issues,
        );
        assert!(nodes.is_empty());
        assert_eq!(issues[0].code(), "MALFORMED_DATA");
    }
}
