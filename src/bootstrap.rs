//! Root-data assembly
//!
//! The eager top of a tree (pre-aggregated totals, per-salesman summaries)
//! arrives once, either nested or as a flat list linked by `parent_id`.
//! `assemble` turns either shape into the root [`Node`] with every path
//! derived. Bad records are dropped and reported, never fatal.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ExplorerError;
use crate::explorer::node::{Node, NodeKind, NodeSpec};

/// Nested root-data record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootRecord {
    pub kind: NodeKind,
    pub label: String,
    #[serde(default)]
    pub value: Decimal,
    #[serde(default)]
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expandable: Option<bool>,
    /// `None` leaves the node to a loader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RootRecord>>,
}

impl RootRecord {
    fn into_spec(self) -> NodeSpec {
        let mut spec = NodeSpec::new(self.kind, self.label)
            .value(self.value)
            .count(self.count);
        if let Some(expandable) = self.expandable {
            spec = spec.expandable(expandable);
        }
        if let Some(children) = self.children {
            spec = spec.children(children.into_iter().map(RootRecord::into_spec).collect());
        }
        spec
    }
}

/// Flat root-data record; `parent_id = None` means top level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub kind: NodeKind,
    pub label: String,
    #[serde(default)]
    pub value: Decimal,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub expandable: Option<bool>,
}

/// Root data in either supported shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "records", rename_all = "snake_case")]
pub enum RootData {
    Nested(Vec<RootRecord>),
    Flat(Vec<FlatRecord>),
}

/// Assembled root plus the data-quality issues met on the way
#[derive(Debug, Clone)]
pub struct Assembly {
    pub root: Arc<Node>,
    pub issues: Vec<ExplorerError>,
}

/// Build the root node. Its value and count are the sums over the top
/// level.
pub fn assemble(root_label: &str, data: RootData) -> Assembly {
    let mut issues = Vec::new();
    let specs = match data {
        RootData::Nested(records) => records.into_iter().map(RootRecord::into_spec).collect(),
        RootData::Flat(records) => link_flat(records, &mut issues),
    };

    let value: Decimal = specs.iter().map(|s| s.value).sum();
    let count: u64 = specs.iter().map(|s| s.auxiliary_count).sum();
    let (root, mut placed) = Node::root(root_label, value, count, specs);
    issues.append(&mut placed);

    info!(
        children = root.eager_children().map_or(0, <[_]>::len),
        issues = issues.len(),
        "root assembled"
    );
    Assembly { root, issues }
}

/// Link flat records by `parent_id`, keeping input order among siblings
fn link_flat(records: Vec<FlatRecord>, issues: &mut Vec<ExplorerError>) -> Vec<NodeSpec> {
    let mut by_id: HashMap<String, FlatRecord> = HashMap::with_capacity(records.len());
    let mut order: Vec<String> = Vec::with_capacity(records.len());

    for record in records {
        if by_id.contains_key(&record.id) {
            warn!(id = %record.id, "duplicate record id, dropping");
            issues.push(ExplorerError::malformed(record.id, "duplicate id"));
            continue;
        }
        order.push(record.id.clone());
        by_id.insert(record.id.clone(), record);
    }

    let mut top: Vec<String> = Vec::new();
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    for id in &order {
        match by_id.get(id).and_then(|r| r.parent_id.as_ref()) {
            None => top.push(id.clone()),
            Some(parent) if by_id.contains_key(parent) => {
                children.entry(parent.clone()).or_default().push(id.clone());
            }
            Some(parent) => {
                warn!(id = %id, parent = %parent, "unknown parent, dropping");
                issues.push(ExplorerError::malformed(
                    id.clone(),
                    format!("unknown parent {}", parent),
                ));
            }
        }
    }

    let mut visited = HashSet::with_capacity(order.len());
    let specs = top
        .iter()
        .filter_map(|id| build_spec(id, &mut by_id, &children, &mut visited))
        .collect();

    // Whatever was never reached sits on a parent cycle
    for id in order {
        if !visited.contains(&id) && by_id.contains_key(&id) {
            warn!(id = %id, "record unreachable from the top level, dropping");
            issues.push(ExplorerError::malformed(id, "unreachable (parent cycle)"));
        }
    }
    specs
}

fn build_spec(
    id: &str,
    by_id: &mut HashMap<String, FlatRecord>,
    children: &HashMap<String, Vec<String>>,
    visited: &mut HashSet<String>,
) -> Option<NodeSpec> {
    if !visited.insert(id.to_string()) {
        return None;
    }
    let record = by_id.remove(id)?;

    let mut spec = NodeSpec::new(record.kind, record.label)
        .value(record.value)
        .count(record.count);
    if let Some(expandable) = record.expandable {
        spec = spec.expandable(expandable);
    }
    if let Some(kids) = children.get(id) {
        let built: Vec<NodeSpec> = kids
            .iter()
            .filter_map(|kid| build_spec(kid, by_id, children, visited))
            .collect();
        spec = spec.children(built);
    }
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flat(id: &str, parent: Option<&str>, kind: NodeKind, label: &str, value: i64) -> FlatRecord {
        FlatRecord {
            id: id.to_string(),
            parent_id: parent.map(String::from),
            kind,
            label: label.to_string(),
            value: Decimal::from(value),
            count: 1,
            expandable: None,
        }
    }

    fn paths(node: &Node, out: &mut Vec<String>) {
        out.push(node.path.to_string());
        for child in node.eager_children().unwrap_or_default() {
            paths(child, out);
        }
    }

    #[test]
    fn test_nested_from_json() {
        let json = r#"{
            "shape": "nested",
            "records": [
                {"kind": {"type": "salesman"}, "label": "Rao", "value": "180", "count": 3,
                 "children": [{"kind": {"type": "district"}, "label": "Pune", "value": "180"}]},
                {"kind": {"type": "salesman"}, "label": "Patil", "value": "20"}
            ]
        }"#;
        let data: RootData = serde_json::from_str(json).unwrap();
        let assembly = assemble("All salesmen", data);

        assert!(assembly.issues.is_empty());
        assert_eq!(assembly.root.value, Decimal::from(200));
        assert_eq!(assembly.root.auxiliary_count, 3);

        let mut all = Vec::new();
        paths(&assembly.root, &mut all);
        assert_eq!(
            all,
            vec![
                "root",
                "root.Salesman: Rao",
                "root.Salesman: Rao.District: Pune",
                "root.Salesman: Patil",
            ]
        );
        let patil = &assembly.root.eager_children().unwrap()[1];
        assert!(patil.children_eager.is_none());
        assert!(patil.expandable);
    }

    #[test]
    fn test_flat_links_in_input_order() {
        let records = vec![
            flat("2", Some("1"), NodeKind::District, "Pune", 50),
            flat("1", None, NodeKind::Salesman, "Rao", 80),
            flat("3", Some("1"), NodeKind::District, "Satara", 30),
            flat("4", None, NodeKind::Salesman, "Patil", 20),
        ];
        let assembly = assemble("All", RootData::Flat(records));

        assert!(assembly.issues.is_empty());
        let mut all = Vec::new();
        paths(&assembly.root, &mut all);
        assert_eq!(
            all,
            vec![
                "root",
                "root.Salesman: Rao",
                "root.Salesman: Rao.District: Pune",
                "root.Salesman: Rao.District: Satara",
                "root.Salesman: Patil",
            ]
        );
        assert_eq!(assembly.root.value, Decimal::from(100));
    }

    #[test]
    fn test_flat_bad_records_are_dropped() {
        let records = vec![
            flat("1", None, NodeKind::Salesman, "Rao", 10),
            flat("1", None, NodeKind::Salesman, "Copy", 10),
            flat("2", Some("missing"), NodeKind::District, "Pune", 5),
            flat("3", Some("4"), NodeKind::District, "A", 1),
            flat("4", Some("3"), NodeKind::District, "B", 1),
        ];
        let assembly = assemble("All", RootData::Flat(records));

        let codes: Vec<&str> = assembly.issues.iter().map(|e| e.code()).collect();
        assert_eq!(codes, vec!["MALFORMED_DATA"; 4]);
        assert_eq!(assembly.root.eager_children().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_labels_reported() {
        let records = vec![
            RootRecord {
                kind: NodeKind::Salesman,
                label: "Rao".into(),
                value: Decimal::ONE,
                count: 0,
                expandable: None,
                children: None,
            };
            2
        ];
        let assembly = assemble("All", RootData::Nested(records));
        assert_eq!(assembly.issues.len(), 1);
        assert_eq!(assembly.issues[0].code(), "DUPLICATE_PATH");
        let labels: Vec<&str> = assembly
            .root
            .eager_children()
            .unwrap()
            .iter()
            .map(|n| n.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Rao", "Rao (2)"]);
    }
}
