//! Property tests for projection and layout
//!
//! Projection must be a pure function of the explorer state, percentages
//! never exceed 100, and expansion never leaves an orphaned descendant.

mod helpers;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;

use drilldown::explorer::layout::canvas_height;
use drilldown::explorer::projector::percentage;
use drilldown::{Explorer, ExplorerConfig, LayoutConfig, Node, NodeKind, ProjectedNode};
use helpers::{bucket, dec, explorer, spec, ScriptedLoader};

/// Eager tree of buckets, three levels deep, with one child worth more
/// than its parent
fn eager_tree() -> Arc<Node> {
    let (root, _) = Node::root(
        "All",
        dec(100),
        0,
        vec![
            bucket("North", 60).children(vec![
                bucket("N1", 40).children(vec![bucket("N1a", 10), bucket("N1b", 90)]),
                bucket("N2", 20).children(vec![bucket("N2a", 20)]),
            ]),
            bucket("South", 40).children(vec![bucket("S1", 0).children(vec![bucket("S1a", 5)])]),
            spec(
                NodeKind::Order {
                    id: "SO-9".to_string(),
                },
                "SO-9",
                7,
            ),
        ],
    );
    root
}

const PATHS: [&str; 8] = [
    "root",
    "root.North",
    "root.North.N1",
    "root.North.N2",
    "root.South",
    "root.South.S1",
    "root.SO-9",
    "root.North.N1.N1a",
];

/// Any non-negative `Decimal` up to `Decimal::MAX`, optionally signed
fn decimal(signed: bool) -> impl Strategy<Value = Decimal> {
    (any::<u32>(), any::<u32>(), any::<u32>(), any::<bool>(), 0u32..=28).prop_map(
        move |(lo, mid, hi, negative, scale)| {
            Decimal::from_parts(lo, mid, hi, signed && negative, scale)
        },
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn all_nodes(node: &ProjectedNode) -> Vec<&ProjectedNode> {
    let mut out = vec![node];
    for child in &node.children {
        out.extend(all_nodes(child));
    }
    out
}

fn replay(ex: &Explorer, toggles: &[usize]) {
    runtime().block_on(async {
        for &index in toggles {
            // Hidden paths answer UnknownPath; that is part of the property
            let _ = ex.toggle(PATHS[index]).await;
        }
    });
}

proptest! {
    #[test]
    fn prop_projection_is_idempotent(
        toggles in prop::collection::vec(0..PATHS.len(), 0..24),
        term in "[a-zA-Z0-9 ]{0,4}",
    ) {
        let ex = explorer(eager_tree(), Arc::new(ScriptedLoader::new()));
        replay(&ex, &toggles);
        ex.search(&term);

        let first = ex.project();
        let second = ex.project();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(ex.render(), ex.render());
    }

    #[test]
    fn prop_expanded_set_has_no_orphans(
        toggles in prop::collection::vec(0..PATHS.len(), 0..24),
    ) {
        let ex = explorer(eager_tree(), Arc::new(ScriptedLoader::new()));
        replay(&ex, &toggles);

        let expanded = ex.expanded_paths();
        for path in &expanded {
            if let Some(parent) = path.parent() {
                prop_assert!(expanded.contains(&parent), "{} expanded under collapsed {}", path, parent);
            }
        }
    }

    #[test]
    fn prop_percentages_are_clamped(
        toggles in prop::collection::vec(0..PATHS.len(), 0..24),
    ) {
        let ex = explorer(eager_tree(), Arc::new(ScriptedLoader::new()));
        replay(&ex, &toggles);

        let tree = ex.project();
        for node in all_nodes(&tree) {
            prop_assert!((0.0..=100.0).contains(&node.percentage));
        }
    }

    #[test]
    fn prop_percentage_bounds(value in decimal(false), parent in decimal(true)) {
        let share = percentage(value, Some(parent));
        prop_assert!((0.0..=100.0).contains(&share));
        if parent <= Decimal::ZERO || value >= parent {
            prop_assert_eq!(share, 100.0);
        }
    }

    #[test]
    fn prop_canvas_height_formula(count in 0usize..500) {
        let config = LayoutConfig::default();
        let expected = (count as f64 * 40.0 + 80.0).max(400.0);
        prop_assert_eq!(canvas_height(count, &config), expected);
    }
}

#[test]
fn test_overfull_child_clamps_to_full_width() {
    let ex = explorer(eager_tree(), Arc::new(ScriptedLoader::new()));
    replay(&ex, &[1, 2]);

    let tree = ex.project();
    let n1b = tree.find("root.North.N1.N1b").unwrap();
    assert_eq!(n1b.percentage, 100.0);
    let n1a = tree.find("root.North.N1.N1a").unwrap();
    assert_eq!(n1a.percentage, 25.0);
    assert_eq!(tree.percentage, 100.0);
}

#[test]
fn test_huge_child_value_projects_without_panicking() {
    let (root, _) = Node::root(
        "All",
        Decimal::ONE,
        0,
        vec![bucket("Huge", 0).value(Decimal::MAX)],
    );
    let ex = explorer(root, Arc::new(ScriptedLoader::new()));

    let tree = ex.project();
    assert_eq!(tree.find("root.Huge").unwrap().percentage, 100.0);
}

#[test]
fn test_zero_parent_gives_full_width() {
    let ex = explorer(eager_tree(), Arc::new(ScriptedLoader::new()));
    replay(&ex, &[4, 5]);

    let tree = ex.project();
    assert_eq!(tree.find("root.South.S1.S1a").unwrap().percentage, 100.0);
}

#[test]
fn test_layout_orders_and_height() {
    let ex = Explorer::new(
        eager_tree(),
        drilldown::LoaderRegistry::new(),
        ExplorerConfig::default(),
    );
    replay(&ex, &[1, 2]);

    let layout = ex.render();
    let placed: Vec<(&str, usize, f64)> = layout
        .nodes
        .iter()
        .map(|n| (n.path.as_str(), n.depth, n.order))
        .collect();
    assert_eq!(
        placed,
        vec![
            ("root", 0, 0.0),
            ("root.North", 1, 1.5),
            ("root.North.N1", 2, 3.0),
            ("root.North.N1.N1a", 3, 4.5),
            ("root.North.N1.N1b", 3, 5.5),
            ("root.North.N2", 2, 6.5),
            ("root.South", 1, 7.5),
            ("root.SO-9", 1, 8.5),
        ]
    );
    assert_eq!(layout.edges.len(), 7);
    assert_eq!(layout.max_depth, 3);
    assert_eq!(layout.height, 400.0);
    assert_eq!(layout, ex.render());
}
