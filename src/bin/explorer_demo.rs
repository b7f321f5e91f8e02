//! Explorer demo CLI
//!
//! Opens one of the dashboards over in-memory orders, replays a list of
//! toggles and an optional search, then prints the tree (or the layout as
//! JSON).
//!
//! Usage:
//!   cargo run --features cli --bin explorer_demo -- \
//!     --dashboard salesmen-performance \
//!     --toggle "root.Salesman: Rao" \
//!     --toggle "root.Salesman: Rao.District: Pune" \
//!     --search haveli
//!
//!   # Own data and layout settings, JSON output
//!   cargo run --features cli --bin explorer_demo -- \
//!     --orders orders.json --config explorer.yaml --json

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use drilldown::explorer::ProjectedKind;
use drilldown::{
    presets, telemetry, Dashboard, ExplorerConfig, Filters, InMemoryOrderSource, NodeState,
    PlainFormatter, ProjectedNode,
};

const SAMPLE_ORDERS: &str = r#"[
  {"id": "SO-101", "salesman": "Rao", "district": "Pune", "taluka": "Haveli", "village": "Wagholi",
   "customer": "Kale Agro", "amount": "42000", "paid": "42000", "status": "delivered", "placed_on": "2024-04-02"},
  {"id": "SO-102", "salesman": "Rao", "district": "Pune", "taluka": "Haveli", "village": "Lohegaon",
   "customer": "Shinde Traders", "amount": "18500", "paid": "5000", "status": "delivered", "placed_on": "2024-04-09"},
  {"id": "SO-103", "salesman": "Rao", "district": "Pune", "taluka": "Mulshi", "village": "Paud",
   "customer": "Paud Krishi Kendra", "amount": "9600", "paid": "0", "status": "pending", "placed_on": "2024-05-01"},
  {"id": "SO-104", "salesman": "Rao", "district": "Satara", "taluka": "Karad", "village": "Malkapur",
   "customer": "Jadhav Seeds", "amount": "27300", "paid": "12000", "status": "delivered", "placed_on": "2024-05-14"},
  {"id": "SO-105", "salesman": "Patil", "district": "Nashik", "taluka": "Niphad", "village": "Ozar",
   "customer": "Ozar Farmers Co-op", "amount": "61000", "paid": "61000", "status": "delivered", "placed_on": "2024-03-21"},
  {"id": "SO-106", "salesman": "Patil", "district": "Nashik", "taluka": "Niphad", "village": "Pimpalgaon",
   "customer": "Grape Growers Union", "amount": "35250", "paid": "10000", "status": "pending", "placed_on": "2024-06-03"},
  {"id": "SO-107", "salesman": "Kulkarni", "district": "Pune", "taluka": "Haveli", "village": "",
   "customer": "Walk-in", "amount": "4200", "paid": "0", "status": "pending", "placed_on": "2024-06-11"}
]"#;

/// Drive an explorer session over in-memory orders
#[derive(Parser, Debug)]
#[command(name = "explorer_demo")]
#[command(about = "Expand, search and lay out a drill-down tree")]
struct Args {
    /// Dashboard: sales-buckets, outstanding or salesmen-performance
    #[arg(long, short = 'd', default_value = "salesmen-performance")]
    dashboard: Dashboard,

    /// JSON array of order records (default: built-in sample)
    #[arg(long, short = 'o')]
    orders: Option<PathBuf>,

    /// YAML explorer config (default: DRILLDOWN_* environment)
    #[arg(long, short = 'c', env = "DRILLDOWN_CONFIG")]
    config: Option<PathBuf>,

    /// Path to toggle; repeat to replay several
    #[arg(long, short = 't')]
    toggle: Vec<String>,

    /// Highlight labels containing this term
    #[arg(long, short = 's')]
    search: Option<String>,

    /// Only orders with this status
    #[arg(long)]
    status: Option<String>,

    /// Expand everything already loaded down to this depth
    #[arg(long)]
    depth: Option<usize>,

    /// Currency prefix for values
    #[arg(long, default_value = "")]
    currency: String,

    /// Print the layout as JSON instead of a tree
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let yaml = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            ExplorerConfig::from_yaml_str(&yaml)?
        }
        None => ExplorerConfig::from_env()?,
    };

    let orders = match &args.orders {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading orders {}", path.display()))?,
        None => SAMPLE_ORDERS.to_string(),
    };
    let source = Arc::new(InMemoryOrderSource::from_json(&orders).context("parsing orders")?);

    let mut filters = Filters::new();
    if let Some(status) = &args.status {
        filters = filters.with_status(status.clone());
    }

    let (explorer, assembly) = presets::open(args.dashboard, source, filters, config).await?;
    for issue in &assembly.issues {
        warn!(code = issue.code(), "{}", issue);
    }
    let explorer = explorer.with_formatter(Arc::new(PlainFormatter::with_prefix(args.currency)));

    for path in &args.toggle {
        match explorer.toggle(path).await {
            Ok(outcome) => println!("toggle {:<60} {:?}", path, outcome),
            Err(e) => println!("toggle {:<60} error [{}]: {}", path, e.code(), e),
        }
    }
    if let Some(depth) = args.depth {
        explorer.expand_loaded_to_depth(depth);
    }
    if let Some(term) = &args.search {
        explorer.search(term);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&explorer.render())?);
    } else {
        println!();
        print_tree(&explorer.project(), 0);
        let layout = explorer.render();
        println!(
            "\n{} visible nodes, depth {}, canvas height {}",
            layout.nodes.len(),
            layout.max_depth,
            layout.height
        );
    }
    Ok(())
}

fn print_tree(node: &ProjectedNode, indent: usize) {
    let marker = match (&node.kind, node.state) {
        (ProjectedKind::Loading, _) => "...",
        (_, NodeState::Leaf) => "   ",
        (_, NodeState::Collapsed) => "[+]",
        (_, NodeState::Expanding) => "[~]",
        (_, NodeState::Expanded) => "[-]",
        (_, NodeState::Failed) => "[!]",
    };
    let highlight = if node.highlighted { " *" } else { "" };
    if node.is_loading() {
        println!("{:indent$}{} loading", "", marker, indent = indent * 2);
    } else {
        println!(
            "{:indent$}{} {}  {} ({}, {:.1}%){}",
            "",
            marker,
            node.label,
            node.display_value,
            node.auxiliary_count,
            node.percentage,
            highlight,
            indent = indent * 2
        );
    }
    if let Some(error) = &node.error {
        println!("{:indent$}    error: {}", "", error, indent = indent * 2);
    }
    for child in &node.children {
        print_tree(child, indent + 1);
    }
}
