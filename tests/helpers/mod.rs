//! Shared fixtures for explorer integration tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::Notify;

use drilldown::explorer::node::materialize;
use drilldown::{
    ChildLoader, ExplorerConfig, Explorer, Filters, LoadError, LoaderRegistry, Node, NodeKind,
    NodeSpec, OrderRecord,
};
use drilldown::explorer::KindTag;

pub type Response = Result<Vec<NodeSpec>, LoadError>;

/// Loader answering from a per-path script.
///
/// Each path has a queue of responses; the last one repeats. A call takes
/// its response when it starts, so overlapping calls answer in call order.
/// Unscripted paths answer with no children. Optional per-path delays and a
/// shared gate let tests hold a fetch open.
#[derive(Default)]
pub struct ScriptedLoader {
    responses: Mutex<HashMap<String, VecDeque<Response>>>,
    delays: Mutex<HashMap<String, Duration>>,
    gate: Option<Arc<Notify>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl ScriptedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, path: &str, response: Response) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn delay(self, path: &str, delay: Duration) -> Self {
        self.delays
            .lock()
            .unwrap()
            .insert(path.to_string(), delay);
        self
    }

    /// Every fetch waits for one `notify_one` on the gate
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    fn next_response(&self, path: &str) -> Response {
        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Ok(Vec::new())),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl ChildLoader for ScriptedLoader {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn load(&self, node: &Node, _filters: &Filters) -> Result<Vec<Arc<Node>>, LoadError> {
        let path = node.path.to_string();
        *self.calls.lock().unwrap().entry(path.clone()).or_default() += 1;
        self.total.fetch_add(1, Ordering::SeqCst);
        let response = self.next_response(&path);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let delay = self.delays.lock().unwrap().get(&path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let specs = response?;
        let mut issues = Vec::new();
        Ok(materialize(&node.path, &node.scope, specs, &mut issues))
    }
}

pub fn dec(v: i64) -> Decimal {
    Decimal::from(v)
}

pub fn spec(kind: NodeKind, label: &str, value: i64) -> NodeSpec {
    NodeSpec::new(kind, label).value(dec(value)).count(1)
}

pub fn bucket(label: &str, value: i64) -> NodeSpec {
    spec(
        NodeKind::Bucket {
            name: label.to_string(),
        },
        label,
        value,
    )
}

/// root -> Salesman Rao (eager) -> District Pune (eager) -> Taluka Haveli
/// (eager) -> Village Wagholi (lazy); Salesman Patil and District Satara lazy
pub fn sales_tree() -> Arc<Node> {
    let (root, issues) = Node::root(
        "All salesmen",
        dec(200),
        5,
        vec![
            spec(NodeKind::Salesman, "Rao", 180).children(vec![
                spec(NodeKind::District, "Pune", 150).children(vec![spec(
                    NodeKind::Taluka,
                    "Haveli",
                    150,
                )
                .children(vec![spec(NodeKind::Village, "Wagholi", 100)])]),
                spec(NodeKind::District, "Satara", 30),
            ]),
            spec(NodeKind::Salesman, "Patil", 20),
        ],
    );
    assert!(issues.is_empty());
    root
}

/// Registry sending every lazily loaded kind to `loader`
pub fn registry(loader: Arc<ScriptedLoader>) -> LoaderRegistry {
    let mut registry = LoaderRegistry::new();
    for kind in [
        KindTag::Salesman,
        KindTag::District,
        KindTag::Taluka,
        KindTag::Village,
        KindTag::Bucket,
    ] {
        registry.register(kind, loader.clone());
    }
    registry
}

pub fn explorer(root: Arc<Node>, loader: Arc<ScriptedLoader>) -> Explorer {
    Explorer::new(root, registry(loader), ExplorerConfig::default())
}

pub fn order(
    id: &str,
    salesman: &str,
    district: &str,
    taluka: &str,
    village: &str,
    amount: i64,
    paid: i64,
) -> OrderRecord {
    OrderRecord {
        id: id.to_string(),
        salesman: Some(salesman.to_string()),
        district: Some(district.to_string()),
        taluka: Some(taluka.to_string()),
        village: Some(village.to_string()),
        customer: Some(format!("Customer {}", id)),
        amount: dec(amount),
        paid: dec(paid),
        status: Some("delivered".to_string()),
        placed_on: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
    }
}

pub fn sample_orders() -> Vec<OrderRecord> {
    vec![
        order("SO-1", "Rao", "Pune", "Haveli", "Wagholi", 100, 100),
        order("SO-2", "Rao", "Pune", "Haveli", "Lohegaon", 50, 10),
        order("SO-3", "Rao", "Pune", "Mulshi", "Paud", 30, 0),
        order("SO-4", "Patil", "Nashik", "Niphad", "Ozar", 20, 5),
    ]
}
