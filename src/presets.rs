//! The three dashboards as configurations of one engine
//!
//! | Dashboard | Eager top | Lazy levels | Measure |
//! |-----------|-----------|-------------|---------|
//! | `SalesBuckets` | Collected / Outstanding buckets | salesman, district, taluka, village, orders | per bucket |
//! | `Outstanding` | salesmen | district/taluka/village in one fetch, orders | unpaid balance > 0 |
//! | `SalesmenPerformance` | salesmen | district, taluka, village, orders | order amount |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bootstrap::Assembly;
use crate::config::ExplorerConfig;
use crate::error::LoadError;
use crate::explorer::node::{Dimension, KindTag, Node, NodeKind, NodeSpec, Scope};
use crate::explorer::Explorer;
use crate::filters::Filters;
use crate::loaders::{
    group_orders, DimensionLoader, LoaderRegistry, Measure, MeasureRule, OrderLeafLoader,
    OrderPredicate, OrderRecord, OrderSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dashboard {
    SalesBuckets,
    Outstanding,
    SalesmenPerformance,
}

impl Dashboard {
    pub const ALL: [Dashboard; 3] = [
        Dashboard::SalesBuckets,
        Dashboard::Outstanding,
        Dashboard::SalesmenPerformance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dashboard::SalesBuckets => "sales-buckets",
            Dashboard::Outstanding => "outstanding",
            Dashboard::SalesmenPerformance => "salesmen-performance",
        }
    }

    /// Label of the root node
    pub fn title(self) -> &'static str {
        match self {
            Dashboard::SalesBuckets => "All sales",
            Dashboard::Outstanding => "Outstanding balance",
            Dashboard::SalesmenPerformance => "All salesmen",
        }
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dashboard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dashboard::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown dashboard '{}', expected one of: sales-buckets, outstanding, salesmen-performance",
                    s
                )
            })
    }
}

/// Loaders for every lazily expanded kind of `dashboard`
pub fn registry(dashboard: Dashboard, source: Arc<dyn OrderSource>) -> LoaderRegistry {
    let next = |dimension: Dimension, measure: MeasureRule, predicate: OrderPredicate| {
        Arc::new(
            DimensionLoader::new(Arc::clone(&source), vec![dimension])
                .measure(measure)
                .predicate(predicate),
        )
    };
    let orders = |measure: MeasureRule, predicate: OrderPredicate| {
        Arc::new(
            OrderLeafLoader::new(Arc::clone(&source))
                .measure(measure)
                .predicate(predicate),
        )
    };

    match dashboard {
        Dashboard::SalesBuckets => {
            let rule = MeasureRule::FromBucket(Measure::Amount);
            let keep = OrderPredicate::PositiveMeasure;
            LoaderRegistry::new()
                .with(KindTag::Bucket, next(Dimension::Salesman, rule, keep))
                .with(KindTag::Salesman, next(Dimension::District, rule, keep))
                .with(KindTag::District, next(Dimension::Taluka, rule, keep))
                .with(KindTag::Taluka, next(Dimension::Village, rule, keep))
                .with(KindTag::Village, orders(rule, keep))
        }
        Dashboard::Outstanding => {
            let rule = MeasureRule::Fixed(Measure::Outstanding);
            let keep = OrderPredicate::PositiveMeasure;
            LoaderRegistry::new()
                .with(
                    KindTag::Salesman,
                    Arc::new(
                        DimensionLoader::new(
                            Arc::clone(&source),
                            vec![Dimension::District, Dimension::Taluka, Dimension::Village],
                        )
                        .measure(rule)
                        .predicate(keep),
                    ),
                )
                .with(KindTag::Village, orders(rule, keep))
        }
        Dashboard::SalesmenPerformance => {
            let rule = MeasureRule::Fixed(Measure::Amount);
            let keep = OrderPredicate::All;
            LoaderRegistry::new()
                .with(KindTag::Salesman, next(Dimension::District, rule, keep))
                .with(KindTag::District, next(Dimension::Taluka, rule, keep))
                .with(KindTag::Taluka, next(Dimension::Village, rule, keep))
                .with(KindTag::Village, orders(rule, keep))
        }
    }
}

/// Fetch the top-level orders and build the eager root of `dashboard`
pub async fn bootstrap(
    dashboard: Dashboard,
    source: &dyn OrderSource,
    filters: &Filters,
) -> Result<Assembly, LoadError> {
    let rows = source.fetch_orders(&Scope::default(), filters).await?;
    let assembly = match dashboard {
        Dashboard::SalesBuckets => bucket_root(dashboard.title(), &rows),
        Dashboard::Outstanding => salesman_root(
            dashboard.title(),
            &rows,
            Measure::Outstanding,
            OrderPredicate::PositiveMeasure,
        ),
        Dashboard::SalesmenPerformance => salesman_root(
            dashboard.title(),
            &rows,
            Measure::Amount,
            OrderPredicate::All,
        ),
    };
    info!(
        dashboard = %dashboard,
        orders = rows.len(),
        issues = assembly.issues.len(),
        "dashboard bootstrapped"
    );
    Ok(assembly)
}

/// Bootstrap `dashboard` and wrap it in an explorer with its loaders
pub async fn open(
    dashboard: Dashboard,
    source: Arc<dyn OrderSource>,
    filters: Filters,
    config: ExplorerConfig,
) -> Result<(Explorer, Assembly), LoadError> {
    let assembly = bootstrap(dashboard, source.as_ref(), &filters).await?;
    let explorer = Explorer::new(
        Arc::clone(&assembly.root),
        registry(dashboard, source),
        config,
    )
    .with_filters(filters);
    Ok((explorer, assembly))
}

fn bucket_root(title: &str, rows: &[OrderRecord]) -> Assembly {
    let total: Decimal = rows.iter().map(|r| r.amount).sum();
    let buckets = [Measure::Collected, Measure::Outstanding]
        .into_iter()
        .map(|measure| {
            let kept: Vec<&OrderRecord> = rows
                .iter()
                .filter(|r| OrderPredicate::PositiveMeasure.keeps(r, measure))
                .collect();
            let label = measure.bucket_label();
            NodeSpec::new(
                NodeKind::Bucket {
                    name: label.to_string(),
                },
                label,
            )
            .value(kept.iter().map(|r| measure.of(r)).sum())
            .count(kept.len() as u64)
        })
        .collect();

    let (root, issues) = Node::root(title, total, rows.len() as u64, buckets);
    Assembly { root, issues }
}

fn salesman_root(
    title: &str,
    rows: &[OrderRecord],
    measure: Measure,
    predicate: OrderPredicate,
) -> Assembly {
    let grouping = group_orders(
        rows.iter().filter(|r| predicate.keeps(r, measure)),
        &[Dimension::Salesman],
        measure,
    );
    let total = grouping.total();
    let count = grouping.count();
    let mut issues = grouping.dropped.clone();
    let (root, mut placed) = Node::root(title, total, count, grouping.into_specs(true));
    issues.append(&mut placed);
    Assembly { root, issues }
}
