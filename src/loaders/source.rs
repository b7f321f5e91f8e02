//! Order data source boundary
//!
//! `OrderSource` stands in for the HTTP client and the backend aggregation
//! endpoints. Loaders only ever see [`OrderRecord`]s; mapping them into
//! nodes is the loader's job.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::explorer::node::{Dimension, Scope};
use crate::filters::Filters;

/// Raw order row as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    #[serde(default)]
    pub salesman: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub taluka: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub paid: Decimal,
    #[serde(default)]
    pub status: Option<String>,
    pub placed_on: NaiveDate,
}

impl OrderRecord {
    /// Unpaid balance, never negative
    pub fn outstanding(&self) -> Decimal {
        (self.amount - self.paid).max(Decimal::ZERO)
    }

    /// Collected amount, capped at the order amount
    pub fn collected(&self) -> Decimal {
        self.paid.min(self.amount).max(Decimal::ZERO)
    }

    /// Value of the given dimension. Blank values read as "Unknown"; a
    /// missing value is `None`.
    pub fn dimension(&self, dimension: Dimension) -> Option<&str> {
        let value = match dimension {
            Dimension::Salesman => self.salesman.as_deref(),
            Dimension::District => self.district.as_deref(),
            Dimension::Taluka => self.taluka.as_deref(),
            Dimension::Village => self.village.as_deref(),
        }?;
        let trimmed = value.trim();
        Some(if trimmed.is_empty() { "Unknown" } else { trimmed })
    }

    /// Display label for an order leaf
    pub fn label(&self) -> String {
        match self.customer.as_deref().map(str::trim) {
            Some(customer) if !customer.is_empty() => format!("{} ({})", customer, self.id),
            _ => self.id.clone(),
        }
    }

    fn in_scope(&self, scope: &Scope) -> bool {
        [
            Dimension::Salesman,
            Dimension::District,
            Dimension::Taluka,
            Dimension::Village,
        ]
        .into_iter()
        .all(|d| match scope.get(d) {
            Some(wanted) => self.dimension(d) == Some(wanted),
            None => true,
        })
    }

    fn admitted_by(&self, filters: &Filters) -> bool {
        if !filters.admits_date(self.placed_on) {
            return false;
        }
        if let Some(status) = &filters.status {
            if !self
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(status))
            {
                return false;
            }
        }
        if let Some(search) = filters.search.as_deref().map(str::trim) {
            let needle = search.to_lowercase();
            if !needle.is_empty()
                && !self.id.to_lowercase().contains(&needle)
                && !self
                    .customer
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

/// Which amount of an order a tree measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Amount,
    Collected,
    Outstanding,
}

impl Measure {
    pub fn of(self, record: &OrderRecord) -> Decimal {
        match self {
            Measure::Amount => record.amount,
            Measure::Collected => record.collected(),
            Measure::Outstanding => record.outstanding(),
        }
    }

    /// Bucket names used by the sales bucketing tree
    pub fn from_bucket(name: &str) -> Option<Measure> {
        match name.trim().to_lowercase().as_str() {
            "collected" => Some(Measure::Collected),
            "outstanding" => Some(Measure::Outstanding),
            "total" | "amount" => Some(Measure::Amount),
            _ => None,
        }
    }

    pub fn bucket_label(self) -> &'static str {
        match self {
            Measure::Amount => "Total",
            Measure::Collected => "Collected",
            Measure::Outstanding => "Outstanding",
        }
    }
}

/// Row filter applied before grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPredicate {
    #[default]
    All,
    /// Keep rows whose measured value is greater than zero
    /// (e.g. only unpaid balance > 0 for the outstanding tree)
    PositiveMeasure,
}

impl OrderPredicate {
    pub fn keeps(self, record: &OrderRecord, measure: Measure) -> bool {
        match self {
            OrderPredicate::All => true,
            OrderPredicate::PositiveMeasure => measure.of(record) > Decimal::ZERO,
        }
    }
}

/// Backend access for order rows
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Orders under `scope` that pass `filters`
    async fn fetch_orders(
        &self,
        scope: &Scope,
        filters: &Filters,
    ) -> Result<Vec<OrderRecord>, LoadError>;
}

/// In-memory source over a fixed order list
#[derive(Debug, Default)]
pub struct InMemoryOrderSource {
    orders: Vec<OrderRecord>,
    calls: AtomicUsize,
}

impl InMemoryOrderSource {
    pub fn new(orders: Vec<OrderRecord>) -> Self {
        Self {
            orders,
            calls: AtomicUsize::new(0),
        }
    }

    /// Parse a JSON array of order records
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Number of fetches served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn orders(&self) -> &[OrderRecord] {
        &self.orders
    }
}

#[async_trait]
impl OrderSource for InMemoryOrderSource {
    async fn fetch_orders(
        &self,
        scope: &Scope,
        filters: &Filters,
    ) -> Result<Vec<OrderRecord>, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .orders
            .iter()
            .filter(|order| order.in_scope(scope) && order.admitted_by(filters))
            .cloned()
            .collect())
    }
}
