//! drilldown - lazy hierarchical data explorer engine
//!
//! One engine behind the sales bucketing, outstanding balance and salesmen
//! performance trees. Nodes are addressed by structural path, children come
//! from pluggable async loaders, loaded subtrees are cached and protected
//! against duplicate concurrent fetches, and the render tree (percentages,
//! highlighting, layout) is derived from the expansion state on demand.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use drilldown::{presets, Dashboard, ExplorerConfig, Filters, InMemoryOrderSource};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(InMemoryOrderSource::from_json("[]")?);
//! let (explorer, _) = presets::open(
//!     Dashboard::SalesmenPerformance,
//!     source,
//!     Filters::new(),
//!     ExplorerConfig::default(),
//! )
//! .await?;
//!
//! explorer.toggle("root.Salesman: Rao").await?;
//! let layout = explorer.render();
//! println!("{}", serde_json::to_string_pretty(&layout)?);
//! # Ok(())
//! # }
//! ```

// Errors shared by every module
pub mod error;

// Engine configuration (env / YAML)
pub mod config;

// Opaque filters passed through to loaders
pub mod filters;

// Display formatting hook
pub mod format;

// Core engine: paths, nodes, cache, expansion, orchestration, projection, layout
pub mod explorer;

// Loader strategies and the order data boundary
pub mod loaders;

// Root-data assembly
pub mod bootstrap;

// The three dashboards
pub mod presets;

pub mod telemetry;

pub use bootstrap::{assemble, Assembly, FlatRecord, RootData, RootRecord};
pub use config::{ExplorerConfig, LayoutConfig};
pub use error::{ExplorerError, LoadError};
pub use explorer::{
    Explorer, ExplorerEvent, Layout, Node, NodeKind, NodeSpec, NodeState, PathKey, ProjectedNode,
    ToggleOutcome,
};
pub use filters::Filters;
pub use format::{PlainFormatter, ValueFormatter};
pub use loaders::{ChildLoader, InMemoryOrderSource, LoaderRegistry, OrderRecord, OrderSource};
pub use presets::Dashboard;
