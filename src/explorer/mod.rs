//! Lazy hierarchical explorer
//!
//! Nodes are addressed by structural path. Expanding an uncached node asks
//! a [`ChildLoader`](crate::loaders::ChildLoader) for its children; results
//! are cached per path and deduplicated against concurrent toggles. The
//! render tree and layout are re-derived from state on every change.
//!
//! # Pipeline
//!
//! | Stage | Module | Purpose |
//! |-------|--------|---------|
//! | identity | `path` | `PathKey`, structural node ids |
//! | data | `node` | immutable `Node` tree, `NodeSpec` builder |
//! | memo | `cache` | loaded children + in-flight markers |
//! | state | `expansion` | expanded set with cascading collapse |
//! | control | `orchestrator` | toggle protocol, `Explorer` |
//! | view | `projector` | percentage, highlight, loading placeholder |
//! | view | `layout` | depth/order positions, canvas height |

pub mod cache;
pub mod expansion;
pub mod layout;
pub mod node;
pub mod orchestrator;
pub mod path;
pub mod projector;

pub use cache::LoadCache;
pub use expansion::ExpansionSet;
pub use layout::{canvas_height, layout, Layout, LayoutEdge, LayoutNode};
pub use node::{materialize, Dimension, KindTag, Node, NodeKind, NodeSpec, Scope};
pub use orchestrator::{Explorer, ExplorerEvent, ExplorerState, ToggleOutcome};
pub use path::PathKey;
pub use projector::{project, NodeState, ProjectedKind, ProjectedNode, ProjectionInput};
