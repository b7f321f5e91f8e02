//! Orchestrator - owns explorer state and runs the toggle protocol
//!
//! `ExplorerState` is the synchronous state machine (expansion, cache,
//! in-flight markers, errors, search term, filters, epoch). `Explorer` wraps
//! it in a mutex and adds the async part: resolving a loader, awaiting it,
//! and merging the result. The mutex is never held across an await, so
//! toggles on different branches can be in flight at the same time while
//! `begin_load` keeps a single fetch per key. Each fetch carries the token
//! `begin_load` issued; only the fetch holding the current marker may land.
//!
//! ```text
//! collapsed --toggle--> expanding --ok--> expanded
//!     ^                     |
//!     +------- err ---------+        expanded --toggle--> collapsed (cascade)
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::cache::{FetchToken, LoadCache};
use super::expansion::ExpansionSet;
use super::layout::{layout, Layout};
use super::node::Node;
use super::path::PathKey;
use super::projector::{self, NodeState, ProjectedNode, ProjectionInput};
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, LoadError};
use crate::filters::Filters;
use crate::format::{PlainFormatter, ValueFormatter};
use crate::loaders::LoaderRegistry;

// =============================================================================
// EVENTS & OUTCOMES
// =============================================================================

/// Events a renderer sends back to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExplorerEvent {
    Toggle { path: String },
    Search { term: String },
}

/// Result of a toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Children were already available (eager or cached)
    Expanded,
    /// Children were fetched and cached
    Loaded { children: usize },
    /// The node and `removed - 1` expanded descendants were collapsed
    Collapsed { removed: usize },
    /// A fetch for this node is already running; nothing was done
    AlreadyLoading,
    /// Leaf node; nothing to do
    NotExpandable,
    /// The fetch finished after an invalidation and was thrown away
    Stale,
    /// Cached data was dropped for a collapsed node (refresh)
    Invalidated,
}

// =============================================================================
// STATE
// =============================================================================

/// What `plan_toggle` decided
enum TogglePlan {
    Done(ToggleOutcome),
    Fetch {
        node: Arc<Node>,
        epoch: u64,
        token: FetchToken,
        filters: Filters,
    },
}

/// Synchronous explorer state. Only the orchestrator mutates it.
#[derive(Debug)]
pub struct ExplorerState {
    root: Arc<Node>,
    expansion: ExpansionSet,
    cache: LoadCache,
    errors: HashMap<PathKey, String>,
    search: String,
    filters: Filters,
    /// Bumped whenever previously loaded data stops being valid
    epoch: u64,
    root_expanded: bool,
}

impl ExplorerState {
    pub fn new(root: Arc<Node>, root_expanded: bool) -> Self {
        let mut expansion = ExpansionSet::new();
        if root_expanded {
            expansion.insert(root.path.clone());
        }
        Self {
            root,
            expansion,
            cache: LoadCache::new(),
            errors: HashMap::new(),
            search: String::new(),
            filters: Filters::default(),
            epoch: 0,
            root_expanded,
        }
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    pub fn expansion(&self) -> &ExpansionSet {
        &self.expansion
    }

    pub fn cache(&self) -> &LoadCache {
        &self.cache
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn search_term(&self) -> &str {
        &self.search
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn error(&self, path: &str) -> Option<&str> {
        self.errors.get(path).map(String::as_str)
    }

    /// Children currently available for `node`: eager list first, then cache
    fn available_children<'a>(&'a self, node: &'a Node) -> Option<&'a [Arc<Node>]> {
        node.eager_children()
            .or_else(|| self.cache.get(node.path.as_str()))
    }

    /// Resolve a node that is currently visible (every ancestor expanded)
    pub fn find_visible(&self, path: &str) -> Option<Arc<Node>> {
        let mut current = Arc::clone(&self.root);
        loop {
            if current.path.as_str() == path {
                return Some(current);
            }
            if !current.path.is_ancestor_of_str(path)
                || !self.expansion.contains(current.path.as_str())
            {
                return None;
            }
            // Labels may contain the separator, so an exact match wins and
            // otherwise the deepest matching ancestor
            let children = self.available_children(&current)?;
            let next = children
                .iter()
                .find(|child| child.path.as_str() == path)
                .or_else(|| {
                    children
                        .iter()
                        .filter(|child| child.path.is_ancestor_of_str(path))
                        .max_by_key(|child| child.path.as_str().len())
                })?;
            current = Arc::clone(next);
        }
    }

    pub fn node_state(&self, path: &str) -> Option<NodeState> {
        let node = self.find_visible(path)?;
        Some(projector::node_state(
            &node,
            &self.expansion,
            &self.cache,
            &self.errors,
        ))
    }

    fn plan_toggle(&mut self, path: &str) -> Result<TogglePlan, ExplorerError> {
        let node = self
            .find_visible(path)
            .ok_or_else(|| ExplorerError::UnknownPath {
                path: path.to_string(),
            })?;
        let key = node.path.clone();

        if self.cache.is_in_flight(key.as_str()) {
            debug!(path = %key, "toggle ignored, fetch in flight");
            return Ok(TogglePlan::Done(ToggleOutcome::AlreadyLoading));
        }

        if self.expansion.contains(key.as_str()) {
            let removed = self.expansion.remove_cascading(&key).len();
            debug!(path = %key, removed, "collapsed");
            return Ok(TogglePlan::Done(ToggleOutcome::Collapsed { removed }));
        }

        if !node.expandable {
            return Ok(TogglePlan::Done(ToggleOutcome::NotExpandable));
        }

        if self.available_children(&node).is_some() {
            self.errors.remove(key.as_str());
            self.expansion.insert(key.clone());
            debug!(path = %key, "expanded from cache");
            return Ok(TogglePlan::Done(ToggleOutcome::Expanded));
        }

        let Some(token) = self.cache.begin_load(&key) else {
            return Ok(TogglePlan::Done(ToggleOutcome::AlreadyLoading));
        };
        self.errors.remove(key.as_str());
        self.expansion.insert(key);

        Ok(TogglePlan::Fetch {
            node,
            epoch: self.epoch,
            token,
            filters: self.filters.clone(),
        })
    }

    /// Mark a fetch that never started (no loader) as failed
    fn reject_fetch(&mut self, path: &PathKey, token: FetchToken, error: &LoadError) {
        if self.cache.fail_load(path, token) {
            self.expansion.remove_cascading(path);
            self.errors.insert(path.clone(), error.to_string());
        }
    }

    fn finish_load(
        &mut self,
        path: &PathKey,
        epoch: u64,
        token: FetchToken,
        result: Result<Vec<Arc<Node>>, LoadError>,
    ) -> Result<ToggleOutcome, ExplorerError> {
        if epoch != self.epoch {
            debug!(path = %path, epoch, current = self.epoch, "ignoring completion from stale epoch");
            self.cache.fail_load(path, token);
            return Ok(ToggleOutcome::Stale);
        }

        match result {
            Ok(children) => {
                let count = children.len();
                if self.cache.complete_load(path, token, children) {
                    info!(path = %path, children = count, "children loaded");
                    Ok(ToggleOutcome::Loaded { children: count })
                } else {
                    Ok(ToggleOutcome::Stale)
                }
            }
            Err(source) => {
                if !self.cache.fail_load(path, token) {
                    debug!(path = %path, error = %source, "ignoring failure of a superseded fetch");
                    return Ok(ToggleOutcome::Stale);
                }
                warn!(path = %path, error = %source, "loading children failed");
                self.expansion.remove_cascading(path);
                self.errors.insert(path.clone(), source.to_string());
                Err(ExplorerError::Load {
                    path: path.clone(),
                    source,
                })
            }
        }
    }

    /// Clear a marker whose fetch ended without reporting (cancelled or
    /// panicked); the node goes back to collapsed.
    fn abandon_load(&mut self, path: &PathKey, token: FetchToken) {
        if self.cache.fail_load(path, token) {
            warn!(path = %path, token, "fetch abandoned, clearing in-flight marker");
            self.expansion.remove_cascading(path);
        }
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
    }

    /// New filters invalidate every lazily loaded subtree
    pub fn set_filters(&mut self, filters: Filters) {
        self.filters = filters;
        self.reset_lazy_state();
    }

    /// Swap in new root data (e.g. re-fetched totals)
    pub fn replace_root(&mut self, root: Arc<Node>) {
        self.root = root;
        self.reset_lazy_state();
    }

    fn reset_lazy_state(&mut self) {
        self.epoch += 1;
        self.cache.invalidate_all();
        self.errors.clear();
        self.expansion.clear();
        if self.root_expanded {
            self.expansion.insert(self.root.path.clone());
        }
        info!(epoch = self.epoch, "explorer state reset");
    }

    /// Drop cached data for `path` and its descendants. Fetches still running
    /// below `path` lose their markers and land as `Stale`. Returns whether
    /// the node was expanded before.
    fn invalidate_subtree(&mut self, path: &PathKey) -> bool {
        let was_expanded = self.expansion.contains(path.as_str());
        self.expansion.remove_cascading(path);
        self.cache.invalidate(path);
        self.errors
            .retain(|key, _| key != path && !path.is_ancestor_of(key));
        was_expanded
    }

    pub fn collapse_all(&mut self) {
        self.expansion.clear();
        if self.root_expanded {
            self.expansion.insert(self.root.path.clone());
        }
    }

    /// Expand every node down to `depth` whose children are already
    /// available. Never fetches. Returns the number of newly expanded nodes.
    pub fn expand_loaded_to_depth(&mut self, depth: usize) -> usize {
        let mut added = 0;
        let mut stack = vec![Arc::clone(&self.root)];
        while let Some(node) = stack.pop() {
            if node.path.depth() >= depth || !node.expandable {
                continue;
            }
            let Some(children) = self.available_children(&node).map(<[_]>::to_vec) else {
                continue;
            };
            if self.expansion.insert(node.path.clone()) {
                added += 1;
            }
            stack.extend(children);
        }
        added
    }

    pub fn project(&self, formatter: &dyn ValueFormatter) -> ProjectedNode {
        projector::project(&ProjectionInput {
            root: &self.root,
            expansion: &self.expansion,
            cache: &self.cache,
            errors: &self.errors,
            search: &self.search,
            formatter,
        })
    }
}

// =============================================================================
// IN-FLIGHT GUARD
// =============================================================================

/// Clears the in-flight marker if the awaiting future is dropped or the
/// loader panics before the result is merged.
struct InFlightGuard<'a> {
    state: &'a Mutex<ExplorerState>,
    path: PathKey,
    token: FetchToken,
    armed: bool,
}

impl<'a> InFlightGuard<'a> {
    fn new(state: &'a Mutex<ExplorerState>, path: PathKey, token: FetchToken) -> Self {
        Self {
            state,
            path,
            token,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.abandon_load(&self.path, self.token);
        }
    }
}

// =============================================================================
// EXPLORER
// =============================================================================

/// The explorer engine: state + loaders + formatter
pub struct Explorer {
    state: Mutex<ExplorerState>,
    loaders: LoaderRegistry,
    config: ExplorerConfig,
    formatter: Arc<dyn ValueFormatter>,
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("loaders", &self.loaders)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Explorer {
    pub fn new(root: Arc<Node>, loaders: LoaderRegistry, config: ExplorerConfig) -> Self {
        Self {
            state: Mutex::new(ExplorerState::new(root, config.root_expanded)),
            loaders,
            config,
            formatter: Arc::new(PlainFormatter::default()),
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn ValueFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Start with filters already applied
    pub fn with_filters(self, filters: Filters) -> Self {
        self.state().filters = filters;
        self
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, ExplorerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Expand or collapse the node at `path`.
    ///
    /// A load failure is returned as `ExplorerError::Load`; the node is left
    /// collapsed with its error recorded and the next toggle retries.
    pub async fn toggle(&self, path: &str) -> Result<ToggleOutcome, ExplorerError> {
        let plan = self.state().plan_toggle(path)?;
        let (node, epoch, token, filters) = match plan {
            TogglePlan::Done(outcome) => return Ok(outcome),
            TogglePlan::Fetch {
                node,
                epoch,
                token,
                filters,
            } => (node, epoch, token, filters),
        };

        let loader = match self.loaders.for_node(&node) {
            Ok(loader) => loader,
            Err(source) => {
                warn!(path = %node.path, error = %source, "no loader for node");
                self.state().reject_fetch(&node.path, token, &source);
                return Err(ExplorerError::Load {
                    path: node.path.clone(),
                    source,
                });
            }
        };

        let mut guard = InFlightGuard::new(&self.state, node.path.clone(), token);
        debug!(path = %node.path, loader = loader.name(), "fetching children");
        let result = loader.load(&node, &filters).await;
        guard.disarm();

        self.state().finish_load(&node.path, epoch, token, result)
    }

    /// Set the highlight term. Never expands or fetches.
    pub fn search(&self, term: &str) {
        self.state().set_search(term);
    }

    pub fn search_term(&self) -> String {
        self.state().search.clone()
    }

    /// Replace the filters and drop everything loaded under the old ones
    pub fn set_filters(&self, filters: Filters) {
        self.state().set_filters(filters);
    }

    pub fn filters(&self) -> Filters {
        self.state().filters.clone()
    }

    /// Swap the root data; lazily loaded state is dropped
    pub fn replace_root(&self, root: Arc<Node>) {
        self.state().replace_root(root);
    }

    /// Re-fetch the subtree at `path`. An expanded node is expanded again
    /// (fetching when needed); a collapsed one just forgets its cache.
    pub async fn refresh(&self, path: &str) -> Result<ToggleOutcome, ExplorerError> {
        let (key, was_expanded) = {
            let mut state = self.state();
            let node = state
                .find_visible(path)
                .ok_or_else(|| ExplorerError::UnknownPath {
                    path: path.to_string(),
                })?;
            if state.cache.is_in_flight(node.path.as_str()) {
                return Ok(ToggleOutcome::AlreadyLoading);
            }
            let was_expanded = state.invalidate_subtree(&node.path);
            (node.path.clone(), was_expanded)
        };

        if was_expanded {
            self.toggle(key.as_str()).await
        } else {
            Ok(ToggleOutcome::Invalidated)
        }
    }

    pub fn collapse_all(&self) {
        self.state().collapse_all();
    }

    pub fn expand_loaded_to_depth(&self, depth: usize) -> usize {
        self.state().expand_loaded_to_depth(depth)
    }

    /// Dispatch a renderer event. Search events yield `None`.
    pub async fn handle(
        &self,
        event: ExplorerEvent,
    ) -> Result<Option<ToggleOutcome>, ExplorerError> {
        match event {
            ExplorerEvent::Toggle { path } => self.toggle(&path).await.map(Some),
            ExplorerEvent::Search { term } => {
                self.search(&term);
                Ok(None)
            }
        }
    }

    pub fn node_state(&self, path: &str) -> Option<NodeState> {
        self.state().node_state(path)
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.state().expansion.contains(path)
    }

    pub fn is_loading(&self, path: &str) -> bool {
        self.state().cache.is_in_flight(path)
    }

    pub fn error(&self, path: &str) -> Option<String> {
        self.state().error(path).map(str::to_string)
    }

    pub fn cached_children(&self, path: &str) -> Option<Vec<Arc<Node>>> {
        self.state().cache.get(path).map(<[_]>::to_vec)
    }

    pub fn expanded_paths(&self) -> Vec<PathKey> {
        self.state().expansion.sorted()
    }

    pub fn epoch(&self) -> u64 {
        self.state().epoch
    }

    pub fn root(&self) -> Arc<Node> {
        Arc::clone(&self.state().root)
    }

    /// Current render-ready tree
    pub fn project(&self) -> ProjectedNode {
        self.state().project(self.formatter.as_ref())
    }

    /// Current tree with positions
    pub fn render(&self) -> Layout {
        let tree = self.project();
        layout(&tree, &self.config.layout)
    }
}
