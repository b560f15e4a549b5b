//! URI registry: path → allowed methods and bound component.
//!
//! # Responsibilities
//! - Record which methods each path accepts (`add_node`)
//! - Bind component references to paths, directly or by component id
//! - Reconcile id bindings against the live runtime (`update_units`)
//! - Serve lookups from the reactor and every worker thread
//!
//! # Design Decisions
//! - One instance shared by `Arc` for the life of the process
//! - Entries change under their shard lock and are cloned out to readers,
//!   so a reader never sees methods and binding from different writes
//! - Re-binding a path is last-write-wins

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::http::request::Method;
use crate::routing::normalize_path;
use crate::runtime::context::Context;
use crate::runtime::target::TargetRef;

/// Snapshot of one registry entry.
#[derive(Clone, Default)]
pub struct RouteEntry {
    methods: BTreeSet<Method>,
    target: Option<TargetRef>,
}

impl RouteEntry {
    pub fn methods(&self) -> &BTreeSet<Method> {
        &self.methods
    }

    pub fn allows(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    pub fn target(&self) -> Option<&TargetRef> {
        self.target.as_ref()
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("methods", &self.methods)
            .field("target", &self.target.as_ref().map(|t| t.id().to_string()))
            .finish()
    }
}

/// Process-wide routing table shared by the reactor and workers.
#[derive(Default)]
pub struct UriRegistry {
    nodes: DashMap<String, RouteEntry>,
    /// path → component id, resolved by `update_units`.
    unit_paths: DashMap<String, String>,
}

impl UriRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Allow `method` on `path`. Idempotent.
    pub fn add_node(&self, path: &str, method: Method) {
        let path = normalize_path(path);
        let mut entry = self.nodes.entry(path).or_default();
        entry.methods.insert(method);
    }

    /// Bind `target` to `path`, replacing any earlier binding.
    pub fn add_unit_to_node(&self, path: &str, target: TargetRef) {
        let path = normalize_path(path);
        tracing::debug!(path = %path, unit = target.id(), "Component bound to path");
        let mut entry = self.nodes.entry(path).or_default();
        entry.target = Some(target);
    }

    /// Record that `path` should be served by the component `unit_id`.
    /// The reference is resolved by the next `update_units`.
    pub fn add_unit_path_node(&self, path: &str, unit_id: &str) {
        let path = normalize_path(path);
        self.nodes.entry(path.clone()).or_default();
        self.unit_paths.insert(path, unit_id.to_string());
    }

    /// Look up `path`. `None` when nothing was ever registered for it.
    pub fn get_methods_by_path(&self, path: &str) -> Option<RouteEntry> {
        self.nodes
            .get(normalize_path(path).as_str())
            .map(|entry| entry.value().clone())
    }

    /// Resolve every id binding against the components alive in `context`.
    ///
    /// Binds references that appeared or changed and clears bindings whose
    /// component disappeared. Safe to call as often as needed.
    pub fn update_units(&self, context: &dyn Context) {
        let bindings: Vec<(String, String)> = self
            .unit_paths
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        for (path, unit_id) in bindings {
            let live = context.reference(&unit_id);
            let mut entry = self.nodes.entry(path.clone()).or_default();
            match live {
                Some(live) => {
                    let unchanged = entry.target.as_ref().is_some_and(|bound| Arc::ptr_eq(&live, bound));
                    if !unchanged {
                        tracing::debug!(path = %path, unit = %unit_id, "Component bound to path");
                        entry.target = Some(live);
                    }
                }
                None => {
                    let vanished = entry.target.as_ref().is_some_and(|bound| bound.id() == unit_id);
                    if vanished {
                        tracing::debug!(path = %path, unit = %unit_id, "Component gone, path unbound");
                        entry.target = None;
                    }
                }
            }
        }
    }

    /// All registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.nodes.iter().map(|entry| entry.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Debug for UriRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UriRegistry")
            .field("paths", &self.paths())
            .field("unit_paths", &self.unit_paths.len())
            .finish()
    }
}
