//! Host runtime context.
//!
//! # Responsibilities
//! - Resolve component ids to target references
//! - Provide the worker pool the server submits tasks to
//!
//! # Design Decisions
//! - The server only depends on the `Context` trait; `SystemContext` is a
//!   ready-made in-memory implementation for embedding and tests
//! - Components may come and go while the server runs

use dashmap::DashMap;

use crate::runtime::pool::WorkerPool;
use crate::runtime::target::TargetRef;

/// What the HTTP server needs from the runtime that hosts it.
pub trait Context: Send + Sync {
    /// Look up a live component by id.
    fn reference(&self, id: &str) -> Option<TargetRef>;

    /// Pool that worker tasks are submitted to.
    fn scheduler(&self) -> &WorkerPool;
}

/// In-memory component table plus a worker pool.
#[derive(Debug)]
pub struct SystemContext {
    units: DashMap<String, TargetRef>,
    pool: WorkerPool,
}

impl SystemContext {
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            units: DashMap::new(),
            pool,
        }
    }

    /// Register a component under its own id, replacing any previous one.
    pub fn register(&self, target: TargetRef) {
        let id = target.id().to_string();
        tracing::debug!(unit = %id, message_type = %target.message_type(), "Component registered");
        self.units.insert(id, target);
    }

    /// Remove a component. Returns the removed reference, if any.
    pub fn remove(&self, id: &str) -> Option<TargetRef> {
        self.units.remove(id).map(|(_, target)| target)
    }

    pub fn unit_ids(&self) -> Vec<String> {
        self.units.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Context for SystemContext {
    fn reference(&self, id: &str) -> Option<TargetRef> {
        self.units.get(id).map(|entry| entry.value().clone())
    }

    fn scheduler(&self) -> &WorkerPool {
        &self.pool
    }
}
