//! Bounded worker pool for request decoding and routing.
//!
//! # Responsibilities
//! - Run worker tasks off the reactor thread
//! - Bound the number of tasks running at once
//! - Let a non-async thread wait on a submitted task
//!
//! # Design Decisions
//! - Backed by a tokio runtime; tasks run through `spawn_blocking`
//!   because components may do blocking work in their accessors
//! - A semaphore bounds concurrency even when the runtime is shared
//!   with the rest of the host

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};

/// Error returned when a submitted task does not produce a value.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool is closed")]
    Closed,
    #[error("worker task failed: {0}")]
    Failed(#[from] JoinError),
}

/// Handle to a task submitted with [`WorkerPool::submit`].
pub type Submitted<R> = JoinHandle<Result<R, PoolError>>;

/// A cloneable, bounded pool of worker threads.
#[derive(Clone)]
pub struct WorkerPool {
    handle: Handle,
    permits: Arc<Semaphore>,
    limit: usize,
    submitted: Arc<AtomicU64>,
    /// Present when the pool owns its runtime.
    _runtime: Option<Arc<Runtime>>,
}

impl WorkerPool {
    /// Build a pool with its own multi-threaded runtime.
    pub fn new(workers: usize) -> std::io::Result<Self> {
        let workers = workers.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .max_blocking_threads(workers)
            .thread_name("component-http-worker")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();

        tracing::debug!(workers, "Worker pool started");

        Ok(Self {
            handle,
            permits: Arc::new(Semaphore::new(workers)),
            limit: workers,
            submitted: Arc::new(AtomicU64::new(0)),
            _runtime: Some(Arc::new(runtime)),
        })
    }

    /// Use a runtime owned by the host, running at most `limit` tasks at once.
    pub fn from_handle(handle: Handle, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            handle,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
            submitted: Arc::new(AtomicU64::new(0)),
            _runtime: None,
        }
    }

    /// Submit a blocking job. It starts once a slot is free.
    pub fn submit<F, R>(&self, job: F) -> Submitted<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let permits = Arc::clone(&self.permits);
        self.handle.spawn(async move {
            let _permit = permits.acquire_owned().await.map_err(|_| PoolError::Closed)?;
            Ok::<R, PoolError>(tokio::task::spawn_blocking(job).await?)
        })
    }

    /// Block the calling thread until `task` completes.
    ///
    /// Must not be called from inside an async context.
    pub fn wait<R>(&self, task: Submitted<R>) -> Result<R, PoolError> {
        match self.handle.block_on(task) {
            Ok(result) => result,
            Err(e) => Err(PoolError::Failed(e)),
        }
    }

    /// Spawn a future on the pool's runtime.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Drive a future to completion from a non-async thread.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Maximum number of tasks running at once.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Total number of jobs submitted since the pool was created.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("limit", &self.limit)
            .field("available", &self.permits.available_permits())
            .field("submitted", &self.submitted())
            .field("owns_runtime", &self._runtime.is_some())
            .finish()
    }
}
