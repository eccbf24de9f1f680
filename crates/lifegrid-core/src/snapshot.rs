//! Bounded worker pool for per-generation snapshots.
//!
//! The generation loop itself is strictly sequential: generation `k + 1`
//! is only computed once generation `k` is complete. What can run beside
//! it is the bookkeeping for each finished generation, namely encoding the
//! copied grid into its persisted string form. [`SnapshotBatch`] offloads
//! that work onto blocking tasks in a [`JoinSet`], never running more than
//! the pool's parallelism at once.
//!
//! Results are handed back ordered by generation regardless of which task
//! finished first, and a batch is always drained before its snapshots are
//! returned.

use std::sync::Arc;

use lifegrid_types::GridState;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::JoinSet;
use tracing::debug;

/// Default number of snapshot tasks allowed to run at once.
pub const DEFAULT_SNAPSHOT_WORKERS: usize = 4;

/// Errors raised by the snapshot pool.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The pool's semaphore was closed while a batch was in flight.
    #[error("snapshot pool is closed")]
    PoolClosed,

    /// A snapshot task panicked or was cancelled.
    #[error("snapshot task failed: {source}")]
    TaskFailed {
        /// The join error reported by the runtime.
        #[from]
        source: tokio::task::JoinError,
    },
}

/// An immutable copy of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// 1-based generation number within the runner's lifetime.
    pub generation: u64,
    /// The copied grid.
    pub grid: GridState,
    /// `grid` in persisted string form.
    pub encoded: String,
}

impl Snapshot {
    /// Capture `grid` as generation `generation`.
    pub fn capture(generation: u64, grid: GridState) -> Self {
        let encoded = grid.encode();
        Self {
            generation,
            grid,
            encoded,
        }
    }
}

/// Shared parallelism limit for snapshot batches.
#[derive(Debug, Clone)]
pub struct SnapshotPool {
    semaphore: Arc<Semaphore>,
    parallelism: usize,
}

impl Default for SnapshotPool {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_WORKERS)
    }
}

impl SnapshotPool {
    /// Create a pool running at most `parallelism` tasks at once. A value
    /// of zero is raised to one.
    pub fn new(parallelism: usize) -> Self {
        let parallelism = parallelism.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(parallelism)),
            parallelism,
        }
    }

    /// Maximum number of concurrent snapshot tasks.
    pub const fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Permits not held by a running snapshot task.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Start an empty batch that draws permits from this pool.
    pub fn batch(&self) -> SnapshotBatch {
        SnapshotBatch {
            semaphore: Arc::clone(&self.semaphore),
            set: JoinSet::new(),
            finished: Vec::new(),
        }
    }
}

/// Snapshots of one run, some possibly still being encoded.
///
/// Dropping a batch without calling [`SnapshotBatch::drain`] aborts any
/// outstanding tasks.
#[derive(Debug)]
pub struct SnapshotBatch {
    semaphore: Arc<Semaphore>,
    set: JoinSet<Snapshot>,
    /// Outputs joined early to free a permit.
    finished: Vec<Snapshot>,
}

impl SnapshotBatch {
    /// Hand a copied generation to the pool.
    ///
    /// Waits for a running task to finish when the pool is saturated, so
    /// the number of grids in flight stays bounded.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the pool is closed or a task that had
    /// to be joined early failed.
    pub async fn submit(&mut self, generation: u64, grid: GridState) -> Result<(), SnapshotError> {
        let permit = self.acquire().await?;
        self.set.spawn_blocking(move || {
            let snapshot = Snapshot::capture(generation, grid);
            drop(permit);
            snapshot
        });
        Ok(())
    }

    /// Number of snapshots submitted and not yet returned.
    pub fn pending(&self) -> usize {
        self.set.len().saturating_add(self.finished.len())
    }

    /// Wait for every task and return all snapshots ordered by generation.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::TaskFailed`] if any task failed. The
    /// remaining tasks are aborted.
    pub async fn drain(mut self) -> Result<Vec<Snapshot>, SnapshotError> {
        while let Some(joined) = self.set.join_next().await {
            self.finished.push(joined?);
        }
        let mut snapshots = self.finished;
        snapshots.sort_by_key(|s| s.generation);
        debug!(count = snapshots.len(), "Snapshot batch drained");
        Ok(snapshots)
    }

    async fn acquire(&mut self) -> Result<OwnedSemaphorePermit, SnapshotError> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(permit),
            Err(TryAcquireError::Closed) => Err(SnapshotError::PoolClosed),
            Err(TryAcquireError::NoPermits) => {
                if let Some(joined) = self.set.join_next().await {
                    self.finished.push(joined?);
                }
                Arc::clone(&self.semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|_err| SnapshotError::PoolClosed)
            }
        }
    }
}
