//! Grid persistence keyed by [`GridId`].
//!
//! Rows hold the codec string rather than the cell matrix, so any backend
//! that can store text can implement [`GridStore`]. [`MemoryGridStore`] is
//! the in-process backend used by the service, the engine binary, and
//! tests.
//!
//! The trait uses `impl Future` returns instead of trait objects; callers
//! are generic over the store.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lifegrid_types::{GridError, GridId, GridState};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::DbError;

/// A persisted grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRow {
    /// Storage key.
    pub id: GridId,
    /// Column count.
    pub width: usize,
    /// Row count.
    pub height: usize,
    /// Cell matrix in codec form (`"1,0|0,1"`).
    pub cells: String,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

impl GridRow {
    /// Build a row for `grid` with a fresh id.
    pub fn new(grid: &GridState) -> Self {
        Self::with_id(GridId::new(), grid)
    }

    /// Build a row for `grid` under `id`.
    pub fn with_id(id: GridId, grid: &GridState) -> Self {
        Self::from_encoded(id, grid.width(), grid.height(), grid.encode())
    }

    /// Build a row from cells already in codec form.
    pub fn from_encoded(id: GridId, width: usize, height: usize, cells: String) -> Self {
        Self {
            id,
            width,
            height,
            cells,
            created_at: Utc::now(),
        }
    }

    /// Decode the stored cells back into a grid.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] if the cells do not decode or disagree
    /// with the stored dimensions.
    pub fn to_grid(&self) -> Result<GridState, DbError> {
        let corrupt = |source| DbError::Corrupt {
            id: self.id,
            source,
        };
        let grid = GridState::from_encoded(&self.cells).map_err(corrupt)?;
        if grid.height() != self.height {
            return Err(corrupt(GridError::RowCountMismatch {
                expected: self.height,
                found: grid.height(),
            }));
        }
        if grid.width() != self.width {
            return Err(corrupt(GridError::RowLengthMismatch {
                row: 0,
                expected: self.width,
                found: grid.width(),
            }));
        }
        Ok(grid)
    }
}

/// Storage collaborator for grids.
pub trait GridStore: Send + Sync {
    /// Store one row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DuplicateId`] if the id is taken.
    fn insert(&self, row: GridRow) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Store a batch atomically: either every row is stored or none is.
    /// Returns the number of rows stored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DuplicateId`] if any id is taken or repeated.
    fn insert_many(&self, rows: Vec<GridRow>)
    -> impl Future<Output = Result<usize, DbError>> + Send;

    /// Fetch a row.
    fn get(&self, id: GridId) -> impl Future<Output = Result<Option<GridRow>, DbError>> + Send;

    /// Delete a row, returning it if it existed.
    fn remove(&self, id: GridId)
    -> impl Future<Output = Result<Option<GridRow>, DbError>> + Send;

    /// Number of stored rows.
    fn count(&self) -> impl Future<Output = Result<usize, DbError>> + Send;
}

/// [`GridStore`] backed by an in-process ordered map.
///
/// Clones share the same map. `GridId`s are UUID v7, so iteration order is
/// creation order.
#[derive(Debug, Clone, Default)]
pub struct MemoryGridStore {
    rows: Arc<RwLock<BTreeMap<GridId, GridRow>>>,
}

impl MemoryGridStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every stored row, oldest first.
    pub async fn ids(&self) -> Vec<GridId> {
        self.rows.read().await.keys().copied().collect()
    }
}

impl GridStore for MemoryGridStore {
    async fn insert(&self, row: GridRow) -> Result<(), DbError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&row.id) {
            return Err(DbError::DuplicateId { id: row.id });
        }
        debug!(id = %row.id, width = row.width, height = row.height, "Grid stored");
        rows.insert(row.id, row);
        Ok(())
    }

    async fn insert_many(&self, batch: Vec<GridRow>) -> Result<usize, DbError> {
        let mut rows = self.rows.write().await;

        let mut seen = BTreeSet::new();
        for row in &batch {
            if rows.contains_key(&row.id) || !seen.insert(row.id) {
                return Err(DbError::DuplicateId { id: row.id });
            }
        }

        let stored = batch.len();
        rows.extend(batch.into_iter().map(|row| (row.id, row)));
        debug!(stored, total = rows.len(), "Grid batch stored");
        Ok(stored)
    }

    async fn get(&self, id: GridId) -> Result<Option<GridRow>, DbError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn remove(&self, id: GridId) -> Result<Option<GridRow>, DbError> {
        let removed = self.rows.write().await.remove(&id);
        if removed.is_some() {
            debug!(id = %id, "Grid removed");
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<usize, DbError> {
        Ok(self.rows.read().await.len())
    }
}
