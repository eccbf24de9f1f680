//! The board service.
//!
//! [`GameService`] owns one active [`SimulationRunner`] and a storage
//! collaborator. Every generation it produces is persisted before it is
//! returned, and every stored board can be fetched or deleted by id.
//!
//! | Operation | Effect |
//! |---|---|
//! | [`upload`](GameService::upload) | validate, store, replace the active runner |
//! | [`next_state`](GameService::next_state) | advance once, store |
//! | [`simulate`](GameService::simulate) | advance `n` times, store all |
//! | [`final_state`](GameService::final_state) | advance until stable or `n`, store all |
//! | [`get_by_id`](GameService::get_by_id) / [`remove_by_id`](GameService::remove_by_id) | lookup |
//! | [`count`](GameService::count) | stored boards, read from the store |
//!
//! Calls are serialized on the runner lock, so generation order is never
//! interleaved between callers.

use std::num::NonZeroU32;

use lifegrid_core::operator::StopSignal;
use lifegrid_core::rule::RulePolicy;
use lifegrid_core::runner::{RunnerError, SimulationRunner};
use lifegrid_core::snapshot::{Snapshot, SnapshotPool};
use lifegrid_db::{GridRow, GridStore};
use lifegrid_types::{GridCandidate, GridId, GridState, codec};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::GameError;

/// Largest iteration count accepted by [`GameService::simulate`] and
/// [`GameService::final_state`].
pub const MAX_ITERATIONS: u32 = 100;

/// Side length of the random board a service starts with.
pub const DEFAULT_BOARD_SIZE: usize = 10;

/// A stored board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardState {
    /// Storage id of this board.
    pub id: GridId,
    /// The board itself.
    pub grid: GridState,
}

/// Result of [`GameService::final_state`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FinalState {
    /// Two consecutive generations matched; this is the later one.
    Converged(BoardState),
    /// The cap was reached first.
    NoConvergence {
        /// Generations computed (and stored) before giving up.
        generations: u32,
    },
}

/// Upload, step, and look up boards against a [`GridStore`].
#[derive(Debug)]
pub struct GameService<S> {
    store: S,
    runner: Mutex<SimulationRunner>,
    pool: SnapshotPool,
}

impl<S: GridStore> GameService<S> {
    /// A service whose active board is a random 10x10 Conway grid.
    ///
    /// # Errors
    ///
    /// Never fails for the default size; the signature matches
    /// [`seeded`](Self::seeded).
    pub fn new(store: S) -> Result<Self, GameError> {
        Self::random(store, &mut rand::rng())
    }

    /// Like [`new`](Self::new), but reproducible.
    ///
    /// # Errors
    ///
    /// As for [`new`](Self::new).
    pub fn seeded(store: S, seed: u64) -> Result<Self, GameError> {
        Self::random(store, &mut SmallRng::seed_from_u64(seed))
    }

    fn random<R: Rng>(store: S, rng: &mut R) -> Result<Self, GameError> {
        let runner = SimulationRunner::random(
            DEFAULT_BOARD_SIZE,
            DEFAULT_BOARD_SIZE,
            RulePolicy::Conway,
            rng,
        )?;
        Ok(Self::with_runner(store, runner))
    }

    /// A service driving an existing runner.
    pub fn with_runner(store: S, runner: SimulationRunner) -> Self {
        Self {
            store,
            runner: Mutex::new(runner),
            pool: SnapshotPool::default(),
        }
    }

    /// Use `pool` for batch snapshots.
    #[must_use]
    pub fn with_snapshot_pool(mut self, pool: SnapshotPool) -> Self {
        self.pool = pool;
        self
    }

    /// The storage collaborator.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// A copy of the active runner's latest generation.
    pub async fn current(&self) -> GridState {
        self.runner.lock().await.current().clone()
    }

    // -----------------------------------------------------------------------
    // Upload
    // -----------------------------------------------------------------------

    /// Validate `candidate`, store it, and make it the active board.
    ///
    /// The new runner keeps the active runner's rule policy.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] listing every violated rule, or
    /// [`GameError::Store`] if the insert fails. The active board is
    /// unchanged on error.
    pub async fn upload(&self, candidate: GridCandidate) -> Result<GridId, GameError> {
        let grid = candidate.into_grid()?;
        let row = GridRow::new(&grid);
        let id = row.id;

        let mut runner = self.runner.lock().await;
        self.store.insert(row).await?;
        *runner = SimulationRunner::new(grid, runner.policy());

        info!(id = %id, rows = runner.rows(), cols = runner.cols(), "Board uploaded");
        Ok(id)
    }

    /// [`upload`](Self::upload) from the codec string form. Dimensions come
    /// from the decoded matrix.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Decode`] for a malformed string, otherwise as
    /// for [`upload`](Self::upload).
    pub async fn upload_encoded(&self, encoded: &str) -> Result<GridId, GameError> {
        let cells = codec::decode(Some(encoded))?;
        let height = i64::try_from(cells.len()).unwrap_or(i64::MAX);
        let width = cells
            .first()
            .map_or(0, |row| i64::try_from(row.len()).unwrap_or(i64::MAX));
        let candidate = GridCandidate {
            width,
            height,
            cells: cells
                .into_iter()
                .map(|row| row.into_iter().map(i64::from).collect())
                .collect(),
        };
        self.upload(candidate).await
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Advance the active board once and store the result.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Runner`] or [`GameError::Store`].
    pub async fn next_state(&self) -> Result<BoardState, GameError> {
        let mut runner = self.runner.lock().await;
        runner.advance_one()?;
        let grid = runner.current().clone();

        let row = GridRow::new(&grid);
        let id = row.id;
        self.store.insert(row).await?;

        Ok(BoardState { id, grid })
    }

    /// Advance `iterations` times, store every generation, and return the
    /// last one.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidIterationCount`] before any generation
    /// is computed if `iterations` is outside `1..=100`. A stop surfaces as
    /// [`GameError::Runner`]; generations computed before it are not
    /// stored.
    pub async fn simulate(
        &self,
        iterations: i64,
        stop: &StopSignal,
    ) -> Result<BoardState, GameError> {
        let iterations = checked_iterations(iterations)?;
        let mut runner = self.runner.lock().await;
        let snapshots = runner.simulate(iterations, stop, &self.pool).await?;

        let mut stored = self.persist(snapshots).await?;
        // A successful batch of at least one iteration is never empty.
        stored
            .pop()
            .ok_or(GameError::Runner {
                source: RunnerError::Stopped { completed: 0 },
            })
    }

    /// Advance until two consecutive generations match or `iterations` is
    /// reached, storing every generation either way.
    ///
    /// # Errors
    ///
    /// As for [`simulate`](Self::simulate). Reaching the cap is not an
    /// error: it is [`FinalState::NoConvergence`].
    pub async fn final_state(
        &self,
        iterations: i64,
        stop: &StopSignal,
    ) -> Result<FinalState, GameError> {
        let iterations = checked_iterations(iterations)?;
        let mut runner = self.runner.lock().await;
        let outcome = runner
            .simulate_until_stable(iterations, stop, &self.pool)
            .await?;

        let converged = outcome.converged();
        let mut stored = self.persist(outcome.snapshots).await?;
        let generations = u32::try_from(stored.len()).unwrap_or(u32::MAX);

        match stored.pop() {
            Some(last) if converged => {
                info!(id = %last.id, generations, "Board converged");
                Ok(FinalState::Converged(last))
            }
            _ => {
                warn!(generations, "No stable state within the iteration cap");
                Ok(FinalState::NoConvergence { generations })
            }
        }
    }

    async fn persist(&self, snapshots: Vec<Snapshot>) -> Result<Vec<BoardState>, GameError> {
        let (rows, boards): (Vec<GridRow>, Vec<BoardState>) = snapshots
            .into_iter()
            .map(|snapshot| {
                let id = GridId::new();
                let row = GridRow::from_encoded(
                    id,
                    snapshot.grid.width(),
                    snapshot.grid.height(),
                    snapshot.encoded,
                );
                let board = BoardState {
                    id,
                    grid: snapshot.grid,
                };
                (row, board)
            })
            .unzip();
        self.store.insert_many(rows).await?;
        Ok(boards)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Fetch a stored board. `Ok(None)` if no board has this id.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NilId`] for the all-zero id, or
    /// [`GameError::Store`] if the stored row is unreadable.
    pub async fn get_by_id(&self, id: GridId) -> Result<Option<BoardState>, GameError> {
        if id.is_nil() {
            return Err(GameError::NilId);
        }
        self.store
            .get(id)
            .await?
            .map(|row| board_from_row(&row))
            .transpose()
    }

    /// Delete a stored board, returning it. `Ok(None)` if no board has this
    /// id.
    ///
    /// # Errors
    ///
    /// As for [`get_by_id`](Self::get_by_id).
    pub async fn remove_by_id(&self, id: GridId) -> Result<Option<BoardState>, GameError> {
        if id.is_nil() {
            return Err(GameError::NilId);
        }
        let removed = self.store.remove(id).await?;
        if removed.is_some() {
            info!(id = %id, "Board removed");
        }
        removed.map(|row| board_from_row(&row)).transpose()
    }

    /// Number of stored boards, asked of the store on every call.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Store`] if the store fails.
    pub async fn count(&self) -> Result<usize, GameError> {
        Ok(self.store.count().await?)
    }
}

/// Map a caller-supplied count onto `1..=MAX_ITERATIONS`.
fn checked_iterations(requested: i64) -> Result<NonZeroU32, GameError> {
    u32::try_from(requested)
        .ok()
        .filter(|n| *n <= MAX_ITERATIONS)
        .and_then(NonZeroU32::new)
        .ok_or(GameError::InvalidIterationCount { requested })
}

fn board_from_row(row: &GridRow) -> Result<BoardState, GameError> {
    Ok(BoardState {
        id: row.id,
        grid: row.to_grid()?,
    })
}
