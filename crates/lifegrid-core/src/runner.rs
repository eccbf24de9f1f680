//! Generation loop with double-buffered state.
//!
//! [`SimulationRunner`] owns three equally-shaped buffers:
//!
//! - **current**: the latest generation
//! - **previous**: the generation before it, used for stability checks
//! - **next**: scratch space the rule engine writes into
//!
//! Advancing rotates the buffers instead of reallocating them, so a run of
//! any length touches exactly three grids. Batch operations copy the
//! current buffer once per generation; those copies never alias runner
//! state.
//!
//! The synchronous batches ([`SimulationRunner::run_batch`],
//! [`SimulationRunner::run_until_stable`]) return plain grids. The async
//! variants hand each copy to a [`SnapshotPool`] and honor a
//! [`StopSignal`] between generations.

use std::mem;
use std::num::NonZeroU32;

use lifegrid_types::{GridError, GridState};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::operator::{RunEndReason, StopSignal};
use crate::rule::{RuleEngine, RuleError, RulePolicy};
use crate::snapshot::{Snapshot, SnapshotError, SnapshotPool};

/// Errors that can occur while advancing a simulation.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The rule engine rejected a step.
    #[error("rule error: {source}")]
    Rule {
        /// The underlying rule error.
        #[from]
        source: RuleError,
    },

    /// The initial grid could not be built.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },

    /// The snapshot pool failed.
    #[error("snapshot error: {source}")]
    Snapshot {
        /// The underlying snapshot error.
        #[from]
        source: SnapshotError,
    },

    /// The generation counter would overflow.
    #[error("generation counter overflow")]
    GenerationOverflow,

    /// A stop was requested before the batch finished.
    #[error("simulation stopped after {completed} generations")]
    Stopped {
        /// Generations produced by this batch before the stop.
        completed: u32,
    },
}

/// Snapshots produced by one batch and why the batch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome<S = GridState> {
    /// One entry per generation produced, oldest first.
    pub snapshots: Vec<S>,
    /// Why the batch stopped.
    pub end_reason: RunEndReason,
}

impl<S> BatchOutcome<S> {
    /// Whether the batch ended on two identical consecutive generations.
    pub fn converged(&self) -> bool {
        self.end_reason == RunEndReason::Converged
    }

    /// The stable generation, if the batch converged.
    pub fn final_state(&self) -> Option<&S> {
        if self.converged() {
            self.snapshots.last()
        } else {
            None
        }
    }
}

/// Drives a grid forward one generation at a time.
#[derive(Debug, Clone)]
pub struct SimulationRunner {
    engine: RuleEngine,
    current: GridState,
    previous: GridState,
    next: GridState,
    /// Generations advanced since construction.
    generation: u64,
}

impl SimulationRunner {
    /// Start from a supplied grid.
    ///
    /// The previous buffer starts as a copy of `grid`, so a fresh runner
    /// reports itself stable until it has advanced once.
    pub fn new(grid: GridState, policy: RulePolicy) -> Self {
        let previous = grid.clone();
        let next = grid.clone();
        Self {
            engine: RuleEngine::new(policy),
            current: grid,
            previous,
            next,
            generation: 0,
        }
    }

    /// Start from a random `width` x `height` grid.
    ///
    /// The previous buffer starts all dead.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Grid`] if either dimension is zero.
    pub fn random<R: Rng>(
        width: usize,
        height: usize,
        policy: RulePolicy,
        rng: &mut R,
    ) -> Result<Self, RunnerError> {
        let current = GridState::random(width, height, rng)?;
        let previous = GridState::dead(width, height)?;
        let next = GridState::dead(width, height)?;
        Ok(Self {
            engine: RuleEngine::new(policy),
            current,
            previous,
            next,
            generation: 0,
        })
    }

    /// The latest generation.
    pub const fn current(&self) -> &GridState {
        &self.current
    }

    /// The generation before [`current`](Self::current).
    pub const fn previous(&self) -> &GridState {
        &self.previous
    }

    /// Generations advanced since construction.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Row count, fixed at construction.
    pub const fn rows(&self) -> usize {
        self.current.height()
    }

    /// Column count, fixed at construction.
    pub const fn cols(&self) -> usize {
        self.current.width()
    }

    /// The policy this runner applies.
    pub const fn policy(&self) -> RulePolicy {
        self.engine.policy()
    }

    /// Whether the latest two generations are identical.
    pub fn is_stable(&self) -> bool {
        self.current == self.previous
    }

    /// Compute one generation and rotate the buffers.
    ///
    /// Afterwards `previous` holds the old current generation and `current`
    /// holds the new one. On error nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::GenerationOverflow`] when the counter is
    /// exhausted, or [`RunnerError::Rule`] if the buffers disagree in shape.
    pub fn advance_one(&mut self) -> Result<(), RunnerError> {
        let generation = self
            .generation
            .checked_add(1)
            .ok_or(RunnerError::GenerationOverflow)?;

        self.engine.step(&self.current, &mut self.next)?;

        // previous <- current, current <- next, next <- old previous
        mem::swap(&mut self.previous, &mut self.current);
        mem::swap(&mut self.current, &mut self.next);
        self.generation = generation;

        debug!(
            generation,
            alive = self.current.alive_count(),
            "Generation advanced"
        );
        Ok(())
    }

    /// Advance `iterations` times, returning a copy of every generation.
    ///
    /// # Errors
    ///
    /// Propagates any [`advance_one`](Self::advance_one) failure.
    pub fn run_batch(&mut self, iterations: NonZeroU32) -> Result<Vec<GridState>, RunnerError> {
        Ok(self.run(iterations, false)?.snapshots)
    }

    /// Advance up to `max_iterations` times, stopping right after the first
    /// generation identical to its predecessor. That generation is the last
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Propagates any [`advance_one`](Self::advance_one) failure.
    pub fn run_until_stable(
        &mut self,
        max_iterations: NonZeroU32,
    ) -> Result<BatchOutcome, RunnerError> {
        self.run(max_iterations, true)
    }

    fn run(
        &mut self,
        iterations: NonZeroU32,
        until_stable: bool,
    ) -> Result<BatchOutcome, RunnerError> {
        let mut snapshots = Vec::with_capacity(capacity_hint(iterations));
        let mut end_reason = RunEndReason::IterationsExhausted;

        for _ in 0..iterations.get() {
            self.advance_one()?;
            snapshots.push(self.current.clone());
            if until_stable && self.is_stable() {
                end_reason = RunEndReason::Converged;
                break;
            }
        }

        self.log_batch(snapshots.len(), end_reason);
        Ok(BatchOutcome {
            snapshots,
            end_reason,
        })
    }

    // -----------------------------------------------------------------------
    // Pooled batches
    // -----------------------------------------------------------------------

    /// Async [`run_batch`](Self::run_batch): each copy is encoded on
    /// `pool`, and `stop` is checked before every generation.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Stopped`] if a stop was requested; the pool is
    /// drained first and the runner keeps the generations already produced.
    pub async fn simulate(
        &mut self,
        iterations: NonZeroU32,
        stop: &StopSignal,
        pool: &SnapshotPool,
    ) -> Result<Vec<Snapshot>, RunnerError> {
        Ok(self.drive(iterations, false, stop, pool).await?.snapshots)
    }

    /// Async [`run_until_stable`](Self::run_until_stable) on `pool`.
    ///
    /// # Errors
    ///
    /// As for [`simulate`](Self::simulate).
    pub async fn simulate_until_stable(
        &mut self,
        max_iterations: NonZeroU32,
        stop: &StopSignal,
        pool: &SnapshotPool,
    ) -> Result<BatchOutcome<Snapshot>, RunnerError> {
        self.drive(max_iterations, true, stop, pool).await
    }

    async fn drive(
        &mut self,
        iterations: NonZeroU32,
        until_stable: bool,
        stop: &StopSignal,
        pool: &SnapshotPool,
    ) -> Result<BatchOutcome<Snapshot>, RunnerError> {
        let mut batch = pool.batch();
        let mut end_reason = RunEndReason::IterationsExhausted;
        let mut completed: u32 = 0;

        for _ in 0..iterations.get() {
            if stop.should_stop(self.generation) {
                batch.drain().await?;
                warn!(
                    completed,
                    generation = self.generation,
                    "Stop requested between generations"
                );
                return Err(RunnerError::Stopped { completed });
            }

            self.advance_one()?;
            completed = completed.saturating_add(1);
            batch.submit(self.generation, self.current.clone()).await?;

            if until_stable && self.is_stable() {
                end_reason = RunEndReason::Converged;
                break;
            }
        }

        let snapshots = batch.drain().await?;
        self.log_batch(snapshots.len(), end_reason);
        Ok(BatchOutcome {
            snapshots,
            end_reason,
        })
    }

    fn log_batch(&self, produced: usize, end_reason: RunEndReason) {
        info!(
            produced,
            generation = self.generation,
            end_reason = ?end_reason,
            "Batch complete"
        );
    }
}

/// Pre-allocation for a batch.
fn capacity_hint(iterations: NonZeroU32) -> usize {
    usize::try_from(iterations.get()).unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn n(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).unwrap()
    }

    /// Horizontal blinker in row 1, columns 1..=3 of a 4x4 grid.
    fn blinker() -> GridState {
        GridState::new(
            4,
            4,
            vec![
                vec![0, 0, 0, 0],
                vec![0, 1, 1, 1],
                vec![0, 0, 0, 0],
                vec![0, 0, 0, 0],
            ],
        )
        .unwrap()
    }

    fn block() -> GridState {
        GridState::new(
            4,
            4,
            vec![
                vec![0, 0, 0, 0],
                vec![0, 1, 1, 0],
                vec![0, 1, 1, 0],
                vec![0, 0, 0, 0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn fresh_runner_from_supplied_grid_is_stable() {
        let runner = SimulationRunner::new(blinker(), RulePolicy::Conway);
        assert!(runner.is_stable());
        assert_eq!(runner.generation(), 0);
    }

    #[test]
    fn fresh_random_runner_has_dead_previous() {
        let mut rng = SmallRng::seed_from_u64(3);
        let runner = SimulationRunner::random(12, 12, RulePolicy::Conway, &mut rng).unwrap();
        assert_eq!(runner.previous().alive_count(), 0);
        assert_eq!((runner.rows(), runner.cols()), (12, 12));
    }

    #[test]
    fn random_rejects_zero_dimension() {
        let mut rng = SmallRng::seed_from_u64(3);
        let err = SimulationRunner::random(0, 5, RulePolicy::Conway, &mut rng).unwrap_err();
        assert!(matches!(err, RunnerError::Grid { .. }));
    }

    #[test]
    fn blinker_oscillates_with_period_two() {
        let mut runner = SimulationRunner::new(blinker(), RulePolicy::Conway);

        runner.advance_one().unwrap();
        let vertical = runner.current().clone();
        assert!(vertical.is_alive(0, 2));
        assert!(vertical.is_alive(1, 2));
        assert!(vertical.is_alive(2, 2));
        assert_eq!(vertical.alive_count(), 3);
        assert!(!runner.is_stable());

        runner.advance_one().unwrap();
        assert_eq!(runner.current(), &blinker());
        assert_eq!(runner.previous(), &vertical);
        assert!(!runner.is_stable());
        assert_eq!(runner.generation(), 2);
    }

    #[test]
    fn block_is_stable_after_one_step() {
        let mut runner = SimulationRunner::new(block(), RulePolicy::Conway);
        runner.advance_one().unwrap();
        assert!(runner.is_stable());
        assert_eq!(runner.current(), &block());
    }

    #[test]
    fn dead_grid_stays_dead_and_stable() {
        let mut runner = SimulationRunner::new(GridState::dead(5, 5).unwrap(), RulePolicy::Conway);
        runner.advance_one().unwrap();
        assert!(runner.is_stable());
        assert_eq!(runner.current().alive_count(), 0);
    }

    #[test]
    fn run_batch_returns_one_copy_per_iteration() {
        let mut runner = SimulationRunner::new(blinker(), RulePolicy::Conway);
        let snapshots = runner.run_batch(n(5)).unwrap();
        assert_eq!(snapshots.len(), 5);
        assert_eq!(runner.generation(), 5);
        // Period two: odd generations vertical, even generations horizontal.
        assert_eq!(snapshots.get(1), Some(&blinker()));
        assert_eq!(snapshots.first(), snapshots.get(2));
        assert_eq!(snapshots.last(), Some(runner.current()));
    }

    #[test]
    fn batch_copies_do_not_alias_runner_state() {
        let mut runner = SimulationRunner::new(blinker(), RulePolicy::Conway);
        let first = runner.run_batch(n(1)).unwrap();
        runner.advance_one().unwrap();
        assert_ne!(first.first(), Some(runner.current()));
    }

    #[test]
    fn run_until_stable_keeps_the_triggering_generation() {
        let mut runner = SimulationRunner::new(block(), RulePolicy::Conway);
        let outcome = runner.run_until_stable(n(10)).unwrap();
        assert!(outcome.converged());
        assert_eq!(outcome.snapshots.len(), 1);
        assert_eq!(outcome.final_state(), Some(&block()));
    }

    #[test]
    fn run_until_stable_exhausts_on_oscillator() {
        let mut runner = SimulationRunner::new(blinker(), RulePolicy::Conway);
        let outcome = runner.run_until_stable(n(7)).unwrap();
        assert!(!outcome.converged());
        assert_eq!(outcome.end_reason, RunEndReason::IterationsExhausted);
        assert_eq!(outcome.snapshots.len(), 7);
        assert_eq!(outcome.final_state(), None);
    }

    #[test]
    fn same_seed_same_history() {
        let run = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut runner =
                SimulationRunner::random(16, 16, RulePolicy::Conway, &mut rng).unwrap();
            runner.run_batch(n(20)).unwrap()
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn generation_overflow_leaves_state_unchanged() {
        let mut runner = SimulationRunner::new(blinker(), RulePolicy::Conway);
        runner.generation = u64::MAX;
        let err = runner.advance_one().unwrap_err();
        assert!(matches!(err, RunnerError::GenerationOverflow));
        assert_eq!(runner.current(), &blinker());
    }

    #[tokio::test]
    async fn pooled_batch_matches_sequential_batch() {
        let mut rng = SmallRng::seed_from_u64(99);
        let runner = SimulationRunner::random(20, 20, RulePolicy::Conway, &mut rng).unwrap();

        let mut sequential = runner.clone();
        let expected = sequential.run_batch(n(30)).unwrap();

        let mut pooled = runner;
        let snapshots = pooled
            .simulate(n(30), &StopSignal::new(), &SnapshotPool::new(3))
            .await
            .unwrap();

        let grids: Vec<GridState> = snapshots.iter().map(|s| s.grid.clone()).collect();
        assert_eq!(grids, expected);
        let generations: Vec<u64> = snapshots.iter().map(|s| s.generation).collect();
        assert_eq!(generations, (1..=30).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn pooled_until_stable_converges_on_block() {
        let mut runner = SimulationRunner::new(block(), RulePolicy::Conway);
        let outcome = runner
            .simulate_until_stable(n(100), &StopSignal::new(), &SnapshotPool::default())
            .await
            .unwrap();
        assert!(outcome.converged());
        assert_eq!(outcome.snapshots.len(), 1);
        assert_eq!(
            outcome.final_state().map(|s| s.encoded.as_str()),
            Some(block().encode().as_str())
        );
    }

    #[tokio::test]
    async fn stop_before_first_generation() {
        let stop = StopSignal::new();
        stop.request_stop();
        let mut runner = SimulationRunner::new(blinker(), RulePolicy::Conway);
        let err = runner
            .simulate(n(10), &stop, &SnapshotPool::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Stopped { completed: 0 }));
        assert_eq!(runner.generation(), 0);
    }
}
