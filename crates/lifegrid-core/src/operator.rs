//! Cooperative stop control for running simulations.
//!
//! A [`StopSignal`] is shared between whoever drives a batch and whoever
//! wants to cancel it (a Ctrl-C handler, a request handler, a test). The
//! runner checks the flag between generations only, so a batch never
//! observes a half-computed generation.
//!
//! # Architecture
//!
//! The flag is an [`AtomicBool`] behind an [`Arc`]; clones share the same
//! flag and reads on the generation loop are lock-free. A generation limit
//! ([`StopSignal::request_stop_at`]) sits beside it in an [`AtomicU64`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Generation limit meaning "no limit".
const NO_LIMIT: u64 = u64::MAX;

use serde::{Deserialize, Serialize};

/// Why a batch stopped producing generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEndReason {
    /// The requested number of generations was produced.
    IterationsExhausted,
    /// Two consecutive generations were identical.
    Converged,
}

/// Shared cancellation flag.
#[derive(Debug, Clone)]
pub struct StopSignal {
    /// Set once a stop has been requested.
    stop_requested: Arc<AtomicBool>,
    /// Runner generation at which to stop; [`NO_LIMIT`] when unset.
    stop_at: Arc<AtomicU64>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self {
            stop_requested: Arc::new(AtomicBool::new(false)),
            stop_at: Arc::new(AtomicU64::new(NO_LIMIT)),
        }
    }
}

impl StopSignal {
    /// A signal with no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop once the runner has reached `generation`. Batches
    /// already past it stop before their next generation.
    pub fn request_stop_at(&self, generation: u64) {
        self.stop_at.store(generation, Ordering::Release);
    }

    /// Whether a runner at `generation` should stop before computing the
    /// next one.
    pub fn should_stop(&self, generation: u64) -> bool {
        self.is_stop_requested() || generation >= self.stop_at.load(Ordering::Acquire)
    }

    /// Request a stop. Takes effect before the next generation.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Clear previous requests so the signal can be reused.
    pub fn reset(&self) {
        self.stop_requested.store(false, Ordering::Release);
        self.stop_at.store(NO_LIMIT, Ordering::Release);
    }
}
