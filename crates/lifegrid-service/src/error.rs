//! Error types for the board service.

use lifegrid_core::runner::RunnerError;
use lifegrid_db::DbError;
use lifegrid_types::{DecodeError, ValidationReport};

use crate::service::MAX_ITERATIONS;

/// Errors returned by [`GameService`](crate::GameService) operations.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// An uploaded board broke one or more validation rules.
    #[error("{source}")]
    Validation {
        /// Every violated rule.
        #[from]
        source: ValidationReport,
    },

    /// An uploaded board string could not be decoded.
    #[error("invalid board string: {source}")]
    Decode {
        /// The underlying codec error.
        #[from]
        source: DecodeError,
    },

    /// The requested iteration count is outside `1..=MAX_ITERATIONS`.
    #[error("iterations must be between 1 and {MAX_ITERATIONS} (got {requested})")]
    InvalidIterationCount {
        /// The rejected count.
        requested: i64,
    },

    /// Lookups by the all-zero id are rejected outright.
    #[error("invalid board id: the nil id is never assigned")]
    NilId,

    /// The simulation failed or was stopped.
    #[error("simulation error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: RunnerError,
    },

    /// The storage collaborator failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying storage error.
        #[from]
        source: DbError,
    },
}
