//! Board service for the Lifegrid simulation.
//!
//! Wraps one active simulation and a [`GridStore`] behind typed
//! operations: upload a board, step it, run bounded batches, and look up or
//! delete stored boards by id.
//!
//! # Modules
//!
//! - [`service`] -- [`GameService`], [`BoardState`], and [`FinalState`]
//! - [`error`] -- [`GameError`]
//!
//! [`GridStore`]: lifegrid_db::GridStore

pub mod error;
pub mod service;

pub use error::GameError;
pub use service::{BoardState, DEFAULT_BOARD_SIZE, FinalState, GameService, MAX_ITERATIONS};
