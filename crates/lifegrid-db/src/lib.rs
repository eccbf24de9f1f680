//! Storage collaborator for the Lifegrid simulation.
//!
//! Boards are persisted as [`GridRow`]s: dimensions plus the codec string
//! of the cell matrix, keyed by a time-ordered [`GridId`]. The stored-board
//! count lives here and is always read from the store on demand.
//!
//! # Modules
//!
//! - [`store`] -- [`GridStore`] trait, [`GridRow`], and the in-memory
//!   [`MemoryGridStore`]
//! - [`error`] -- Shared error types
//!
//! [`GridId`]: lifegrid_types::GridId

pub mod error;
pub mod store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use store::{GridRow, GridStore, MemoryGridStore};
