//! Shared type definitions for the Lifegrid simulation.
//!
//! This crate is the single source of truth for the grid value type that
//! flows between the rule engine, the board service, and the storage
//! collaborator. Types that cross the service boundary are exported to
//! `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for stored grids
//! - [`grid`] -- [`GridState`], the cell matrix of one generation
//! - [`validation`] -- Upload contract for caller-supplied grids
//! - [`codec`] -- Flat `1,0|0,1` string form used for storage hand-off

pub mod codec;
pub mod grid;
pub mod ids;
pub mod validation;

// Re-export all public types at crate root for convenience.
pub use codec::{DecodeError, decode, encode, encode_opt};
pub use grid::{ALIVE, DEAD, GridError, GridState};
pub use ids::GridId;
pub use validation::{
    GridCandidate, MAX_CELL_COUNT, MAX_DIMENSION, MIN_CELL_COUNT, MIN_DIMENSION,
    ValidationReport, Violation, validate_candidate,
};
