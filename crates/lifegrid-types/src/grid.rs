//! The cell matrix of one generation.
//!
//! [`GridState`] is a plain value type: `height` rows of `width` cells,
//! each exactly [`DEAD`] or [`ALIVE`]. The matrix is never jagged and never
//! empty -- every constructor checks the shape, and the only mutation
//! available outside this crate ([`GridState::fill_with`]) rewrites every
//! cell from a predicate, so the invariant cannot be broken after
//! construction.
//!
//! The engine accepts any non-empty rectangle. The narrower upload contract
//! (square, 10..=100) lives in [`crate::validation`].

use rand::Rng;
use serde::Serialize;
use ts_rs::TS;

use crate::codec::{self, DecodeError};

/// Value of a dead cell.
pub const DEAD: u8 = 0;

/// Value of a live cell.
pub const ALIVE: u8 = 1;

/// Errors raised when a cell matrix does not form a valid grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// Width or height is zero.
    #[error("grid must have at least one row and one column (got {width}x{height})")]
    Empty {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },

    /// The number of rows does not match the declared height.
    #[error("expected {expected} rows, found {found}")]
    RowCountMismatch {
        /// Declared height.
        expected: usize,
        /// Rows actually supplied.
        found: usize,
    },

    /// A row does not match the declared width.
    #[error("row {row} has {found} cells, expected {expected}")]
    RowLengthMismatch {
        /// Zero-based row index.
        row: usize,
        /// Declared width.
        expected: usize,
        /// Cells actually supplied in this row.
        found: usize,
    },

    /// A cell holds something other than 0 or 1.
    #[error("cell ({row}, {column}) has value {value}; expected 0 or 1")]
    InvalidCell {
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        column: usize,
        /// The offending value.
        value: u8,
    },

    /// The persisted string could not be decoded.
    #[error("decode error: {source}")]
    Decode {
        /// The underlying codec error.
        #[from]
        source: DecodeError,
    },
}

/// One generation of the automaton.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GridState {
    /// Number of columns.
    width: usize,
    /// Number of rows.
    height: usize,
    /// `height` rows of `width` values, row-major.
    cells: Vec<Vec<u8>>,
}

impl GridState {
    /// Build a grid from a caller-supplied matrix.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if either dimension is zero, the matrix shape
    /// disagrees with `width`/`height`, or any value is not 0 or 1.
    pub fn new(width: usize, height: usize, cells: Vec<Vec<u8>>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::Empty { width, height });
        }
        if cells.len() != height {
            return Err(GridError::RowCountMismatch {
                expected: height,
                found: cells.len(),
            });
        }
        for (row, values) in cells.iter().enumerate() {
            if values.len() != width {
                return Err(GridError::RowLengthMismatch {
                    row,
                    expected: width,
                    found: values.len(),
                });
            }
            if let Some((column, &value)) = values
                .iter()
                .enumerate()
                .find(|(_, v)| **v != DEAD && **v != ALIVE)
            {
                return Err(GridError::InvalidCell { row, column, value });
            }
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// A grid with every cell dead.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Empty`] if either dimension is zero.
    pub fn dead(width: usize, height: usize) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::Empty { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: vec![vec![DEAD; width]; height],
        })
    }

    /// A grid where each cell is independently alive with probability 1/2.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Empty`] if either dimension is zero.
    pub fn random<R: Rng>(width: usize, height: usize, rng: &mut R) -> Result<Self, GridError> {
        let mut grid = Self::dead(width, height)?;
        grid.fill_with(|_, _| rng.random_bool(0.5));
        Ok(grid)
    }

    /// Decode a grid from its persisted string form.
    ///
    /// Dimensions are taken from the decoded matrix.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Decode`] for malformed input and
    /// [`GridError::Empty`] when the string holds no cells.
    pub fn from_encoded(encoded: &str) -> Result<Self, GridError> {
        let cells = codec::decode(Some(encoded))?;
        let height = cells.len();
        let width = cells.first().map_or(0, Vec::len);
        Self::new(width, height, cells)
    }

    /// Encode this grid into its persisted string form.
    pub fn encode(&self) -> String {
        codec::encode(&self.cells)
    }

    /// Number of columns.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub const fn height(&self) -> usize {
        self.height
    }

    /// The cell matrix, row-major.
    pub fn cells(&self) -> &[Vec<u8>] {
        &self.cells
    }

    /// Value at `(row, column)`, or `None` outside the grid.
    pub fn get(&self, row: usize, column: usize) -> Option<u8> {
        self.cells.get(row).and_then(|r| r.get(column)).copied()
    }

    /// Whether the cell at `(row, column)` is alive. Cells outside the grid
    /// count as dead.
    pub fn is_alive(&self, row: usize, column: usize) -> bool {
        self.get(row, column) == Some(ALIVE)
    }

    /// Total number of cells.
    pub const fn cell_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Number of live cells.
    pub fn alive_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .map(|value| usize::from(*value == ALIVE))
            .sum()
    }

    /// Whether `other` has the same width and height.
    pub const fn same_shape(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Overwrite every cell with `alive(row, column)`.
    ///
    /// This is the only in-place mutation the grid offers; it cannot change
    /// the shape or produce a value other than 0 or 1.
    pub fn fill_with<F>(&mut self, mut alive: F)
    where
        F: FnMut(usize, usize) -> bool,
    {
        for (row, values) in self.cells.iter_mut().enumerate() {
            for (column, value) in values.iter_mut().enumerate() {
                *value = if alive(row, column) { ALIVE } else { DEAD };
            }
        }
    }
}
