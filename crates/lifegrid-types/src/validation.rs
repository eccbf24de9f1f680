//! Upload contract for caller-supplied grids.
//!
//! A [`GridCandidate`] is the raw, untrusted shape a caller submits. The
//! contract runs every rule below and reports all violations at once -- it
//! never stops at the first failure:
//!
//! 1. Width -- in `[10, 100]`.
//! 2. Height -- in `[10, 100]`.
//! 3. Cells -- the matrix is present and non-empty.
//! 4. Cell count -- total number of values in `[10, 100]`.
//! 5. Square -- `width == height` and the matrix has as many rows as
//!    columns.
//! 6. Rectangular -- every row has the same length as the first.
//! 7. Extents -- the declared `width`/`height` match the matrix.
//! 8. Values -- every value is 0 or 1.
//!
//! Rules 6-8 only look at a non-empty matrix; an empty one is already
//! covered by rule 3.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::grid::{ALIVE, DEAD, GridState};

/// Smallest accepted width or height.
pub const MIN_DIMENSION: i64 = 10;

/// Largest accepted width or height.
pub const MAX_DIMENSION: i64 = 100;

/// Smallest accepted total cell count.
pub const MIN_CELL_COUNT: usize = 10;

/// Largest accepted total cell count.
pub const MAX_CELL_COUNT: usize = 100;

/// A grid as submitted by a caller, before any checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GridCandidate {
    /// Declared number of columns.
    pub width: i64,
    /// Declared number of rows.
    pub height: i64,
    /// Raw cell values, row-major. May be empty or jagged.
    #[serde(default)]
    pub cells: Vec<Vec<i64>>,
}

/// A single broken rule of the upload contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// Width outside `[10, 100]`.
    #[error("width must be between {MIN_DIMENSION} and {MAX_DIMENSION} (got {width})")]
    WidthOutOfRange {
        /// The submitted width.
        width: i64,
    },

    /// Height outside `[10, 100]`.
    #[error("height must be between {MIN_DIMENSION} and {MAX_DIMENSION} (got {height})")]
    HeightOutOfRange {
        /// The submitted height.
        height: i64,
    },

    /// The matrix is missing or empty.
    #[error("board cells are required")]
    CellsRequired,

    /// Total number of values outside `[10, 100]`.
    #[error("board must hold between {MIN_CELL_COUNT} and {MAX_CELL_COUNT} cells (got {count})")]
    CellCountOutOfRange {
        /// Total number of submitted values.
        count: usize,
    },

    /// The board is not square.
    #[error(
        "board must be a square (width {width}, height {height}, matrix {rows}x{columns})"
    )]
    NotSquare {
        /// The submitted width.
        width: i64,
        /// The submitted height.
        height: i64,
        /// Rows in the matrix.
        rows: usize,
        /// Columns in the first row of the matrix.
        columns: usize,
    },

    /// A row differs in length from the first row.
    #[error("row {row} has {found} cells, expected {expected}")]
    JaggedRow {
        /// Zero-based index of the first offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },

    /// The declared dimensions disagree with the matrix.
    #[error(
        "declared size {width}x{height} does not match the {columns}x{rows} cell matrix"
    )]
    DimensionMismatch {
        /// The submitted width.
        width: i64,
        /// The submitted height.
        height: i64,
        /// Rows in the matrix.
        rows: usize,
        /// Columns in the matrix.
        columns: usize,
    },

    /// A value is neither 0 nor 1.
    #[error("cell ({row}, {column}) has value {value}; cells must be 0 or 1")]
    InvalidCellValue {
        /// Zero-based row of the first offending value.
        row: usize,
        /// Zero-based column of the first offending value.
        column: usize,
        /// The offending value.
        value: i64,
    },
}

/// Every violation found in a candidate, in rule order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct ValidationReport {
    /// The violated rules. Never empty.
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Human-readable messages, one per violation.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    /// Whether `violation` is among the reported ones.
    pub fn contains(&self, violation: &Violation) -> bool {
        self.violations.contains(violation)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid validation failed: {}", self.messages().join("; "))
    }
}

/// Run the full upload contract against `candidate`.
///
/// # Errors
///
/// Returns a [`ValidationReport`] listing every violated rule.
pub fn validate_candidate(candidate: &GridCandidate) -> Result<(), ValidationReport> {
    let mut violations = Vec::new();

    let rows = candidate.cells.len();
    let columns = candidate.cells.first().map_or(0, Vec::len);
    let count: usize = candidate.cells.iter().map(Vec::len).sum();
    let is_empty = count == 0;

    if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&candidate.width) {
        violations.push(Violation::WidthOutOfRange {
            width: candidate.width,
        });
    }
    if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&candidate.height) {
        violations.push(Violation::HeightOutOfRange {
            height: candidate.height,
        });
    }
    if is_empty {
        violations.push(Violation::CellsRequired);
    }
    if !(MIN_CELL_COUNT..=MAX_CELL_COUNT).contains(&count) {
        violations.push(Violation::CellCountOutOfRange { count });
    }
    if candidate.width != candidate.height || rows != columns {
        violations.push(Violation::NotSquare {
            width: candidate.width,
            height: candidate.height,
            rows,
            columns,
        });
    }

    if !is_empty {
        let jagged = candidate
            .cells
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns);

        if let Some((row, values)) = jagged {
            violations.push(Violation::JaggedRow {
                row,
                expected: columns,
                found: values.len(),
            });
        } else if !extent_matches(candidate.width, columns)
            || !extent_matches(candidate.height, rows)
        {
            violations.push(Violation::DimensionMismatch {
                width: candidate.width,
                height: candidate.height,
                rows,
                columns,
            });
        }

        if let Some(violation) = first_invalid_value(&candidate.cells) {
            violations.push(violation);
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport { violations })
    }
}

impl GridCandidate {
    /// Run the upload contract. See [`validate_candidate`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationReport`] listing every violated rule.
    pub fn validate(&self) -> Result<(), ValidationReport> {
        validate_candidate(self)
    }

    /// Validate and convert into a [`GridState`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationReport`] listing every violated rule.
    pub fn into_grid(self) -> Result<GridState, ValidationReport> {
        self.validate()?;

        let rows = self.cells.len();
        let columns = self.cells.first().map_or(0, Vec::len);
        let cells = self
            .cells
            .into_iter()
            .map(|row| row.into_iter().map(|v| u8::from(v == i64::from(ALIVE))).collect())
            .collect();

        // The contract above already guarantees a well-formed matrix; any
        // failure here is reported rather than swallowed.
        GridState::new(columns, rows, cells).map_err(|err| ValidationReport {
            violations: vec![grid_error_violation(&err, self.width, self.height, rows, columns)],
        })
    }
}

/// Whether a declared extent equals the matrix extent.
fn extent_matches(declared: i64, actual: usize) -> bool {
    i64::try_from(actual).is_ok_and(|actual| actual == declared)
}

/// The first value that is neither 0 nor 1, scanning row-major.
fn first_invalid_value(cells: &[Vec<i64>]) -> Option<Violation> {
    cells.iter().enumerate().find_map(|(row, values)| {
        values
            .iter()
            .enumerate()
            .find(|(_, v)| **v != i64::from(DEAD) && **v != i64::from(ALIVE))
            .map(|(column, &value)| Violation::InvalidCellValue { row, column, value })
    })
}

/// Map a construction failure back onto the closest contract rule.
const fn grid_error_violation(
    err: &crate::grid::GridError,
    width: i64,
    height: i64,
    rows: usize,
    columns: usize,
) -> Violation {
    match *err {
        crate::grid::GridError::RowLengthMismatch {
            row,
            expected,
            found,
        } => Violation::JaggedRow {
            row,
            expected,
            found,
        },
        crate::grid::GridError::Empty { .. } => Violation::CellsRequired,
        _ => Violation::DimensionMismatch {
            width,
            height,
            rows,
            columns,
        },
    }
}
