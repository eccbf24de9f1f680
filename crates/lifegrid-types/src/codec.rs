//! Flat string codec for cell matrices.
//!
//! The storage collaborator only understands text fields, so a cell
//! matrix is handed off in a compact delimited form: values within a row
//! are joined with `,` and rows are joined with `|`.
//!
//! ```text
//! [[1, 0],
//!  [0, 1]]   <->   "1,0|0,1"
//! ```
//!
//! Decoding an empty or absent string yields an empty matrix. Every other
//! malformed input is a [`DecodeError`]; nothing is ever replaced with a
//! default value.

/// Separator between values inside one row.
const COLUMN_SEPARATOR: char = ',';

/// Separator between rows.
const ROW_SEPARATOR: char = '|';

/// Errors that can occur while decoding a persisted cell string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A token could not be parsed as an integer.
    #[error("row {row}, column {column}: token {token:?} is not an integer")]
    InvalidToken {
        /// Zero-based row of the offending token.
        row: usize,
        /// Zero-based column of the offending token.
        column: usize,
        /// The raw token text.
        token: String,
    },

    /// A token parsed as an integer other than 0 or 1.
    #[error("row {row}, column {column}: cell value {value} is not 0 or 1")]
    InvalidCell {
        /// Zero-based row of the offending value.
        row: usize,
        /// Zero-based column of the offending value.
        column: usize,
        /// The parsed value.
        value: i64,
    },

    /// A row has a different number of columns than the first row.
    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the ragged row.
        row: usize,
        /// Column count of the first row.
        expected: usize,
        /// Column count of this row.
        found: usize,
    },
}

/// Encode a cell matrix into its flat string form.
///
/// An empty matrix encodes to the empty string.
pub fn encode<R: AsRef<[u8]>>(cells: &[R]) -> String {
    let mut out = String::with_capacity(encoded_capacity(cells));
    for (row_index, row) in cells.iter().enumerate() {
        if row_index > 0 {
            out.push(ROW_SEPARATOR);
        }
        for (column_index, value) in row.as_ref().iter().enumerate() {
            if column_index > 0 {
                out.push(COLUMN_SEPARATOR);
            }
            match char::from_digit(u32::from(*value), 10) {
                Some(digit) => out.push(digit),
                None => out.push_str(&value.to_string()),
            }
        }
    }
    out
}

/// Encode an optional matrix; an absent matrix encodes to `None`.
pub fn encode_opt<R: AsRef<[u8]>>(cells: Option<&[R]>) -> Option<String> {
    cells.map(encode)
}

/// Decode a flat string back into a cell matrix.
///
/// `None` and `Some("")` both decode to an empty matrix. The first row
/// fixes the column count for every following row.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidToken`] for a non-integer token,
/// [`DecodeError::InvalidCell`] for an integer outside `{0, 1}`, and
/// [`DecodeError::RaggedRow`] when rows disagree on their length.
pub fn decode(encoded: Option<&str>) -> Result<Vec<Vec<u8>>, DecodeError> {
    let Some(encoded) = encoded.filter(|s| !s.is_empty()) else {
        return Ok(Vec::new());
    };

    let mut rows: Vec<Vec<u8>> = Vec::new();
    let mut expected_columns: Option<usize> = None;

    for (row_index, raw_row) in encoded.split(ROW_SEPARATOR).enumerate() {
        let row = decode_row(row_index, raw_row)?;

        match expected_columns {
            None => expected_columns = Some(row.len()),
            Some(expected) if expected != row.len() => {
                return Err(DecodeError::RaggedRow {
                    row: row_index,
                    expected,
                    found: row.len(),
                });
            }
            Some(_) => {}
        }

        rows.push(row);
    }

    Ok(rows)
}

/// Decode one `,`-separated row.
fn decode_row(row: usize, raw_row: &str) -> Result<Vec<u8>, DecodeError> {
    raw_row
        .split(COLUMN_SEPARATOR)
        .enumerate()
        .map(|(column, token)| decode_token(row, column, token))
        .collect()
}

/// Parse a single token, accepting surrounding whitespace.
fn decode_token(row: usize, column: usize, token: &str) -> Result<u8, DecodeError> {
    let value: i64 = token
        .trim()
        .parse()
        .map_err(|_err| DecodeError::InvalidToken {
            row,
            column,
            token: token.to_owned(),
        })?;

    match value {
        0 => Ok(0),
        1 => Ok(1),
        _ => Err(DecodeError::InvalidCell { row, column, value }),
    }
}

/// Exact output length for a 0/1 matrix: one byte per value plus one
/// separator between neighbours.
fn encoded_capacity<R: AsRef<[u8]>>(cells: &[R]) -> usize {
    let values: usize = cells.iter().map(|row| row.as_ref().len()).sum();
    values.saturating_mul(2)
}
