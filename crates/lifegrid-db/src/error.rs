//! Error types for the storage layer.
//!
//! All store failures surface as [`DbError`]. A missing row is not an
//! error: lookups return `Ok(None)`.

use lifegrid_types::{GridError, GridId};

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A row with this id is already stored.
    #[error("grid {id} already exists")]
    DuplicateId {
        /// The conflicting id.
        id: GridId,
    },

    /// A stored row no longer decodes into a valid grid.
    #[error("stored grid {id} is corrupt: {source}")]
    Corrupt {
        /// Id of the unreadable row.
        id: GridId,
        /// Why the row could not be decoded.
        source: GridError,
    },
}
