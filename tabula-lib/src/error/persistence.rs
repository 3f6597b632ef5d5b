//! Persistence error types

/// Errors raised by a [`TablePersistence`](crate::persistence::TablePersistence) store.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// File access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding of the stored rows failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary encoding or decoding of the stored rows failed.
    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    /// A row index does not address a stored row.
    #[error("Row index {index} out of range (store holds {len} rows)")]
    RowOutOfRange {
        /// Requested row index.
        index: usize,
        /// Number of rows in the store.
        len: usize,
    },
}

impl PersistenceError {
    /// Creates a new row-out-of-range error.
    pub fn row_out_of_range(index: usize, len: usize) -> Self {
        Self::RowOutOfRange { index, len }
    }
}
