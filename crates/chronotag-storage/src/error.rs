use thiserror::Error;

/// Storage-specific error types.
///
/// Pipeline callers (the session store) log these and continue; only the
/// caller-invoked operations (import, merge) propagate them.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited read/write failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Roster source missing or malformed; aborts only the import call
    #[error("Import error: {0}")]
    Import(String),

    /// A persisted row does not match its region's schema
    #[error("Invalid record in {region}: {message}")]
    InvalidRecord { region: String, message: String },

    /// Date/time parsing or formatting error
    #[error("DateTime error: {0}")]
    DateTime(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
