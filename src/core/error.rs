/// pgstore Error Module
///
/// This module defines the error types for the store facade and its drivers.
/// Lifecycle operations return these errors directly, while chainable CRUD
/// operations park them in the facade's last-operation slot.
use thiserror::Error;

/// Errors raised by a storage engine behind the [`Driver`](crate::core::db::Driver) seam.
///
/// The facade wraps these in a [`StoreError`] variant that records which kind of
/// operation failed (connection, query or migration).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Errors reported by the PostgreSQL driver
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// The referenced table has not been created
    #[error("relation \"{0}\" does not exist")]
    UnknownTable(String),

    /// A row with the same primary key already exists
    #[error("duplicate key value violates unique constraint \"{table}_pkey\" ({column} = {value})")]
    DuplicateKey {
        table: String,
        column: String,
        value: String,
    },

    /// No further key can be assigned for the table
    #[error("key sequence for table \"{0}\" reached its maximum value")]
    KeyExhausted(String),

    /// A record value does not match the declared column type
    #[error("column \"{column}\" expects {expected}, got {found}")]
    Encode {
        column: String,
        expected: &'static str,
        found: String,
    },

    /// The record handed to the driver is not a JSON object
    #[error("record for table \"{0}\" must serialize to an object")]
    InvalidRecord(String),

    /// The driver was closed and refuses further work
    #[error("connection is closed")]
    Closed,

    /// The calling context was canceled
    #[error("context canceled")]
    Cancelled,

    /// The calling context's deadline elapsed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Error type for every store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Invalid caller input (port out of range, non-positive id)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration loading and parsing errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Open, ping and close failures
    #[error("Connection error: {0}")]
    Connection(#[source] DriverError),

    /// Failures surfaced by create and find operations
    #[error("Query error: {0}")]
    Query(#[source] DriverError),

    /// Schema synchronisation failures
    #[error("Migration error: {0}")]
    Migration(#[source] DriverError),

    /// JSON encode/decode failures between records and models
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Serialization was requested before any successful read
    #[error("Serialization error: no read result has been captured")]
    NoReadResult,

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns true if this error came from a canceled or expired context.
    ///
    /// Only CRUD calls take a [`Context`](crate::core::db::Context), so only
    /// `Query` errors can carry one of these causes.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            StoreError::Query(DriverError::Cancelled | DriverError::DeadlineExceeded)
        )
    }
}

/// Type alias for Result to use StoreError as the error type.
pub type Result<T> = std::result::Result<T, StoreError>;
