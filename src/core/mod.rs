/// Core Module for pgstore
///
/// This module contains the error types and the database layer: the
/// configuration normalizer, the driver seam and the chainable store facade.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DriverError, Result, StoreError};
