//! Storage engine seam.
//!
//! The facade drives an engine only through [`Driver`]. Methods return
//! `impl Future + Send` so facade futures stay `Send` for `tokio::spawn`.

use super::schema::{Record, TableSchema};
use crate::core::DriverError;
use std::future::Future;

/// Row selection for [`Driver::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criteria {
    /// Every row of the table
    All,
    /// Rows whose key column equals the id
    Id(i64),
}

/// A relational engine the store facade can drive.
///
/// Implementations own their connection resources (and any pooling); the
/// facade only borrows them.
pub trait Driver: Send + Sync {
    /// Checks that the engine is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Releases the engine's connection resources.
    fn close(&self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Ensures a table with at least the given columns exists for each schema.
    fn migrate(
        &self,
        schemas: &[TableSchema],
    ) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Inserts one record and returns it as stored, including generated keys.
    fn insert(
        &self,
        schema: &TableSchema,
        record: Record,
    ) -> impl Future<Output = Result<Record, DriverError>> + Send;

    /// Returns the rows matching `criteria`, ordered by key.
    fn find(
        &self,
        schema: &TableSchema,
        criteria: Criteria,
    ) -> impl Future<Output = Result<Vec<Record>, DriverError>> + Send;
}
