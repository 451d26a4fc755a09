/// Store Facade
///
/// [`Store`] wraps one driver (and through it, one connection pool) and keeps
/// a single last-operation slot: the most recent CRUD call's error, its
/// affected-row count, and a snapshot of the last non-empty `read_all`.
///
/// CRUD calls never return errors. They record them in the slot and hand the
/// store back so calls can be chained; check [`Store::err`] afterwards.
/// Lifecycle calls (`ping`, `close`, `auto_migrate`) return errors directly.
use super::context::Context;
use super::descriptor::{normalize, ConnectionDescriptor};
use super::driver::{Criteria, Driver};
use super::postgres::PgDriver;
use super::schema::{Model, Record, TableSchema};
use crate::config::{Config, PoolConfig};
use crate::core::{DriverError, Result, StoreError};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Store<D: Driver = PgDriver> {
    driver: Arc<D>,
    error: Option<StoreError>,
    rows_affected: u64,
    last_read: Option<Value>,
}

impl Store<PgDriver> {
    /// Normalizes `config.postgres` and opens a pooled PostgreSQL connection.
    ///
    /// # Returns
    ///
    /// `StoreError::Validation` for a bad port, `StoreError::Connection` if
    /// the server cannot be reached. No store is produced in either case.
    pub async fn open(config: &Config) -> Result<Self> {
        let descriptor = normalize(&config.postgres)?;
        Self::connect(descriptor, &config.pool).await
    }

    /// Opens a pooled PostgreSQL connection from a resolved descriptor.
    pub async fn connect(descriptor: ConnectionDescriptor, pool: &PoolConfig) -> Result<Self> {
        let driver = PgDriver::open(&descriptor, pool)
            .await
            .map_err(StoreError::Connection)?;
        Ok(Self::with_driver(driver))
    }
}

impl<D: Driver> Store<D> {
    /// A store over an already opened driver, with an empty slot.
    pub fn with_driver(driver: D) -> Self {
        Store {
            driver: Arc::new(driver),
            error: None,
            rows_affected: 0,
            last_read: None,
        }
    }

    /// A second store over the same driver with its own empty slot.
    ///
    /// The slot is not synchronised, so concurrent tasks each take a fork
    /// rather than sharing one store.
    pub fn fork(&self) -> Self {
        Store {
            driver: Arc::clone(&self.driver),
            error: None,
            rows_affected: 0,
            last_read: None,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Error recorded by the most recent CRUD call, if any.
    pub fn err(&self) -> Option<&StoreError> {
        self.error.as_ref()
    }

    /// Moves the recorded error out of the slot.
    pub fn take_err(&mut self) -> Option<StoreError> {
        self.error.take()
    }

    /// Rows affected by the most recent CRUD call.
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Checks that the engine is reachable. Leaves the slot untouched.
    pub async fn ping(&self) -> Result<()> {
        self.driver.ping().await.map_err(StoreError::Connection)
    }

    /// Releases the connection resources. Forks sharing the driver observe
    /// the driver's closed-state errors afterwards.
    pub async fn close(self) -> Result<()> {
        self.driver.close().await.map_err(StoreError::Connection)?;
        debug!("store closed");
        Ok(())
    }

    /// Creates or extends the tables for each schema.
    pub async fn auto_migrate(&self, schemas: &[TableSchema]) -> Result<()> {
        self.driver
            .migrate(schemas)
            .await
            .map_err(StoreError::Migration)?;
        debug!(tables = schemas.len(), "auto-migrated");
        Ok(())
    }

    /// Inserts `value`. On success `value` is replaced with the stored row,
    /// so engine-assigned keys become visible to the caller.
    pub async fn create<M: Model>(&mut self, ctx: &Context, value: &mut M) -> &mut Self {
        let schema = M::schema();
        let record = match to_record(&schema, &*value) {
            Ok(record) => record,
            Err(e) => return self.settle(schema.table, "create", Some(e), 0),
        };

        let result = ctx.run(self.driver.insert(&schema, record)).await;
        match result {
            Ok(stored) => match serde_json::from_value(Value::Object(stored)) {
                Ok(model) => {
                    *value = model;
                    self.settle(schema.table, "create", None, 1)
                }
                Err(e) => self.settle(schema.table, "create", Some(e.into()), 1),
            },
            Err(e) => self.settle(schema.table, "create", Some(StoreError::Query(e)), 0),
        }
    }

    /// Loads every row of `M`'s table into `out`.
    ///
    /// A successful read of at least one row also replaces the snapshot used
    /// by [`Store::to_json`]. An empty or failed read keeps the previous one.
    pub async fn read_all<M: Model>(&mut self, ctx: &Context, out: &mut Vec<M>) -> &mut Self {
        let schema = M::schema();
        let rows = match self.fetch::<M>(ctx, &schema, Criteria::All).await {
            Ok(rows) => rows,
            Err(e) => return self.settle(schema.table, "read_all", Some(e), 0),
        };

        let count = rows.len() as u64;
        *out = rows;
        if count == 0 {
            return self.settle(schema.table, "read_all", None, 0);
        }
        match serde_json::to_value(&*out) {
            Ok(snapshot) => {
                self.last_read = Some(snapshot);
                self.settle(schema.table, "read_all", None, count)
            }
            Err(e) => self.settle(schema.table, "read_all", Some(e.into()), count),
        }
    }

    /// Loads the row whose key equals `id` into `out`.
    ///
    /// An `id` below 1 records a validation error without contacting the
    /// engine and leaves the affected-row count as it was. This call never
    /// updates the [`Store::to_json`] snapshot.
    pub async fn read_by_id<M: Model>(
        &mut self,
        ctx: &Context,
        id: i64,
        out: &mut Vec<M>,
    ) -> &mut Self {
        if id < 1 {
            warn!(id, "read_by_id rejected");
            self.error = Some(StoreError::Validation("id cannot be negative".to_string()));
            return self;
        }

        let schema = M::schema();
        match self.fetch::<M>(ctx, &schema, Criteria::Id(id)).await {
            Ok(rows) => {
                let count = rows.len() as u64;
                *out = rows;
                self.settle(schema.table, "read_by_id", None, count)
            }
            Err(e) => self.settle(schema.table, "read_by_id", Some(e), 0),
        }
    }

    /// The last captured read as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self.snapshot()?)?)
    }

    /// The last captured read as JSON indented by four spaces.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.snapshot()?.serialize(&mut serializer)?;
        String::from_utf8(buf)
            .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    fn snapshot(&self) -> Result<&Value> {
        self.last_read.as_ref().ok_or(StoreError::NoReadResult)
    }

    async fn fetch<M: Model>(
        &self,
        ctx: &Context,
        schema: &TableSchema,
        criteria: Criteria,
    ) -> Result<Vec<M>> {
        let records = ctx
            .run(self.driver.find(schema, criteria))
            .await
            .map_err(StoreError::Query)?;
        records
            .into_iter()
            .map(|r| serde_json::from_value(Value::Object(r)).map_err(StoreError::from))
            .collect()
    }

    fn settle(&mut self, table: &str, op: &str, error: Option<StoreError>, rows: u64) -> &mut Self {
        match &error {
            Some(e) => warn!(table, op, error = %e, "operation failed"),
            None => debug!(table, op, rows, "operation completed"),
        }
        self.error = error;
        self.rows_affected = rows;
        self
    }
}

fn to_record<M: Model>(schema: &TableSchema, value: &M) -> Result<Record> {
    match serde_json::to_value(value)? {
        Value::Object(record) => Ok(record),
        _ => Err(StoreError::Query(DriverError::InvalidRecord(
            schema.table.to_string(),
        ))),
    }
}
