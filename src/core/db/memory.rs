/// In-Process Driver
///
/// A [`Driver`] that keeps tables in memory. It follows the same contract as
/// the PostgreSQL driver: tables must be migrated before use, unset primary
/// keys are assigned from a per-table sequence, duplicate keys are rejected
/// and a closed driver refuses all work.
use super::driver::{Criteria, Driver};
use super::schema::{Column, Record, TableSchema};
use crate::core::DriverError;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct MemTable {
    columns: Vec<Column>,
    rows: BTreeMap<i64, Record>,
    next_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryDriver {
    tables: Mutex<HashMap<String, MemTable>>,
    closed: AtomicBool,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored in `table`, if it exists.
    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.lock().get(table).map(|t| t.rows.len())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, MemTable>> {
        // Poisoning is ignored: no table mutation spans a panic point.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.is_closed() {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }

    fn insert_row(&self, schema: &TableSchema, record: Record) -> Result<Record, DriverError> {
        self.ensure_open()?;
        let mut tables = self.lock();
        let table = tables
            .get_mut(schema.table)
            .ok_or_else(|| DriverError::UnknownTable(schema.table.to_string()))?;

        let key_column = schema.key_column();
        let mut row = Record::new();
        for column in schema.insert_columns(&record) {
            let value = record.get(column.name).cloned().unwrap_or(Value::Null);
            check_value(column, &value)?;
            row.insert(column.name.to_string(), value);
        }

        let key = match row.get(key_column).and_then(Value::as_i64) {
            Some(key) => {
                if table.rows.contains_key(&key) {
                    return Err(DriverError::DuplicateKey {
                        table: schema.table.to_string(),
                        column: key_column.to_string(),
                        value: key.to_string(),
                    });
                }
                table.next_id = table.next_id.max(key);
                key
            }
            None => {
                table.next_id = table
                    .next_id
                    .checked_add(1)
                    .ok_or_else(|| DriverError::KeyExhausted(schema.table.to_string()))?;
                row.insert(key_column.to_string(), Value::from(table.next_id));
                table.next_id
            }
        };

        let stored = project(&table.columns, &row);
        table.rows.insert(key, stored.clone());
        debug!(table = schema.table, key, "memory insert");
        Ok(stored)
    }

    fn find_rows(
        &self,
        schema: &TableSchema,
        criteria: Criteria,
    ) -> Result<Vec<Record>, DriverError> {
        self.ensure_open()?;
        let tables = self.lock();
        let table = tables
            .get(schema.table)
            .ok_or_else(|| DriverError::UnknownTable(schema.table.to_string()))?;

        let rows = match criteria {
            Criteria::All => table.rows.values().map(|r| project(&schema.columns, r)).collect(),
            Criteria::Id(id) => table
                .rows
                .get(&id)
                .map(|r| vec![project(&schema.columns, r)])
                .unwrap_or_default(),
        };
        Ok(rows)
    }

    fn migrate_tables(&self, schemas: &[TableSchema]) -> Result<(), DriverError> {
        self.ensure_open()?;
        let mut tables = self.lock();
        for schema in schemas {
            let table = tables.entry(schema.table.to_string()).or_default();
            for column in &schema.columns {
                if !table.columns.iter().any(|c| c.name == column.name) {
                    table.columns.push(column.clone());
                    for row in table.rows.values_mut() {
                        row.entry(column.name.to_string()).or_insert(Value::Null);
                    }
                }
            }
            debug!(table = schema.table, columns = table.columns.len(), "memory migrate");
        }
        Ok(())
    }
}

/// Keeps only the listed columns, filling absent ones with null.
fn project(columns: &[Column], row: &Record) -> Record {
    columns
        .iter()
        .map(|c| {
            let value = row.get(c.name).cloned().unwrap_or(Value::Null);
            (c.name.to_string(), value)
        })
        .collect()
}

fn check_value(column: &Column, value: &Value) -> Result<(), DriverError> {
    let ok = match value {
        Value::Null => column.nullable || column.primary_key,
        v => column.ty.accepts(v),
    };
    if ok {
        Ok(())
    } else {
        Err(DriverError::Encode {
            column: column.name.to_string(),
            expected: column.ty.describe(),
            found: value.to_string(),
        })
    }
}

impl Driver for MemoryDriver {
    async fn ping(&self) -> Result<(), DriverError> {
        self.ensure_open()
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn migrate(&self, schemas: &[TableSchema]) -> Result<(), DriverError> {
        self.migrate_tables(schemas)
    }

    async fn insert(&self, schema: &TableSchema, record: Record) -> Result<Record, DriverError> {
        self.insert_row(schema, record)
    }

    async fn find(
        &self,
        schema: &TableSchema,
        criteria: Criteria,
    ) -> Result<Vec<Record>, DriverError> {
        self.find_rows(schema, criteria)
    }
}
