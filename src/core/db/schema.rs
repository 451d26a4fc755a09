/// Record Shape Module
///
/// Describes the physical shape of a record type: its table name and columns.
/// Record values travel between the facade and a driver as JSON object maps,
/// so any `serde` type with a matching [`TableSchema`] can be stored.
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// A row as exchanged with a driver: column name to JSON value.
pub type Record = Map<String, Value>;

/// Column storage types understood by the drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit integer (`BIGINT`, `BIGSERIAL` when used as primary key)
    BigInt,
    /// 32-bit integer (`INTEGER`, `SERIAL` when used as primary key)
    Integer,
    /// Double precision float
    Double,
    Text,
    Boolean,
    /// Arbitrary JSON document (`JSONB`)
    Json,
}

impl ColumnType {
    /// PostgreSQL type name used in DDL.
    pub fn sql_type(self, primary_key: bool) -> &'static str {
        match (self, primary_key) {
            (ColumnType::BigInt, true) => "BIGSERIAL",
            (ColumnType::Integer, true) => "SERIAL",
            (ColumnType::BigInt, false) => "BIGINT",
            (ColumnType::Integer, false) => "INTEGER",
            (ColumnType::Double, _) => "DOUBLE PRECISION",
            (ColumnType::Text, _) => "TEXT",
            (ColumnType::Boolean, _) => "BOOLEAN",
            (ColumnType::Json, _) => "JSONB",
        }
    }

    /// Human readable name used in encode errors.
    pub fn describe(self) -> &'static str {
        match self {
            ColumnType::BigInt => "a 64-bit integer",
            ColumnType::Integer => "a 32-bit integer",
            ColumnType::Double => "a number",
            ColumnType::Text => "a string",
            ColumnType::Boolean => "a boolean",
            ColumnType::Json => "a JSON value",
        }
    }

    /// Whether a JSON value can be stored in a column of this type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ColumnType::BigInt => value.is_i64(),
            ColumnType::Integer => value
                .as_i64()
                .is_some_and(|v| i32::try_from(v).is_ok()),
            ColumnType::Double => value.is_number(),
            ColumnType::Text => value.is_string(),
            ColumnType::Boolean => value.is_boolean(),
            ColumnType::Json => true,
        }
    }
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub nullable: bool,
}

impl Column {
    /// A non-null column.
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Column {
            name,
            ty,
            primary_key: false,
            nullable: false,
        }
    }

    /// An auto-assigned primary key column.
    pub const fn primary_key(name: &'static str, ty: ColumnType) -> Self {
        Column {
            name,
            ty,
            primary_key: true,
            nullable: false,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Table name plus column definitions for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: &'static str,
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(table: &'static str, columns: Vec<Column>) -> Self {
        TableSchema { table, columns }
    }

    /// Name of the column matched by id lookups.
    pub fn key_column(&self) -> &'static str {
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .map(|c| c.name)
            .unwrap_or("id")
    }

    /// Columns that take part in an INSERT for `record`.
    ///
    /// A primary key whose value is missing, null or zero is left out so the
    /// engine assigns it.
    pub fn insert_columns<'a>(&'a self, record: &Record) -> Vec<&'a Column> {
        self.columns
            .iter()
            .filter(|c| !(c.primary_key && is_unset_key(record.get(c.name))))
            .collect()
    }
}

fn is_unset_key(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(v) => v.as_i64() == Some(0),
    }
}

/// A record type that can be stored through the facade.
///
/// The serialized form must be a JSON object whose keys match the column
/// names returned by [`Model::schema`].
///
/// ```
/// use pgstore::core::db::{Column, ColumnType, Model, TableSchema};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl Model for User {
///     fn schema() -> TableSchema {
///         TableSchema::new(
///             "users",
///             vec![
///                 Column::primary_key("id", ColumnType::BigInt),
///                 Column::new("name", ColumnType::Text),
///             ],
///         )
///     }
/// }
/// ```
pub trait Model: Serialize + DeserializeOwned + Send + Sync {
    fn schema() -> TableSchema;
}
