/// PostgreSQL Driver
///
/// [`Driver`] implementation over a sqlx `PgPool`. The pool owns all
/// connection management; this module only translates descriptors into
/// connect options and records into parameterised SQL.
use super::descriptor::{ConnectionDescriptor, SslMode};
use super::driver::{Criteria, Driver};
use super::schema::{Column, ColumnType, Record, TableSchema};
use crate::config::PoolConfig;
use crate::core::DriverError;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::types::Json;
use sqlx::{Connection, Postgres, Row};
use std::time::Duration;
use tracing::{debug, info};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

#[derive(Debug, Clone)]
pub struct PgDriver {
    pool: PgPool,
}

impl PgDriver {
    /// Opens a connection pool for the descriptor.
    ///
    /// The pool establishes one connection up front, so an unreachable server
    /// or rejected credentials fail here rather than on first use.
    pub async fn open(
        descriptor: &ConnectionDescriptor,
        pool: &PoolConfig,
    ) -> Result<Self, DriverError> {
        debug!(dsn = %descriptor.redacted(), "opening postgres pool");
        let pool = PgPoolOptions::new()
            .max_connections(pool.max_connections)
            .acquire_timeout(Duration::from_secs(pool.acquire_timeout_secs))
            .connect_with(connect_options(descriptor))
            .await?;
        info!(host = descriptor.host(), dbname = descriptor.dbname(), "postgres pool ready");
        Ok(PgDriver { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        PgDriver { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps descriptor fields onto sqlx connect options.
///
/// `enable` requires TLS; the time zone is sent as a `TimeZone` startup
/// parameter.
pub fn connect_options(descriptor: &ConnectionDescriptor) -> PgConnectOptions {
    let ssl_mode = match descriptor.sslmode() {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Enable => PgSslMode::Require,
    };
    PgConnectOptions::new()
        .host(descriptor.host())
        .port(descriptor.port())
        .username(descriptor.user())
        .password(descriptor.password())
        .database(descriptor.dbname())
        .ssl_mode(ssl_mode)
        .options([("TimeZone", descriptor.timezone())])
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column_list<'a>(columns: impl IntoIterator<Item = &'a Column>) -> String {
    columns
        .into_iter()
        .map(|c| quote(c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn column_definition(column: &Column) -> String {
    let mut def = format!("{} {}", quote(column.name), column.ty.sql_type(column.primary_key));
    if column.primary_key {
        def.push_str(" PRIMARY KEY");
    } else if !column.nullable {
        def.push_str(" NOT NULL");
    }
    def
}

/// `CREATE TABLE IF NOT EXISTS` followed by one `ADD COLUMN IF NOT EXISTS`
/// per column, so existing tables gain missing columns.
pub(crate) fn migrate_statements(schema: &TableSchema) -> Vec<String> {
    let defs = schema
        .columns
        .iter()
        .map(column_definition)
        .collect::<Vec<_>>()
        .join(", ");
    let table = quote(schema.table);

    let mut statements = vec![format!("CREATE TABLE IF NOT EXISTS {table} ({defs})")];
    for column in schema.columns.iter().filter(|c| !c.primary_key) {
        // Added columns stay nullable: NOT NULL cannot be added to a populated
        // table without a default.
        statements.push(format!(
            "ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {} {}",
            quote(column.name),
            column.ty.sql_type(false)
        ));
    }
    statements
}

pub(crate) fn insert_sql(schema: &TableSchema, columns: &[&Column]) -> String {
    let table = quote(schema.table);
    let returning = column_list(&schema.columns);
    if columns.is_empty() {
        return format!("INSERT INTO {table} DEFAULT VALUES RETURNING {returning}");
    }
    let placeholders = (1..=columns.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders}) RETURNING {returning}",
        column_list(columns.iter().copied())
    )
}

pub(crate) fn select_sql(schema: &TableSchema, criteria: Criteria) -> String {
    let mut sql = format!(
        "SELECT {} FROM {}",
        column_list(&schema.columns),
        quote(schema.table)
    );
    if let Criteria::Id(_) = criteria {
        sql.push_str(&format!(" WHERE {} = $1", quote(schema.key_column())));
    }
    if schema.columns.iter().any(|c| c.primary_key) {
        sql.push_str(&format!(" ORDER BY {}", quote(schema.key_column())));
    }
    sql
}

fn bind_value<'q>(
    query: PgQuery<'q>,
    column: &Column,
    value: Option<&Value>,
) -> Result<PgQuery<'q>, DriverError> {
    let value = value.filter(|v| !v.is_null());
    if let Some(v) = value {
        if !column.ty.accepts(v) {
            return Err(DriverError::Encode {
                column: column.name.to_string(),
                expected: column.ty.describe(),
                found: v.to_string(),
            });
        }
    }

    let query = match column.ty {
        ColumnType::BigInt => query.bind(value.and_then(Value::as_i64)),
        ColumnType::Integer => query.bind(
            value
                .and_then(Value::as_i64)
                .and_then(|v| i32::try_from(v).ok()),
        ),
        ColumnType::Double => query.bind(value.and_then(Value::as_f64)),
        ColumnType::Text => query.bind(value.and_then(Value::as_str).map(str::to_owned)),
        ColumnType::Boolean => query.bind(value.and_then(Value::as_bool)),
        ColumnType::Json => query.bind(value.cloned().map(Json)),
    };
    Ok(query)
}

fn decode_row(schema: &TableSchema, row: &PgRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for column in &schema.columns {
        let name = column.name;
        let value = match column.ty {
            ColumnType::BigInt => row.try_get::<Option<i64>, _>(name)?.map(Value::from),
            ColumnType::Integer => row.try_get::<Option<i32>, _>(name)?.map(Value::from),
            ColumnType::Double => row.try_get::<Option<f64>, _>(name)?.map(Value::from),
            ColumnType::Text => row.try_get::<Option<String>, _>(name)?.map(Value::from),
            ColumnType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::from),
            ColumnType::Json => row.try_get::<Option<Value>, _>(name)?,
        };
        record.insert(name.to_string(), value.unwrap_or(Value::Null));
    }
    Ok(record)
}

impl Driver for PgDriver {
    async fn ping(&self) -> Result<(), DriverError> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.pool.close().await;
        debug!("postgres pool closed");
        Ok(())
    }

    async fn migrate(&self, schemas: &[TableSchema]) -> Result<(), DriverError> {
        for schema in schemas {
            for statement in migrate_statements(schema) {
                sqlx::query(&statement).execute(&self.pool).await?;
            }
            debug!(table = schema.table, "migrated");
        }
        Ok(())
    }

    async fn insert(&self, schema: &TableSchema, record: Record) -> Result<Record, DriverError> {
        let columns = schema.insert_columns(&record);
        let sql = insert_sql(schema, &columns);

        let mut query = sqlx::query(&sql);
        for column in &columns {
            query = bind_value(query, column, record.get(column.name))?;
        }

        let row = query.fetch_one(&self.pool).await?;
        Ok(decode_row(schema, &row)?)
    }

    async fn find(
        &self,
        schema: &TableSchema,
        criteria: Criteria,
    ) -> Result<Vec<Record>, DriverError> {
        let sql = select_sql(schema, criteria);
        let mut query = sqlx::query(&sql);
        if let Criteria::Id(id) = criteria {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let records = rows
            .iter()
            .map(|row| decode_row(schema, row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
