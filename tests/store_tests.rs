//! End-to-end store scenarios through the public API.

use pgstore::config::{Config, ConnectionConfig, PoolConfig};
use pgstore::core::db::{
    normalize, Column, ColumnType, Context, MemoryDriver, Model, Store, TableSchema,
};
use pgstore::core::{DriverError, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Product {
    #[serde(default)]
    id: i64,
    code: String,
    price: f64,
    in_stock: bool,
    attributes: Option<serde_json::Value>,
}

impl Model for Product {
    fn schema() -> TableSchema {
        TableSchema::new(
            "products",
            vec![
                Column::primary_key("id", ColumnType::BigInt),
                Column::new("code", ColumnType::Text),
                Column::new("price", ColumnType::Double),
                Column::new("in_stock", ColumnType::Boolean),
                Column::new("attributes", ColumnType::Json).nullable(),
            ],
        )
    }
}

fn product(code: &str, price: f64) -> Product {
    Product {
        id: 0,
        code: code.to_string(),
        price,
        in_stock: true,
        attributes: Some(json!({"color": "red"})),
    }
}

#[tokio::test]
async fn open_rejects_out_of_range_port() {
    let config = Config {
        postgres: ConnectionConfig {
            port: 70000,
            ..Default::default()
        },
        ..Default::default()
    };

    match Store::open(&config).await {
        Err(StoreError::Validation(msg)) => assert!(msg.contains("port out of range")),
        Err(other) => panic!("Expected Validation error, got {other}"),
        Ok(_) => panic!("Expected Validation error, got a store"),
    }
}

fn unreachable_server() -> Config {
    Config {
        postgres: ConnectionConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..Default::default()
        },
        pool: PoolConfig {
            max_connections: 1,
            acquire_timeout_secs: 1,
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn open_reports_unreachable_server_as_connection_error() {
    let config = unreachable_server();

    match Store::open(&config).await {
        Err(StoreError::Connection(DriverError::Sqlx(_))) => {}
        Err(other) => panic!("Expected Connection error, got {other}"),
        Ok(_) => panic!("Expected Connection error, got a store"),
    }

    let descriptor = normalize(&config.postgres).unwrap();
    match Store::connect(descriptor, &config.pool).await {
        Err(err @ StoreError::Connection(_)) => {
            assert!(err.to_string().starts_with("Connection error:"));
        }
        Err(other) => panic!("Expected Connection error, got {other}"),
        Ok(_) => panic!("Expected Connection error, got a store"),
    }
}

#[tokio::test]
async fn create_failure_keeps_chain_alive() {
    let mut store = Store::with_driver(MemoryDriver::new());
    let ctx = Context::background();
    let mut widget = product("W-1", 9.5);
    let mut all: Vec<Product> = Vec::new();

    store
        .create(&ctx, &mut widget)
        .await
        .read_all(&ctx, &mut all)
        .await;

    assert!(matches!(
        store.err(),
        Some(StoreError::Query(DriverError::UnknownTable(_)))
    ));
    assert_eq!(store.rows_affected(), 0);
    assert!(all.is_empty());
}

#[tokio::test]
async fn migrate_create_read_and_serialize() {
    let mut store = Store::with_driver(MemoryDriver::new());
    store.auto_migrate(&[Product::schema()]).await.unwrap();
    store.ping().await.unwrap();

    let ctx = Context::background();
    let mut bolt = product("B-7", 0.25);
    let mut nut = product("N-2", 0.1);
    nut.attributes = None;

    store.create(&ctx, &mut bolt).await.create(&ctx, &mut nut).await;
    assert!(store.err().is_none());
    assert_eq!((bolt.id, nut.id), (1, 2));

    let mut all: Vec<Product> = Vec::new();
    store.read_all(&ctx, &mut all).await;
    assert_eq!(store.rows_affected(), 2);
    assert_eq!(all, vec![bolt.clone(), nut.clone()]);

    let compact: Vec<Product> = serde_json::from_str(&store.to_json().unwrap()).unwrap();
    let pretty: Vec<Product> = serde_json::from_str(&store.to_json_pretty().unwrap()).unwrap();
    assert_eq!(compact, all);
    assert_eq!(pretty, all);
    assert!(store.to_json_pretty().unwrap().contains("\n    {\n        \"id\": 1,"));

    let mut one: Vec<Product> = Vec::new();
    store.read_by_id(&ctx, nut.id, &mut one).await;
    assert_eq!(one, vec![nut]);

    store.close().await.unwrap();
}

#[tokio::test]
async fn forks_keep_separate_slots() {
    let store = Store::with_driver(MemoryDriver::new());
    store.auto_migrate(&[Product::schema()]).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..4 {
        let mut fork = store.fork();
        handles.push(tokio::spawn(async move {
            let mut item = product(&format!("P-{i}"), f64::from(i));
            fork.create(&Context::background(), &mut item).await;
            (fork.err().is_none(), fork.rows_affected())
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), (true, 1));
    }

    assert_eq!(store.driver().row_count("products"), Some(4));
    assert!(store.err().is_none());
    assert_eq!(store.rows_affected(), 0);
}
