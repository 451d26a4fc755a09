/// # Test Utilities Module
///
/// Shared fixtures for unit tests: sample models and stores backed by the
/// in-memory driver.
use crate::core::db::{Column, ColumnType, Context, MemoryDriver, Model, Store, TableSchema};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub age: i32,
}

impl User {
    pub fn new(name: &str, age: i32) -> Self {
        User {
            id: 0,
            name: name.to_string(),
            age,
        }
    }
}

impl Model for User {
    fn schema() -> TableSchema {
        TableSchema::new(
            "users",
            vec![
                Column::primary_key("id", ColumnType::BigInt),
                Column::new("name", ColumnType::Text),
                Column::new("age", ColumnType::Integer),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

impl Model for Tag {
    fn schema() -> TableSchema {
        TableSchema::new(
            "tags",
            vec![
                Column::primary_key("id", ColumnType::BigInt),
                Column::new("label", ColumnType::Text),
            ],
        )
    }
}

/// A memory-backed store with the `users` and `tags` tables created.
pub async fn migrated_store() -> Store<MemoryDriver> {
    let store = Store::with_driver(MemoryDriver::new());
    store
        .auto_migrate(&[User::schema(), Tag::schema()])
        .await
        .expect("memory migration cannot fail");
    store
}

/// Inserts one user per name (age = 20 + index) and returns them as stored.
pub async fn seed_users(store: &mut Store<MemoryDriver>, names: &[&str]) -> Vec<User> {
    let ctx = Context::background();
    let mut created = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let mut user = User::new(name, 20 + i as i32);
        store.create(&ctx, &mut user).await;
        assert!(store.err().is_none(), "seeding {} failed: {:?}", name, store.err());
        created.push(user);
    }
    created
}
