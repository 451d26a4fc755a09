/// Database Module
///
/// This module provides the store facade and everything it is built from,
/// organized into focused submodules.
///
/// ## Architecture
///
/// - **Configuration Normalizer** (`descriptor.rs`): resolves a `ConnectionConfig` into a
///   connection descriptor
/// - **Record Shapes** (`schema.rs`): table and column definitions plus the `Model` trait
/// - **Driver Seam** (`driver.rs`): the engine interface, implemented by `postgres.rs` and
///   `memory.rs`
/// - **Cancellation** (`context.rs`): per-call cancellation and deadlines
/// - **Store Facade** (`store.rs`): chainable CRUD over a driver with a last-operation slot
///
/// ## Error Handling
///
/// Lifecycle operations return `StoreError` directly. CRUD operations record it
/// in the store's slot, readable through `Store::err`.
pub mod context;
pub mod descriptor;
pub mod driver;
pub mod memory;
pub mod postgres;
pub mod schema;
pub mod store;

pub use context::Context;
pub use descriptor::{normalize, ConnectionDescriptor, SslMode};
pub use driver::{Criteria, Driver};
pub use memory::MemoryDriver;
pub use postgres::PgDriver;
pub use schema::{Column, ColumnType, Model, Record, TableSchema};
pub use store::Store;
