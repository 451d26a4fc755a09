//! Connection manager and chainable query facade over PostgreSQL.
//!
//! ```no_run
//! use pgstore::config::Config;
//! use pgstore::core::db::Store;
//!
//! # async fn run() -> pgstore::core::Result<()> {
//! let store = Store::open(&Config::default()).await?;
//! store.ping().await?;
//! store.close().await
//! # }
//! ```

// Core infrastructure modules
pub mod core;

pub mod config;

#[cfg(test)]
mod test_utils;
