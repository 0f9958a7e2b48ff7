//! Settings persistence for Deckhand.
//!
//! This crate backs the registry's name store with a small SQLite key/value
//! table managed through `sqlx`, plus an in-memory backend for tests and
//! ephemeral sessions.
//!
//! # Features
//!
//! - **Connection pooling**: SQLite pool with WAL mode and busy timeout
//! - **Embedded migrations**: the `settings` table is created on connect
//! - **JSON values**: every key holds one JSON document
//!
//! # Example
//!
//! ```no_run
//! use deckhand_storage::{AnyPersistence, Database, DatabaseConfig, Persistence, SqlitePersistence};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("deckhand.db")).await?;
//! let store = AnyPersistence::from(SqlitePersistence::new(db));
//!
//! store.save("surfaces_names", &json!({"CL12": "Front desk"})).await?;
//! let names = store.load("surfaces_names").await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod persistence;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use persistence::{AnyPersistence, MemoryPersistence, Persistence, SqlitePersistence};
