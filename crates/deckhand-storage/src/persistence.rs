//! Key/value persistence for registry settings.
//!
//! Values are JSON documents addressed by a string key. The registry stores
//! the surface name mapping under a single key and rewrites it in full on
//! every change.
//!
//! Like the hardware drivers, backends use native `async fn` in traits and
//! are dispatched through the [`AnyPersistence`] enum.

#![allow(async_fn_in_trait)]

use crate::connection::Database;
use crate::error::{StorageError, StorageResult};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Persistent key/value store of JSON values.
pub trait Persistence: Send + Sync {
    /// Load the value stored under `key`, if any.
    async fn load(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn save(&self, key: &str, value: &Value) -> StorageResult<()>;
}

/// SQLite-backed persistence using the `settings` table.
#[derive(Debug, Clone)]
pub struct SqlitePersistence {
    db: Database,
}

impl SqlitePersistence {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl Persistence for SqlitePersistence {
    async fn load(&self, key: &str) -> StorageResult<Option<Value>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|(text,)| serde_json::from_str(&text).map_err(StorageError::from))
            .transpose()
    }

    async fn save(&self, key: &str, value: &Value) -> StorageResult<()> {
        let text = serde_json::to_string(value)?;

        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(text)
        .bind(Utc::now().to_rfc3339())
        .execute(self.db.pool())
        .await?;

        Ok(())
    }
}

/// In-memory persistence.
///
/// Clones share the same map, so a test can keep one clone to inspect what
/// the registry saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    values: Arc<Mutex<HashMap<String, Value>>>,
    fail_saves: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value, as if persisted by an earlier run.
    pub fn with_value(self, key: impl Into<String>, value: Value) -> Self {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
        self
    }

    /// Current value under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Make every save fail.
    pub fn set_save_failure(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Persistence for MemoryPersistence {
    async fn load(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: &Value) -> StorageResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Internal("simulated save failure".to_string()));
        }

        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Enum wrapper for persistence backend dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyPersistence {
    /// SQLite settings table.
    Sqlite(SqlitePersistence),

    /// Process-local map.
    Memory(MemoryPersistence),
}

impl Persistence for AnyPersistence {
    async fn load(&self, key: &str) -> StorageResult<Option<Value>> {
        match self {
            Self::Sqlite(store) => store.load(key).await,
            Self::Memory(store) => store.load(key).await,
        }
    }

    async fn save(&self, key: &str, value: &Value) -> StorageResult<()> {
        match self {
            Self::Sqlite(store) => store.save(key, value).await,
            Self::Memory(store) => store.save(key, value).await,
        }
    }
}

impl From<SqlitePersistence> for AnyPersistence {
    fn from(store: SqlitePersistence) -> Self {
        Self::Sqlite(store)
    }
}

impl From<MemoryPersistence> for AnyPersistence {
    fn from(store: MemoryPersistence) -> Self {
        Self::Memory(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_round_trip_and_overwrite() {
        let store = MemoryPersistence::new();
        assert_eq!(store.load("surfaces_names").await.unwrap(), None);

        store.save("surfaces_names", &json!({"A": "Left"})).await.unwrap();
        store.save("surfaces_names", &json!({"A": "Right"})).await.unwrap();

        assert_eq!(
            store.load("surfaces_names").await.unwrap(),
            Some(json!({"A": "Right"}))
        );
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn test_memory_save_failure_keeps_previous_value() {
        let store = MemoryPersistence::new().with_value("k", json!(1));
        store.set_save_failure(true);

        assert!(store.save("k", &json!(2)).await.is_err());
        assert_eq!(store.get("k"), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_sqlite_overwrite() {
        let store = SqlitePersistence::new(Database::in_memory().await.unwrap());

        store.save("surfaces_names", &json!({"CL1": "Studio"})).await.unwrap();
        store.save("surfaces_names", &json!({"CL1": "Booth"})).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM settings")
            .fetch_one(store.database().pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            store.load("surfaces_names").await.unwrap(),
            Some(json!({"CL1": "Booth"}))
        );
    }

    #[tokio::test]
    async fn test_any_persistence_dispatch() {
        let memory = MemoryPersistence::new();
        let store = AnyPersistence::from(memory.clone());

        store.save("k", &json!("v")).await.unwrap();
        assert_eq!(memory.get("k"), Some(json!("v")));
    }
}
