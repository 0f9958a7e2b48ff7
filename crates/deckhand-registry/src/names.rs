//! User-assigned display names keyed by device serial number.
//!
//! The whole mapping is persisted as one JSON object under
//! [`SURFACE_NAMES_KEY`] and rewritten in full on every change.

use deckhand_core::constants::SURFACE_NAMES_KEY;
use deckhand_storage::{Persistence, StorageResult};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Serial number → display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameStore {
    names: BTreeMap<String, String>,
}

impl NameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from its persisted JSON form.
    ///
    /// Entries whose value is not a string are skipped; anything other than
    /// an object yields an empty store.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            warn!("Stored surface names are not a JSON object, ignoring");
            return Self::new();
        };

        let names = object
            .iter()
            .filter_map(|(serial, name)| match name.as_str() {
                Some(name) => Some((serial.clone(), name.to_string())),
                None => {
                    warn!(serial = %serial, "Skipping non-string surface name");
                    None
                }
            })
            .collect();

        Self { names }
    }

    pub fn to_value(&self) -> Value {
        let object: Map<String, Value> = self
            .names
            .iter()
            .map(|(serial, name)| (serial.clone(), Value::String(name.clone())))
            .collect();
        Value::Object(object)
    }

    /// Display name for `serial`, empty when none was set.
    pub fn get(&self, serial: &str) -> &str {
        self.names.get(serial).map(String::as_str).unwrap_or_default()
    }

    pub fn set(&mut self, serial: impl Into<String>, name: impl Into<String>) {
        self.names.insert(serial.into(), name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Load the stored mapping. A missing key yields an empty store.
    pub async fn load<P: Persistence>(store: &P) -> StorageResult<Self> {
        let names = match store.load(SURFACE_NAMES_KEY).await? {
            Some(value) => Self::from_value(&value),
            None => Self::new(),
        };
        debug!(count = names.len(), "Loaded surface names");
        Ok(names)
    }

    /// Persist the full mapping.
    pub async fn save<P: Persistence>(&self, store: &P) -> StorageResult<()> {
        store.save(SURFACE_NAMES_KEY, &self.to_value()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckhand_storage::MemoryPersistence;
    use serde_json::json;

    #[test]
    fn test_unknown_serial_has_empty_name() {
        let names = NameStore::new();
        assert_eq!(names.get("AB12"), "");
    }

    #[test]
    fn test_set_overwrites() {
        let mut names = NameStore::new();
        names.set("AB12", "Studio");
        names.set("AB12", "Desk");
        assert_eq!(names.get("AB12"), "Desk");
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_from_value_skips_non_strings() {
        let names = NameStore::from_value(&json!({ "A": "Left", "B": 7 }));
        assert_eq!(names.get("A"), "Left");
        assert_eq!(names.get("B"), "");
        assert_eq!(names.len(), 1);

        assert!(NameStore::from_value(&json!(["A"])).is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryPersistence::new();
        let mut names = NameStore::new();
        names.set("CL01", "Main deck");
        names.save(&store).await.unwrap();

        assert_eq!(store.get(SURFACE_NAMES_KEY), Some(json!({ "CL01": "Main deck" })));

        let loaded = NameStore::load(&store).await.unwrap();
        assert_eq!(loaded, names);
    }

    #[tokio::test]
    async fn test_load_missing_key() {
        let store = MemoryPersistence::new();
        assert!(NameStore::load(&store).await.unwrap().is_empty());
    }
}
