//! Durable key-value store for JSON settings blobs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::StorageError;

/// Synchronous, best-effort key-value storage
pub trait SettingsStore: Send + Sync {
    /// Stored value for `key`. Read failures are logged and reported as absent.
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError>;
}

/// A JSON object on disk, one top-level entry per key
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write of the file
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<serde_json::Map<String, Value>, StorageError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(serde_json::Map::new())
            }
            Err(e) => return Err(StorageError::Read(format!("{}: {}", self.path.display(), e))),
        };

        match serde_json::from_str(&contents) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::Read(format!(
                "{}: top level is not an object",
                self.path.display()
            ))),
            Err(e) => Err(StorageError::Read(format!("{}: {}", self.path.display(), e))),
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        let _guard = self.lock.lock().unwrap();
        match self.read_all() {
            Ok(mut map) => map.remove(key),
            Err(e) => {
                tracing::warn!("Ignoring unreadable settings store: {}", e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap();

        // A corrupt file is replaced rather than blocking every write
        let mut map = self.read_all().unwrap_or_default();
        map.insert(key.to_string(), value.clone());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Write(format!("{}: {}", parent.display(), e)))?;
            }
        }

        let contents = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| StorageError::Serialize(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)
            .map_err(|e| StorageError::Write(format!("{}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StorageError::Write(format!("{}: {}", self.path.display(), e)))?;

        Ok(())
    }
}

/// In-process store, used when persistence is disabled
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/settings.json"));

        assert!(store.get("playground-settings").is_none());

        store.set("playground-settings", &json!({"a": 1})).unwrap();
        store.set("other", &json!([1, 2])).unwrap();

        assert_eq!(store.get("playground-settings"), Some(json!({"a": 1})));
        assert_eq!(store.get("other"), Some(json!([1, 2])));
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.get("playground-settings").is_none());

        store.set("playground-settings", &json!({"ok": true})).unwrap();
        assert_eq!(store.get("playground-settings"), Some(json!({"ok": true})));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.get("k").is_none());
        store.set("k", &json!("v")).unwrap();
        assert_eq!(store.get("k"), Some(json!("v")));
    }
}
