//! JSON file key-value store
//!
//! All keys live in one JSON object on disk. Every mutation holds a process
//! mutex plus an exclusive lock on a sibling `.lock` file, then persists by
//! writing a temporary file and renaming it over the original.

use fs4::FileExt;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use super::KeyValueStore;
use crate::error::LedgerError;

/// File-backed store
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    /// Opens (without creating) the store at `path`; parent directories are
    /// created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn process_guard(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Cross-process exclusive lock, released when the returned file drops
    fn acquire_file_lock(&self) -> Result<File, LedgerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn read_all(&self) -> Result<Map<String, Value>, LedgerError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&raw)? {
            Value::Object(map) => Ok(map),
            other => Err(LedgerError::Serialization(format!(
                "expected a JSON object in {}, found {}",
                self.path.display(),
                type_name(&other)
            ))),
        }
    }

    fn write_all(&self, entries: &Map<String, Value>) -> Result<(), LedgerError> {
        let temp_path = self.temp_path();
        let bytes = serde_json::to_vec_pretty(entries)?;

        let mut temp_file = File::create(&temp_path)?;
        if let Err(e) = temp_file.write_all(&bytes).and_then(|_| temp_file.sync_all()) {
            warn!("Failed to write ledger temp file {}: {}", temp_path.display(), e);
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        drop(temp_file);

        fs::rename(&temp_path, &self.path)?;
        debug!("Persisted {} ledger keys to {}", entries.len(), self.path.display());
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, LedgerError> {
        let _guard = self.process_guard();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), LedgerError> {
        let _guard = self.process_guard();
        let _lock = self.acquire_file_lock()?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&Value>,
        new: Value,
    ) -> Result<bool, LedgerError> {
        let _guard = self.process_guard();
        let _lock = self.acquire_file_lock()?;
        let mut entries = self.read_all()?;
        if entries.get(key) != expected {
            return Ok(false);
        }
        entries.insert(key.to_string(), new);
        self.write_all(&entries)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("options.json"));
        assert_eq!(store.get("backups").unwrap(), None);
    }

    #[test]
    fn values_survive_reopening() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("options.json");

        JsonFileStore::new(&path)
            .set("backups", json!([{"id": "a"}]))
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("backups").unwrap(), Some(json!([{"id": "a"}])));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn compare_and_set_detects_changes_between_read_and_write() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("options.json"));
        store.set("backups", json!([])).unwrap();

        let snapshot = store.get("backups").unwrap();
        store.set("backups", json!(["other writer"])).unwrap();

        let swapped = store
            .compare_and_set("backups", snapshot.as_ref(), json!(["mine"]))
            .unwrap();
        assert!(!swapped);
        assert_eq!(store.get("backups").unwrap(), Some(json!(["other writer"])));
    }

    #[test]
    fn non_object_file_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("options.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.get("backups"),
            Err(LedgerError::Serialization(_))
        ));
    }
}
