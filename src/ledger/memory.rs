//! In-memory key-value store

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::KeyValueStore;
use crate::error::LedgerError;

/// Process-local store, used in tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        // A panicking writer cannot leave a half-applied map behind: every
        // mutation is a single insert
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, LedgerError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), LedgerError> {
        self.entries().insert(key.to_string(), value);
        Ok(())
    }

    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&Value>,
        new: Value,
    ) -> Result<bool, LedgerError> {
        let mut entries = self.entries();
        if entries.get(key) != expected {
            return Ok(false);
        }
        entries.insert(key.to_string(), new);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compare_and_set_rejects_stale_expectation() {
        let store = MemoryStore::new();
        assert!(store.compare_and_set("backups", None, json!([1])).unwrap());
        assert!(!store.compare_and_set("backups", None, json!([2])).unwrap());
        assert!(
            store
                .compare_and_set("backups", Some(&json!([1])), json!([1, 2]))
                .unwrap()
        );
        assert_eq!(store.get("backups").unwrap(), Some(json!([1, 2])));
    }
}
