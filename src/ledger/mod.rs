//! Key-value persistence
//!
//! The backup ledger lives in an injected key-value store. Values are JSON
//! documents; `compare_and_set` lets writers detect concurrent updates
//! instead of silently overwriting each other.

pub mod json_file;
pub mod memory;

use serde_json::Value;

use crate::error::LedgerError;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Persistent option store
pub trait KeyValueStore: Send + Sync {
    /// Current value for `key`, `None` when never set
    fn get(&self, key: &str) -> Result<Option<Value>, LedgerError>;

    /// Unconditionally replaces the value for `key`
    fn set(&self, key: &str, value: Value) -> Result<(), LedgerError>;

    /// Stores `new` only if the current value equals `expected`
    /// (`None` meaning "absent"). Returns whether the swap happened.
    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&Value>,
        new: Value,
    ) -> Result<bool, LedgerError>;
}
