//! Backup result types
//!
//! Defines the ledger record and the structures returned by store queries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One ledger entry per backup ever created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Backup file name, unique across the store
    pub id: String,
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub category: String,
    /// Seconds since the Unix epoch
    pub created_at: i64,
    pub actor_id: String,
}

/// Conjunctive filters for listing; bounds are inclusive
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BackupFilter {
    pub category: Option<String>,
    #[serde(rename = "from")]
    pub from_time: Option<i64>,
    #[serde(rename = "to")]
    pub to_time: Option<i64>,
}

impl BackupFilter {
    pub fn matches(&self, record: &BackupRecord) -> bool {
        self.category
            .as_deref()
            .is_none_or(|category| record.category == category)
            && self.from_time.is_none_or(|from| record.created_at >= from)
            && self.to_time.is_none_or(|to| record.created_at <= to)
    }
}

/// Aggregate view over the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackupStats {
    pub total_count: usize,
    pub count_by_category: BTreeMap<String, usize>,
    /// Bytes of backup files still on disk
    pub total_bytes: u64,
    pub oldest_timestamp: Option<i64>,
    pub newest_timestamp: Option<i64>,
}
