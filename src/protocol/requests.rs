//! Request bodies
//!
//! Every field is optional at the serde level so a missing field becomes a
//! `missing_params`/`missing_path` error instead of a generic JSON rejection.

use serde::Deserialize;

use crate::catalog::BulkItem;

#[derive(Debug, Default, Deserialize)]
pub struct ReadTemplateRequest {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTemplateRequest {
    pub path: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkUpdateRequest {
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RestoreRequest {
    /// Backup id or backup file path
    pub backup: Option<String>,
    /// Template path to restore onto instead of the original file
    pub target: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CleanupRequest {
    pub retention_days: Option<u32>,
    pub category: Option<String>,
}

/// Trims and drops empty strings
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
