//! Response bodies that are not plain domain results

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub success: bool,
    pub restored_to: String,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub deleted: usize,
}

#[derive(Debug, Serialize)]
pub struct ServerSection {
    pub name: &'static str,
    pub version: &'static str,
    pub namespace: String,
    pub started_at: i64,
    pub uptime_secs: i64,
}

#[derive(Debug, Serialize)]
pub struct RuntimeSection {
    pub os: &'static str,
    pub arch: &'static str,
    pub pid: u32,
}

#[derive(Debug, Serialize)]
pub struct ServiceSection {
    pub active_theme: Option<String>,
    pub theme_count: usize,
    pub rate_limit: usize,
    pub backup_retention_days: u32,
    pub https_required: bool,
    pub debug_mode: bool,
    pub catalog_enabled: bool,
    pub backups_by_category: BTreeMap<String, usize>,
}

/// Non-sensitive server, runtime and service metadata
#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub server: ServerSection,
    pub runtime: RuntimeSection,
    pub service: ServiceSection,
}
