//! Template result types
//!
//! Defines the structures returned by template service operations.

use serde::Serialize;
use std::path::PathBuf;

use crate::config::{ThemeOrigin, ThemeRootConfig};

/// A configured theme directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeRoot {
    pub name: String,
    pub path: PathBuf,
    pub origin: ThemeOrigin,
}

impl From<&ThemeRootConfig> for ThemeRoot {
    fn from(config: &ThemeRootConfig) -> Self {
        Self {
            name: config.name.clone(),
            path: PathBuf::from(&config.path),
            origin: config.origin,
        }
    }
}

/// Where in a theme a template was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// Directly in the theme root
    Root,
    /// In one of the partial-template subdirectories
    Part,
}

/// Listing entry. The resolved absolute path is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateFile {
    pub path: String,
    pub theme: String,
    pub origin: ThemeOrigin,
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    pub readable: bool,
    pub writable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadResult {
    pub path: String,
    pub content: String,
    pub writable: bool,
    pub size: u64,
    /// Seconds since the Unix epoch
    pub modified: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateResult {
    pub success: bool,
    pub message: String,
    /// Id of the backup taken before the write
    pub backup_created: String,
    pub bytes_written: usize,
}

/// Request-scoped facts the service needs to authorize a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteContext {
    pub actor_id: String,
    /// The request arrived over HTTPS (directly or via a trusted proxy)
    pub secure_transport: bool,
    pub debug_mode: bool,
}
