//! Configuration management for the theme MCP server
//!
//! Separates startup configuration (requires restart) from runtime configuration
//! (shared behind a lock and read on every request).

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::policy::{DEFAULT_DANGEROUS_FUNCTIONS, DEFAULT_SCRIPT_MARKERS};

/// Complete server configuration with startup/runtime separation
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub startup: StartupConfig,

    #[serde(flatten)]
    pub runtime: RuntimeConfig,
}

/// Whether a theme root is the active (child) theme or the one it inherits from
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeOrigin {
    Parent,
    Child,
}

/// One directory tree templates are served from
#[derive(Debug, Deserialize, Clone)]
pub struct ThemeRootConfig {
    pub name: String,
    pub path: String,
    pub origin: ThemeOrigin,
}

/// A bearer token and the capabilities granted to its holder
#[derive(Debug, Deserialize, Clone)]
pub struct ApiKeyConfig {
    pub token: String,
    pub actor_id: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Configuration that requires server restart to take effect
#[derive(Debug, Deserialize, Clone)]
pub struct StartupConfig {
    // ═══ NETWORK (Environment Override Supported) ═══
    /// IP address to bind the HTTP listener
    pub bind_address: String,

    /// Port for the HTTP listener
    pub port: u16,

    /// Prefix every route is mounted under
    #[serde(default = "default_namespace")]
    pub api_namespace: String,

    // ═══ TEMPLATES ═══
    /// Theme roots in resolution order; the first root containing a path wins
    pub theme_roots: Vec<ThemeRootConfig>,

    /// Subdirectories scanned when listing, `""` meaning the root itself
    #[serde(default = "default_template_subdirs")]
    pub template_subdirs: Vec<String>,

    /// Only files with this suffix can be listed, read or written
    #[serde(default = "default_template_suffix")]
    pub template_suffix: String,

    /// Reject template updates that do not arrive over HTTPS
    #[serde(default = "default_true")]
    pub require_secure_transport: bool,

    // ═══ CONTENT POLICY ═══
    #[serde(default = "default_script_markers")]
    pub script_markers: Vec<String>,

    #[serde(default = "default_dangerous_functions")]
    pub dangerous_functions: Vec<String>,

    // ═══ BACKUPS ═══
    /// Directory holding one subdirectory per backup category
    pub backup_root: String,

    /// JSON file backing the key-value store (backup ledger)
    pub ledger_path: String,

    /// Seconds between scheduled retention cleanups
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    // ═══ CATALOG ═══
    #[serde(default)]
    pub catalog_enabled: bool,

    // ═══ AUTH (TOML Only) ═══
    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,
}

/// Configuration read on every request; may be swapped while running
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// Requests per minute per actor
    /// Environment: THEME_MCP__RATE_LIMIT
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,

    /// Days a backup is kept by the scheduled cleanup
    /// Environment: THEME_MCP__BACKUP_RETENTION_DAYS
    #[serde(default = "default_retention_days")]
    pub backup_retention_days: u32,

    /// Origins allowed by CORS; empty keeps the same-origin policy
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Relaxes the HTTPS requirement on template updates
    #[serde(default)]
    pub debug_mode: bool,
}

/// Thread-safe runtime configuration wrapper
pub type SharedRuntimeConfig = Arc<RwLock<RuntimeConfig>>;

fn default_namespace() -> String {
    "/mcp/v1".to_string()
}

fn default_template_subdirs() -> Vec<String> {
    ["", "template-parts", "parts", "partials", "templates"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_template_suffix() -> String {
    ".php".to_string()
}

fn default_true() -> bool {
    true
}

fn default_script_markers() -> Vec<String> {
    DEFAULT_SCRIPT_MARKERS.iter().map(|s| s.to_string()).collect()
}

fn default_dangerous_functions() -> Vec<String> {
    DEFAULT_DANGEROUS_FUNCTIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_cleanup_interval() -> u64 {
    24 * 60 * 60
}

fn default_rate_limit() -> usize {
    60
}

fn default_retention_days() -> u32 {
    7
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            backup_retention_days: default_retention_days(),
            cors_origins: Vec::new(),
            debug_mode: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        // Try deployment path first, then development path
        let config_paths = ["theme-mcp-server/config", "config"];

        let mut last_error = None;

        for config_path in &config_paths {
            match Self::load_from(config_path) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            }
        }

        Err(config::ConfigError::Message(format!(
            "Failed to load config.toml from any location. Tried: {config_paths:?}. Last error: {last_error:?}"
        )))
    }

    /// Load from a single file (extension optional) with environment overrides
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(config_path))
            .add_source(
                Environment::with_prefix("THEME_MCP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Split into startup (immutable) and runtime (mutable) parts
    pub fn split(self) -> (StartupConfig, SharedRuntimeConfig) {
        let runtime = Arc::new(RwLock::new(self.runtime));
        (self.startup, runtime)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.startup.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        if self.startup.theme_roots.is_empty() {
            return Err(config::ConfigError::Message(
                "at least one theme root is required".into(),
            ));
        }

        if let Some(root) = self.startup.theme_roots.iter().find(|r| r.path.is_empty()) {
            return Err(config::ConfigError::Message(format!(
                "theme root '{}' has an empty path",
                root.name
            )));
        }

        if self.startup.template_suffix.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "template_suffix cannot be empty".into(),
            ));
        }

        if self.startup.backup_root.is_empty() || self.startup.ledger_path.is_empty() {
            return Err(config::ConfigError::Message(
                "backup_root and ledger_path cannot be empty".into(),
            ));
        }

        if self.startup.api_keys.iter().any(|k| k.token.trim().is_empty()) {
            return Err(config::ConfigError::Message(
                "api key tokens cannot be empty".into(),
            ));
        }

        if self.runtime.rate_limit == 0 {
            return Err(config::ConfigError::Message(
                "rate_limit must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl StartupConfig {
    /// Get bind address and port as socket address
    pub fn listen_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Theme root directories in resolution order
    pub fn theme_root_paths(&self) -> Vec<PathBuf> {
        self.theme_roots.iter().map(|r| PathBuf::from(&r.path)).collect()
    }

    pub fn backup_root_path(&self) -> PathBuf {
        PathBuf::from(&self.backup_root)
    }

    pub fn ledger_file_path(&self) -> PathBuf {
        PathBuf::from(&self.ledger_path)
    }

    /// Get cleanup interval as Duration
    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_secs.max(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
bind_address = "127.0.0.1"
port = 8787
backup_root = "/var/lib/theme-mcp/backups"
ledger_path = "/var/lib/theme-mcp/options.json"

[[theme_roots]]
name = "Storefront Child"
path = "/srv/themes/storefront-child"
origin = "child"

[[theme_roots]]
name = "Storefront"
path = "/srv/themes/storefront"
origin = "parent"
"#;

    fn write_config(body: &str) -> (TempDir, String) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, body).unwrap();
        let path = path.to_string_lossy().into_owned();
        (dir, path)
    }

    #[test]
    fn minimal_file_gets_defaults() {
        let (_dir, path) = write_config(MINIMAL);
        let config = ServerConfig::load_from(&path).unwrap();

        assert_eq!(config.startup.api_namespace, "/mcp/v1");
        assert_eq!(config.startup.template_suffix, ".php");
        assert_eq!(config.startup.template_subdirs.len(), 5);
        assert!(config.startup.require_secure_transport);
        assert_eq!(config.startup.theme_roots[0].origin, ThemeOrigin::Child);
        assert_eq!(config.runtime.rate_limit, 60);
        assert_eq!(config.runtime.backup_retention_days, 7);
        assert!(!config.runtime.debug_mode);
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let (_dir, path) = write_config(&format!("rate_limit = 0\n{MINIMAL}"));
        assert!(ServerConfig::load_from(&path).is_err());
    }

    #[test]
    fn missing_theme_roots_is_rejected() {
        let body = r#"
bind_address = "127.0.0.1"
port = 8787
backup_root = "/tmp/b"
ledger_path = "/tmp/o.json"
theme_roots = []
"#;
        let (_dir, path) = write_config(body);
        assert!(ServerConfig::load_from(&path).is_err());
    }
}
