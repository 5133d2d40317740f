//! Template service
//!
//! Lists, reads and updates theme templates. Every path a client sends is
//! confined to the configured theme roots before the filesystem is touched,
//! and every update is preceded by a backup of the current content.

use log::{debug, error, info, warn};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::results::{
    ReadResult, TemplateFile, TemplateKind, ThemeRoot, UpdateResult, WriteContext,
};
use crate::backup::{BackupStore, CATEGORY_TEMPLATE};
use crate::config::StartupConfig;
use crate::error::TemplateError;
use crate::policy::{ContentPolicy, Verdict};
use crate::storage::filesystem::{file_exists, file_size, modified_secs};
use crate::storage::permissions::{is_readable, is_writable};
use crate::storage::{
    ConfinedPath, ContentWriter, LockedFileWriter, resolve_confined_path,
};

/// Hook fired after a successful template write so rendered output can be
/// refreshed. Failures are logged and never fail the write.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Invalidator for deployments without a render cache
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate(&self, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        debug!("No render cache to invalidate for {}", path.display());
        Ok(())
    }
}

/// Static part of the service configuration
#[derive(Debug, Clone)]
pub struct TemplateSettings {
    /// Resolution order; the first root containing a path wins
    pub roots: Vec<ThemeRoot>,
    pub subdirs: Vec<String>,
    pub suffix: String,
    pub require_secure_transport: bool,
    pub policy: ContentPolicy,
}

impl TemplateSettings {
    pub fn from_config(config: &StartupConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            roots: config.theme_roots.iter().map(ThemeRoot::from).collect(),
            subdirs: config.template_subdirs.clone(),
            suffix: config.template_suffix.clone(),
            require_secure_transport: config.require_secure_transport,
            policy: ContentPolicy::new(&config.script_markers, &config.dangerous_functions)?,
        })
    }
}

pub struct TemplateService {
    settings: TemplateSettings,
    root_paths: Vec<PathBuf>,
    backups: Arc<BackupStore>,
    writer: Arc<dyn ContentWriter>,
    cache: Arc<dyn CacheInvalidator>,
}

impl TemplateService {
    pub fn new(settings: TemplateSettings, backups: Arc<BackupStore>) -> Self {
        let root_paths = settings.roots.iter().map(|r| r.path.clone()).collect();
        Self {
            settings,
            root_paths,
            backups,
            writer: Arc::new(LockedFileWriter),
            cache: Arc::new(NoopInvalidator),
        }
    }

    pub fn with_writer(mut self, writer: Arc<dyn ContentWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_cache_invalidator(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = cache;
        self
    }

    pub fn backups(&self) -> &Arc<BackupStore> {
        &self.backups
    }

    /// Confines `raw` to the theme roots
    pub fn resolve(&self, raw: &str) -> Result<ConfinedPath, TemplateError> {
        Ok(resolve_confined_path(
            raw,
            &self.root_paths,
            &self.settings.suffix,
        )?)
    }

    /// Templates in every root and allow-listed subdirectory, root order
    /// first, then subdirectory order, then file name.
    pub fn list(&self) -> Vec<TemplateFile> {
        let mut templates = Vec::new();

        for root in &self.settings.roots {
            for subdir in &self.settings.subdirs {
                let subdir = subdir.trim_matches('/');
                let dir = if subdir.is_empty() {
                    root.path.clone()
                } else {
                    root.path.join(subdir)
                };
                if !dir.is_dir() {
                    continue;
                }

                let kind = if subdir.is_empty() {
                    TemplateKind::Root
                } else {
                    TemplateKind::Part
                };

                for name in self.template_names(&dir) {
                    let relative = if subdir.is_empty() {
                        name.clone()
                    } else {
                        format!("{}/{}", subdir, name)
                    };

                    // Re-validate against this root alone so symlinks
                    // pointing elsewhere are dropped
                    let Ok(confined) = resolve_confined_path(
                        &relative,
                        std::slice::from_ref(&root.path),
                        &self.settings.suffix,
                    ) else {
                        debug!("Skipping {} in {}: failed confinement", relative, root.name);
                        continue;
                    };
                    match dir.join(&name).canonicalize() {
                        Ok(discovered) if discovered == confined.absolute => {}
                        _ => continue,
                    }

                    templates.push(TemplateFile {
                        path: confined.relative,
                        theme: root.name.clone(),
                        origin: root.origin,
                        kind,
                        readable: is_readable(&confined.absolute),
                        writable: is_writable(&confined.absolute),
                    });
                }
            }
        }

        info!("Listed {} templates", templates.len());
        templates
    }

    /// Sorted names of suffix-matching regular files directly inside `dir`
    fn template_names(&self, dir: &Path) -> Vec<String> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list template directory {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let suffix = self.settings.suffix.to_ascii_lowercase();
        let mut names: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.to_ascii_lowercase().ends_with(&suffix))
            .collect();
        names.sort();
        names
    }

    pub fn read(&self, raw: &str) -> Result<ReadResult, TemplateError> {
        let confined = self.resolve(raw)?;
        let path = &confined.absolute;

        if !file_exists(path) {
            return Err(TemplateError::NotFound(confined.relative));
        }
        if !is_readable(path) {
            return Err(TemplateError::NotReadable(confined.relative));
        }

        let bytes = fs::read(path)?;
        let size = bytes.len();
        // Lossy decoding would corrupt the file on its next write
        let Ok(content) = String::from_utf8(bytes) else {
            warn!("Template {} is not valid UTF-8", confined.relative);
            return Err(TemplateError::NotUtf8(confined.relative));
        };

        debug!("Read template {} ({} bytes)", confined.relative, size);
        Ok(ReadResult {
            writable: is_writable(path),
            size: file_size(path),
            modified: modified_secs(path),
            path: confined.relative,
            content,
        })
    }

    /// Backs up and replaces a template.
    ///
    /// Checks run in a fixed order and the first failure wins: transport,
    /// path, existence, writability, content policy, backup. A failed write
    /// is rolled back from the backup taken just before it.
    pub fn update(
        &self,
        raw: &str,
        content: &str,
        ctx: &WriteContext,
    ) -> Result<UpdateResult, TemplateError> {
        if self.settings.require_secure_transport && !ctx.debug_mode && !ctx.secure_transport {
            return Err(TemplateError::TransportRequired);
        }

        let confined = self.resolve(raw)?;
        let path = &confined.absolute;

        if !file_exists(path) {
            return Err(TemplateError::NotFound(confined.relative));
        }
        if !is_writable(path) {
            return Err(TemplateError::NotWritable(confined.relative));
        }

        if let Verdict::Denied(name) = self.settings.policy.scan(content) {
            warn!(
                "Rejected update of {} by {}: calls {}",
                confined.relative, ctx.actor_id, name
            );
            return Err(TemplateError::DangerousContent(name));
        }

        let record = self
            .backups
            .create(path, CATEGORY_TEMPLATE, &ctx.actor_id)
            .map_err(TemplateError::BackupFailed)?;

        let bytes_written = match self.writer.write_replace(path, content.as_bytes()) {
            Ok(bytes) => bytes,
            Err(source) => {
                error!("Failed to write template {}: {}", confined.relative, source);
                let restored = match self.backups.rollback(&record) {
                    Ok(()) => true,
                    Err(e) => {
                        error!(
                            "Failed to roll back {} from backup {}: {}",
                            confined.relative, record.id, e
                        );
                        false
                    }
                };
                return Err(TemplateError::WriteFailed {
                    path: confined.relative,
                    source,
                    restored,
                });
            }
        };

        if let Err(e) = self.cache.invalidate(path) {
            warn!("Cache invalidation failed for {}: {}", confined.relative, e);
        }

        info!(
            "Updated template {} ({} bytes) by {}, backup {}",
            confined.relative, bytes_written, ctx.actor_id, record.id
        );
        Ok(UpdateResult {
            success: true,
            message: "Template updated successfully".to_string(),
            backup_created: record.id,
            bytes_written,
        })
    }
}
