//! Backup store
//!
//! Owns the backup directory tree and the ledger. A backup file is written
//! once and never modified; it disappears only through retention cleanup.
//! Files on disk without a ledger entry are orphans and are ignored.
//!
//! Ledger updates are read-modify-write cycles serialized by a process-wide
//! mutex and committed with compare-and-set, retried when a writer in
//! another process got there first.

use chrono::DateTime;
use log::{debug, info, warn};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::clock::{Clock, SystemClock};
use super::results::{BackupFilter, BackupRecord, BackupStats};
use crate::error::{BackupError, LedgerError};
use crate::ledger::KeyValueStore;
use crate::storage::filesystem::{
    create_directory, ensure_protected_directory, file_exists, file_size,
};

/// Ledger key holding the list of backup records
pub const LEDGER_KEY: &str = "backups";
/// Category for copies taken before a template update
pub const CATEGORY_TEMPLATE: &str = "template";
/// Category for copies taken before a restore overwrites a file
pub const CATEGORY_PRE_RESTORE: &str = "pre-restore";

const MAX_LEDGER_ATTEMPTS: usize = 16;
const SECONDS_PER_DAY: i64 = 86_400;
const TOKEN_LENGTH: usize = 8;

pub struct BackupStore {
    root: PathBuf,
    ledger: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ledger_guard: Mutex<()>,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>, ledger: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(root, ledger, Arc::new(SystemClock))
    }

    pub fn with_clock(
        root: impl Into<PathBuf>,
        ledger: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            root: root.into(),
            ledger,
            clock,
            ledger_guard: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copies `file_path` into the category directory and records it.
    pub fn create(
        &self,
        file_path: &Path,
        category: &str,
        actor_id: &str,
    ) -> Result<BackupRecord, BackupError> {
        if !file_exists(file_path) {
            return Err(BackupError::SourceNotFound(file_path.to_path_buf()));
        }

        ensure_protected_directory(&self.root)?;
        let category = sanitize_segment(category, "general");
        let category_dir = self.root.join(&category);
        create_directory(&category_dir)?;

        let created_at = self.clock.now();
        let (id, backup_path) = copy_to_fresh_file(file_path, &category_dir, created_at)?;

        let record = BackupRecord {
            id,
            original_path: file_path.to_path_buf(),
            backup_path,
            category,
            created_at,
            actor_id: actor_id.to_string(),
        };

        if let Err(e) = self.update_ledger(|records| records.push(record.clone())) {
            // Unrecorded copies would be orphans
            let _ = fs::remove_file(&record.backup_path);
            return Err(e.into());
        }

        info!(
            "Created {} backup {} of {} for actor {}",
            record.category,
            record.id,
            record.original_path.display(),
            record.actor_id
        );
        Ok(record)
    }

    /// Copies a recorded backup back over `target`, or over the file it was
    /// taken from. The current content of the target is itself backed up
    /// under `pre-restore` first.
    pub fn restore(
        &self,
        backup: &str,
        target: Option<&Path>,
        actor_id: &str,
    ) -> Result<PathBuf, BackupError> {
        let record = self.find(backup)?;
        if !file_exists(&record.backup_path) {
            return Err(BackupError::BackupFileMissing(record.backup_path));
        }

        let target = target
            .map(Path::to_path_buf)
            .unwrap_or_else(|| record.original_path.clone());

        if target.exists() {
            self.create(&target, CATEGORY_PRE_RESTORE, actor_id)
                .map_err(|e| BackupError::PreRestoreFailed(Box::new(e)))?;
        }

        fs::copy(&record.backup_path, &target)
            .map_err(|e| BackupError::CopyFailed(target.clone(), e))?;

        info!(
            "Restored backup {} onto {} for actor {}",
            record.id,
            target.display(),
            actor_id
        );
        Ok(target)
    }

    /// Puts a just-taken backup back onto its original file after a failed
    /// write. The damaged content is not worth a pre-restore copy.
    pub fn rollback(&self, record: &BackupRecord) -> Result<(), BackupError> {
        if !file_exists(&record.backup_path) {
            return Err(BackupError::BackupFileMissing(record.backup_path.clone()));
        }
        fs::copy(&record.backup_path, &record.original_path)
            .map_err(|e| BackupError::CopyFailed(record.original_path.clone(), e))?;
        warn!(
            "Rolled back {} from backup {}",
            record.original_path.display(),
            record.id
        );
        Ok(())
    }

    /// Recorded backups matching `filter`, newest first.
    pub fn list(&self, filter: &BackupFilter) -> Result<Vec<BackupRecord>, BackupError> {
        let (_, records) = self.load()?;
        let mut matching: Vec<BackupRecord> =
            records.into_iter().filter(|r| filter.matches(r)).collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(matching)
    }

    /// Drops records older than `retention_days`, optionally only inside
    /// `category`, and deletes their files. Returns the number of records
    /// removed.
    pub fn cleanup(
        &self,
        retention_days: u32,
        category: Option<&str>,
    ) -> Result<usize, BackupError> {
        let cutoff = self.clock.now() - i64::from(retention_days) * SECONDS_PER_DAY;

        let removed = self.update_ledger(|records| {
            let (expired, kept): (Vec<BackupRecord>, Vec<BackupRecord>) =
                std::mem::take(records).into_iter().partition(|record| {
                    category.is_none_or(|c| record.category == c) && record.created_at < cutoff
                });
            *records = kept;
            expired
        })?;

        for record in &removed {
            match fs::remove_file(&record.backup_path) {
                Ok(()) => debug!("Deleted expired backup {}", record.backup_path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    "Failed to delete expired backup {}: {}",
                    record.backup_path.display(),
                    e
                ),
            }
        }

        info!(
            "Backup cleanup removed {} backups older than {} days",
            removed.len(),
            retention_days
        );
        Ok(removed.len())
    }

    pub fn stats(&self) -> Result<BackupStats, BackupError> {
        let (_, records) = self.load()?;
        let mut stats = BackupStats {
            total_count: records.len(),
            ..BackupStats::default()
        };

        for record in &records {
            *stats
                .count_by_category
                .entry(record.category.clone())
                .or_default() += 1;
            stats.total_bytes += file_size(&record.backup_path);
            stats.oldest_timestamp = Some(
                stats
                    .oldest_timestamp
                    .map_or(record.created_at, |t| t.min(record.created_at)),
            );
            stats.newest_timestamp = Some(
                stats
                    .newest_timestamp
                    .map_or(record.created_at, |t| t.max(record.created_at)),
            );
        }

        Ok(stats)
    }

    /// Looks a record up by id or by backup path
    pub fn find(&self, backup: &str) -> Result<BackupRecord, BackupError> {
        let (_, records) = self.load()?;
        records
            .into_iter()
            .find(|r| r.id == backup || r.backup_path == Path::new(backup))
            .ok_or_else(|| BackupError::BackupNotFound(backup.to_string()))
    }

    fn load(&self) -> Result<(Option<Value>, Vec<BackupRecord>), LedgerError> {
        let raw = self.ledger.get(LEDGER_KEY)?;
        let records = match &raw {
            Some(value) => serde_json::from_value(value.clone())?,
            None => Vec::new(),
        };
        Ok((raw, records))
    }

    fn update_ledger<T>(
        &self,
        mut mutate: impl FnMut(&mut Vec<BackupRecord>) -> T,
    ) -> Result<T, LedgerError> {
        let _guard = self
            .ledger_guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for attempt in 1..=MAX_LEDGER_ATTEMPTS {
            let (raw, mut records) = self.load()?;
            let outcome = mutate(&mut records);
            let updated = serde_json::to_value(&records)?;

            if self
                .ledger
                .compare_and_set(LEDGER_KEY, raw.as_ref(), updated)?
            {
                return Ok(outcome);
            }
            debug!("Ledger changed during update, retrying (attempt {attempt})");
        }

        Err(LedgerError::Contended(LEDGER_KEY.to_string()))
    }
}

/// Keeps `[A-Za-z0-9_-]`, replacing everything else
fn sanitize_segment(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// `{stem}_{YYYY-MM-DD_HH-MM-SS}_{token}.{ext}.backup`
fn backup_file_name(source: &Path, created_at: i64) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = sanitize_segment(&stem, "file");

    let timestamp = DateTime::from_timestamp(created_at, 0)
        .map(|t| t.format("%Y-%m-%d_%H-%M-%S").to_string())
        .unwrap_or_else(|| created_at.to_string());

    let token = random_token();
    match source.extension() {
        Some(ext) => format!(
            "{}_{}_{}.{}.backup",
            stem,
            timestamp,
            token,
            sanitize_segment(&ext.to_string_lossy(), "bin")
        ),
        None => format!("{}_{}_{}.backup", stem, timestamp, token),
    }
}

/// Copies `source` into a file that did not exist before, so an existing
/// backup can never be overwritten.
fn copy_to_fresh_file(
    source: &Path,
    dir: &Path,
    created_at: i64,
) -> Result<(String, PathBuf), BackupError> {
    let mut input =
        File::open(source).map_err(|e| BackupError::CopyFailed(source.to_path_buf(), e))?;

    let (name, path, mut output) = loop {
        let name = backup_file_name(source, created_at);
        let path = dir.join(&name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => break (name, path, file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(BackupError::CopyFailed(source.to_path_buf(), e)),
        }
    };

    if let Err(e) = io::copy(&mut input, &mut output).and_then(|_| output.sync_all()) {
        let _ = fs::remove_file(&path);
        return Err(BackupError::CopyFailed(source.to_path_buf(), e));
    }

    Ok((name, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::clock::ManualClock;
    use crate::ledger::MemoryStore;
    use std::thread;
    use tempfile::TempDir;

    const DAY: i64 = SECONDS_PER_DAY;
    const START: i64 = 1_700_000_000;

    struct Fixture {
        _dir: TempDir,
        theme: PathBuf,
        store: BackupStore,
        clock: Arc<ManualClock>,
        ledger: Arc<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let theme = dir.path().join("theme");
        fs::create_dir_all(&theme).unwrap();
        let clock = Arc::new(ManualClock::new(START));
        let ledger = Arc::new(MemoryStore::new());
        let store = BackupStore::with_clock(
            dir.path().join("backups"),
            ledger.clone(),
            clock.clone(),
        );
        Fixture {
            _dir: dir,
            theme,
            store,
            clock,
            ledger,
        }
    }

    fn template(fx: &Fixture, name: &str, content: &str) -> PathBuf {
        let path = fx.theme.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn create_copies_bytes_and_records_metadata() {
        let fx = fixture();
        let source = template(&fx, "header.php", "<?php get_header();");

        let record = fx.store.create(&source, "template", "7").unwrap();

        assert_eq!(fs::read_to_string(&record.backup_path).unwrap(), "<?php get_header();");
        assert_eq!(record.category, "template");
        assert_eq!(record.actor_id, "7");
        assert_eq!(record.created_at, START);
        assert!(record.backup_path.starts_with(fx.store.root().join("template")));
        assert!(record.id.starts_with("header_2023-11-14_22-13-20_"));
        assert!(record.id.ends_with(".php.backup"));
        assert!(fx.store.root().join(".htaccess").exists());
        assert_eq!(fx.store.list(&BackupFilter::default()).unwrap(), vec![record]);
    }

    #[test]
    fn create_fails_for_missing_source_without_touching_ledger() {
        let fx = fixture();
        let missing = fx.theme.join("missing.php");

        assert!(matches!(
            fx.store.create(&missing, "template", "1"),
            Err(BackupError::SourceNotFound(_))
        ));
        assert_eq!(fx.ledger.get(LEDGER_KEY).unwrap(), None);
    }

    #[test]
    fn backups_taken_in_the_same_second_get_distinct_paths() {
        let fx = fixture();
        let source = template(&fx, "index.php", "v1");

        let first = fx.store.create(&source, "template", "1").unwrap();
        let second = fx.store.create(&source, "template", "1").unwrap();

        assert_ne!(first.backup_path, second.backup_path);
        assert_eq!(fx.store.stats().unwrap().total_count, 2);
    }

    #[test]
    fn category_is_sanitized_into_a_single_directory() {
        let fx = fixture();
        let source = template(&fx, "index.php", "v1");

        let record = fx.store.create(&source, "../escape", "1").unwrap();

        assert_eq!(record.category, "___escape");
        assert!(record.backup_path.starts_with(fx.store.root()));
    }

    #[test]
    fn restore_takes_pre_restore_backup_then_copies() {
        let fx = fixture();
        let source = template(&fx, "footer.php", "original");
        let record = fx.store.create(&source, "template", "1").unwrap();
        fs::write(&source, "edited").unwrap();

        let restored_to = fx.store.restore(&record.id, None, "2").unwrap();

        assert_eq!(restored_to, source);
        assert_eq!(fs::read_to_string(&source).unwrap(), "original");

        let pre_restore = fx
            .store
            .list(&BackupFilter {
                category: Some(CATEGORY_PRE_RESTORE.into()),
                ..BackupFilter::default()
            })
            .unwrap();
        assert_eq!(pre_restore.len(), 1);
        assert_eq!(fs::read_to_string(&pre_restore[0].backup_path).unwrap(), "edited");
        assert_eq!(pre_restore[0].actor_id, "2");
    }

    #[test]
    fn restore_accepts_backup_path_and_explicit_target() {
        let fx = fixture();
        let source = template(&fx, "page.php", "page body");
        let record = fx.store.create(&source, "template", "1").unwrap();
        let target = fx.theme.join("page-copy.php");

        let restored_to = fx
            .store
            .restore(&record.backup_path.to_string_lossy(), Some(&target), "1")
            .unwrap();

        assert_eq!(restored_to, target);
        assert_eq!(fs::read_to_string(&target).unwrap(), "page body");
        // Target did not exist, so no pre-restore copy
        assert_eq!(fx.store.stats().unwrap().total_count, 1);
    }

    #[test]
    fn restore_of_unrecorded_backup_fails() {
        let fx = fixture();
        let orphan = fx.store.root().join("template").join("orphan.php.backup");
        fs::create_dir_all(orphan.parent().unwrap()).unwrap();
        fs::write(&orphan, "orphan").unwrap();

        assert!(matches!(
            fx.store.restore(&orphan.to_string_lossy(), Some(&fx.theme.join("x.php")), "1"),
            Err(BackupError::BackupNotFound(_))
        ));
    }

    #[test]
    fn restore_fails_when_backup_file_is_gone() {
        let fx = fixture();
        let source = template(&fx, "single.php", "v1");
        let record = fx.store.create(&source, "template", "1").unwrap();
        fs::remove_file(&record.backup_path).unwrap();

        assert!(matches!(
            fx.store.restore(&record.id, None, "1"),
            Err(BackupError::BackupFileMissing(_))
        ));
    }

    #[test]
    fn list_is_newest_first_with_conjunctive_filters() {
        let fx = fixture();
        let source = template(&fx, "index.php", "v1");

        let oldest = fx.store.create(&source, "template", "1").unwrap();
        fx.clock.advance(DAY);
        let middle = fx.store.create(&source, "pre-restore", "1").unwrap();
        fx.clock.advance(DAY);
        let newest = fx.store.create(&source, "template", "1").unwrap();

        let all = fx.store.list(&BackupFilter::default()).unwrap();
        assert_eq!(all, vec![newest.clone(), middle, oldest.clone()]);

        let filtered = fx
            .store
            .list(&BackupFilter {
                category: Some("template".into()),
                from_time: Some(START),
                to_time: Some(START + DAY),
            })
            .unwrap();
        assert_eq!(filtered, vec![oldest]);
    }

    #[test]
    fn cleanup_removes_expired_records_and_files_and_is_idempotent() {
        let fx = fixture();
        let source = template(&fx, "index.php", "v1");
        let expired = fx.store.create(&source, "template", "1").unwrap();
        fx.clock.advance(5 * DAY);
        let recent = fx.store.create(&source, "template", "1").unwrap();
        fx.clock.advance(3 * DAY);

        assert_eq!(fx.store.cleanup(7, None).unwrap(), 1);
        assert!(!expired.backup_path.exists());
        assert!(recent.backup_path.exists());
        let survivors = fx.store.list(&BackupFilter::default()).unwrap();
        assert_eq!(survivors, vec![recent]);

        assert_eq!(fx.store.cleanup(7, None).unwrap(), 0);
        assert_eq!(fx.store.list(&BackupFilter::default()).unwrap(), survivors);
    }

    #[test]
    fn cleanup_with_category_leaves_other_categories_alone() {
        let fx = fixture();
        let source = template(&fx, "index.php", "v1");
        fx.store.create(&source, "template", "1").unwrap();
        let pre_restore = fx.store.create(&source, "pre-restore", "1").unwrap();
        fx.clock.advance(30 * DAY);

        assert_eq!(fx.store.cleanup(7, Some("template")).unwrap(), 1);
        assert_eq!(
            fx.store.list(&BackupFilter::default()).unwrap(),
            vec![pre_restore]
        );
    }

    #[test]
    fn cleanup_drops_records_whose_file_already_vanished() {
        let fx = fixture();
        let source = template(&fx, "index.php", "v1");
        let record = fx.store.create(&source, "template", "1").unwrap();
        fs::remove_file(&record.backup_path).unwrap();
        fx.clock.advance(8 * DAY);

        assert_eq!(fx.store.cleanup(7, None).unwrap(), 1);
        assert_eq!(fx.store.stats().unwrap().total_count, 0);
    }

    #[test]
    fn stats_count_by_category_and_ignore_missing_files_for_size() {
        let fx = fixture();
        let source = template(&fx, "index.php", "12345");
        for _ in 0..3 {
            fx.store.create(&source, "template", "1").unwrap();
            fx.clock.advance(60);
        }
        let pre_restore = fx.store.create(&source, "pre-restore", "1").unwrap();
        fs::remove_file(&pre_restore.backup_path).unwrap();

        let stats = fx.store.stats().unwrap();

        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.count_by_category.get("template"), Some(&3));
        assert_eq!(stats.count_by_category.get("pre-restore"), Some(&1));
        assert_eq!(stats.total_bytes, 15);
        assert_eq!(stats.oldest_timestamp, Some(START));
        assert_eq!(stats.newest_timestamp, Some(START + 180));
    }

    #[test]
    fn orphaned_files_are_not_surfaced() {
        let fx = fixture();
        let source = template(&fx, "index.php", "v1");
        fx.store.create(&source, "template", "1").unwrap();
        fs::write(fx.store.root().join("template").join("stray.php.backup"), "x").unwrap();

        assert_eq!(fx.store.list(&BackupFilter::default()).unwrap().len(), 1);
        assert_eq!(fx.store.stats().unwrap().total_count, 1);
    }

    #[test]
    fn concurrent_creates_never_lose_ledger_records() {
        let fx = fixture();
        let source = template(&fx, "index.php", "shared");
        let store = Arc::new(fx.store);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                let source = source.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        store
                            .create(&source, "template", &worker.to_string())
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.stats().unwrap().total_count, 40);
    }

    #[test]
    fn file_name_without_extension() {
        let name = backup_file_name(Path::new("/srv/theme/LICENSE"), START);
        assert!(name.starts_with("LICENSE_2023-11-14_22-13-20_"));
        assert!(name.ends_with(".backup"));
        assert!(!name.contains(".."));
    }
}
