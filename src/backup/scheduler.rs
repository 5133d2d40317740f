//! Periodic retention cleanup

use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::store::BackupStore;
use crate::config::SharedRuntimeConfig;

/// Spawns a task that runs [`BackupStore::cleanup`] every `interval` with the
/// retention currently set in the runtime configuration.
///
/// The first run happens one full interval after startup.
pub fn spawn_cleanup_task(
    store: Arc<BackupStore>,
    runtime: SharedRuntimeConfig,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            run_cleanup(&store, &runtime).await;
        }
    })
}

/// One cleanup pass over every category
pub async fn run_cleanup(store: &Arc<BackupStore>, runtime: &SharedRuntimeConfig) -> usize {
    let retention_days = runtime.read().await.backup_retention_days;
    let store = Arc::clone(store);

    match tokio::task::spawn_blocking(move || store.cleanup(retention_days, None)).await {
        Ok(Ok(deleted)) => {
            info!("Scheduled cleanup finished: {deleted} backups deleted");
            deleted
        }
        Ok(Err(e)) => {
            error!("Scheduled backup cleanup failed: {e}");
            0
        }
        Err(e) => {
            error!("Scheduled backup cleanup task panicked: {e}");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{CATEGORY_TEMPLATE, ManualClock};
    use crate::config::RuntimeConfig;
    use crate::ledger::MemoryStore;
    use std::fs;
    use tempfile::TempDir;
    use tokio::sync::RwLock;

    #[tokio::test]
    async fn cleanup_uses_runtime_retention() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("header.php");
        fs::write(&source, "<header></header>").unwrap();

        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let store = Arc::new(BackupStore::with_clock(
            dir.path().join("backups"),
            Arc::new(MemoryStore::default()),
            clock.clone(),
        ));
        store.create(&source, CATEGORY_TEMPLATE, "admin").unwrap();
        clock.advance(3 * 86_400);

        let runtime = Arc::new(RwLock::new(RuntimeConfig::default()));
        assert_eq!(run_cleanup(&store, &runtime).await, 0);

        runtime.write().await.backup_retention_days = 2;
        assert_eq!(run_cleanup(&store, &runtime).await, 1);
        assert_eq!(store.stats().unwrap().total_count, 0);
    }
}
