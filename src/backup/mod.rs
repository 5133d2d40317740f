//! Backup management
//!
//! Timestamped copies taken before every destructive template write, the
//! ledger that records them, retention cleanup and the periodic job that
//! drives it.

pub mod clock;
pub mod results;
pub mod scheduler;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use results::{BackupFilter, BackupRecord, BackupStats};
pub use store::{BackupStore, CATEGORY_PRE_RESTORE, CATEGORY_TEMPLATE, LEDGER_KEY};
