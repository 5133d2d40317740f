//! Product catalog
//!
//! Bulk price and stock updates over an injected catalog store.

pub mod operations;
pub mod results;
pub mod store;

pub use operations::{MAX_BULK_ITEMS, bulk_update};
pub use results::{BulkItem, BulkItemResult, BulkOperation, BulkResult, Product, StockStatus};
pub use store::{CatalogStore, MemoryCatalog};
