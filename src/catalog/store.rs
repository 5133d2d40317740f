//! Catalog storage

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::results::Product;

/// Product lookup and persistence used by bulk operations
pub trait CatalogStore: Send + Sync {
    fn find(&self, id: u64) -> Option<Product>;
    fn save(&self, product: Product);
}

/// Catalog held in process memory
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<u64, Product>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: RwLock::new(products.into_iter().map(|p| (p.id, p)).collect()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<u64, Product>> {
        self.products.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<u64, Product>> {
        self.products.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CatalogStore for MemoryCatalog {
    fn find(&self, id: u64) -> Option<Product> {
        self.read().get(&id).cloned()
    }

    fn save(&self, product: Product) {
        self.write().insert(product.id, product);
    }
}
