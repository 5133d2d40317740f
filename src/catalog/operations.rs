//! Bulk catalog operations

use log::{info, warn};

use super::results::{BulkItem, BulkItemResult, BulkOperation, BulkResult, StockStatus};
use super::store::CatalogStore;
use crate::error::CatalogError;

/// Upper bound on items per bulk request
pub const MAX_BULK_ITEMS: usize = 100;

const PRODUCT_NOT_FOUND: &str = "Product not found";

/// Applies `operation` to every item in order.
///
/// `store` is `None` when the catalog integration is disabled. Limits and the
/// operation name are checked before any product is touched. Items without a
/// positive id are skipped and do not appear in the results.
pub fn bulk_update(
    store: Option<&dyn CatalogStore>,
    operation: &str,
    items: &[BulkItem],
) -> Result<BulkResult, CatalogError> {
    let store = store.ok_or(CatalogError::NotActive)?;

    if items.len() > MAX_BULK_ITEMS {
        return Err(CatalogError::TooManyItems {
            count: items.len(),
            max: MAX_BULK_ITEMS,
        });
    }

    let op = BulkOperation::parse(operation)
        .ok_or_else(|| CatalogError::InvalidOperation(operation.to_string()))?;

    let mut results = Vec::with_capacity(items.len());
    for item in items {
        let Some(id) = item.id.filter(|id| *id > 0) else {
            continue;
        };

        let Some(mut product) = store.find(id) else {
            warn!("Bulk {}: product {} not found", op.as_str(), id);
            results.push(BulkItemResult {
                id,
                success: false,
                error: Some(PRODUCT_NOT_FOUND.to_string()),
            });
            continue;
        };

        match op {
            BulkOperation::UpdatePrices => {
                if let Some(price) = item.regular_price {
                    product.regular_price = Some(price);
                }
                if let Some(price) = item.sale_price {
                    product.sale_price = Some(price);
                }
            }
            BulkOperation::UpdateStock => {
                let quantity = item.stock_quantity.unwrap_or(0);
                product.stock_quantity = Some(quantity);
                product.stock_status = StockStatus::for_quantity(quantity);
            }
        }

        store.save(product);
        results.push(BulkItemResult {
            id,
            success: true,
            error: None,
        });
    }

    info!(
        "Bulk {} processed {} of {} items",
        op.as_str(),
        results.len(),
        items.len()
    );
    Ok(BulkResult {
        operation: op.as_str().to_string(),
        processed: results.len(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::results::Product;
    use crate::catalog::store::MemoryCatalog;
    use serde_json::json;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::with_products([Product::new(10), Product::new(11)])
    }

    fn items(value: serde_json::Value) -> Vec<BulkItem> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn disabled_catalog_is_rejected_first() {
        let err = bulk_update(None, "bogus", &[]).unwrap_err();
        assert_eq!(err, CatalogError::NotActive);
    }

    #[test]
    fn more_than_limit_processes_nothing() {
        let store = catalog();
        let many = vec![
            BulkItem {
                id: Some(10),
                stock_quantity: Some(5),
                ..BulkItem::default()
            };
            MAX_BULK_ITEMS + 1
        ];

        let err = bulk_update(Some(&store), "update_stock", &many).unwrap_err();
        assert_eq!(
            err,
            CatalogError::TooManyItems {
                count: 101,
                max: 100
            }
        );
        assert_eq!(store.find(10).unwrap().stock_quantity, None);
    }

    #[test]
    fn unknown_operation_is_invalid() {
        let store = catalog();
        assert!(matches!(
            bulk_update(Some(&store), "delete_everything", &[]),
            Err(CatalogError::InvalidOperation(_))
        ));
    }

    #[test]
    fn prices_update_and_missing_products_are_reported() {
        let store = catalog();
        let batch = items(json!([
            {"id": 10, "regular_price": "19.90"},
            {"id": "11", "sale_price": 4.5},
            {"id": 0, "regular_price": 1},
            {"regular_price": 1},
            {"id": 99, "regular_price": 1}
        ]));

        let result = bulk_update(Some(&store), "update_prices", &batch).unwrap();
        assert_eq!(result.operation, "update_prices");
        assert_eq!(result.processed, 3);
        assert_eq!(
            result.results[2],
            BulkItemResult {
                id: 99,
                success: false,
                error: Some("Product not found".into())
            }
        );
        assert_eq!(store.find(10).unwrap().regular_price, Some(19.9));
        assert_eq!(store.find(11).unwrap().sale_price, Some(4.5));
        assert_eq!(store.find(11).unwrap().regular_price, None);
    }

    #[test]
    fn stock_update_derives_status() {
        let store = catalog();
        let batch = items(json!([
            {"id": 10, "stock_quantity": 3},
            {"id": 11}
        ]));

        bulk_update(Some(&store), "update_stock", &batch).unwrap();

        let stocked = store.find(10).unwrap();
        assert_eq!(stocked.stock_quantity, Some(3));
        assert_eq!(stocked.stock_status, StockStatus::InStock);

        let empty = store.find(11).unwrap();
        assert_eq!(empty.stock_quantity, Some(0));
        assert_eq!(empty.stock_status, StockStatus::OutOfStock);
    }
}
