//! Catalog types
//!
//! Products as the bulk endpoint sees them, plus the request and result
//! shapes of a bulk operation.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn for_quantity(quantity: i64) -> Self {
        if quantity > 0 {
            StockStatus::InStock
        } else {
            StockStatus::OutOfStock
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub regular_price: Option<f64>,
    pub sale_price: Option<f64>,
    pub stock_quantity: Option<i64>,
    pub stock_status: StockStatus,
}

impl Product {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            regular_price: None,
            sale_price: None,
            stock_quantity: None,
            stock_status: StockStatus::InStock,
        }
    }
}

/// Supported bulk operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    UpdatePrices,
    UpdateStock,
}

impl BulkOperation {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "update_prices" => Some(BulkOperation::UpdatePrices),
            "update_stock" => Some(BulkOperation::UpdateStock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BulkOperation::UpdatePrices => "update_prices",
            BulkOperation::UpdateStock => "update_stock",
        }
    }
}

/// One requested change. Numbers may arrive as JSON numbers or strings;
/// anything unparseable counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BulkItem {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub regular_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sale_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub stock_quantity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkItemResult {
    pub id: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkResult {
    pub operation: String,
    pub processed: usize,
    pub results: Vec<BulkItemResult>,
}

fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_from(&value).filter(|n| n.is_finite()))
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        other => number_from(other).map(|f| f.trunc() as i64),
    })
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(lenient_i64(deserializer)?.and_then(|n| u64::try_from(n).ok()))
}
