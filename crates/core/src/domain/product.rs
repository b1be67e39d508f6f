use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Retailer-assigned opaque product identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockCode(pub String);

impl std::fmt::Display for StockCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub stock_code: StockCode,
    pub price_total: Decimal,
    pub price_unit_measure: String,
    pub is_available: bool,
    pub is_purchasable: bool,
}

impl Product {
    /// Both availability flags must be set for a product to be resolvable.
    pub fn is_orderable(&self) -> bool {
        self.is_available && self.is_purchasable
    }
}
