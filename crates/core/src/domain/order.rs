use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, StockCode};

/// One resolved shopping-list entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: String,
    pub product: Product,
}

/// A resolved order: shopping-list item -> product, in resolution order.
///
/// Items are unique per order; re-inserting an item replaces its product in
/// place so the original position is kept. The cart is populated by iterating
/// lines in this order, one product per step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    lines: Vec<OrderLine>,
}

impl Order {
    pub fn insert(&mut self, item: impl Into<String>, product: Product) {
        let item = item.into();
        if let Some(line) = self.lines.iter_mut().find(|line| line.item == item) {
            line.product = product;
            return;
        }
        self.lines.push(OrderLine { item, product });
    }

    pub fn get(&self, item: &str) -> Option<&Product> {
        self.lines.iter().find(|line| line.item == item).map(|line| &line.product)
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl<'a> IntoIterator for &'a Order {
    type Item = &'a OrderLine;
    type IntoIter = std::slice::Iter<'a, OrderLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// Persisted projection of a placed order. Append-only, written only after
/// a placement succeeds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredOrder {
    pub id: i64,
    pub placed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredOrderItem {
    pub order_id: i64,
    pub item: String,
    pub product_name: String,
    pub stock_code: StockCode,
    pub price_total: Decimal,
    pub price_unit_measure: String,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::order::Order;
    use crate::domain::product::{Product, StockCode};

    fn product(stock_code: &str, name: &str) -> Product {
        Product {
            name: name.to_owned(),
            stock_code: StockCode(stock_code.to_owned()),
            price_total: Decimal::new(500, 2),
            price_unit_measure: "$5.00 / 1EA".to_owned(),
            is_available: true,
            is_purchasable: true,
        }
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut order = Order::default();
        order.insert("milk", product("101", "Full Cream Milk 2L"));
        order.insert("bread", product("202", "Wholemeal Bread"));
        order.insert("eggs", product("303", "Free Range Eggs 12pk"));

        let items: Vec<&str> = order.lines().iter().map(|line| line.item.as_str()).collect();
        assert_eq!(items, vec!["milk", "bread", "eggs"]);
    }

    #[test]
    fn reinserting_an_item_replaces_in_place() {
        let mut order = Order::default();
        order.insert("milk", product("101", "Full Cream Milk 2L"));
        order.insert("bread", product("202", "Wholemeal Bread"));
        order.insert("milk", product("104", "Lite Milk 2L"));

        assert_eq!(order.len(), 2);
        assert_eq!(order.lines()[0].item, "milk");
        assert_eq!(order.lines()[0].product.stock_code, StockCode("104".to_owned()));
        assert_eq!(order.get("milk").map(|p| p.name.as_str()), Some("Lite Milk 2L"));
    }
}
