use aisle_core::chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use aisle_core::domain::order::{Order, StoredOrder, StoredOrderItem};
use aisle_core::domain::product::StockCode;
use aisle_core::resolver::{CapabilityError, OrderHistory};

use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn store_order(&self, order: &Order) -> Result<i64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let placed_at = Utc::now().to_rfc3339();

        let inserted = sqlx::query("INSERT INTO orders (placed_at) VALUES (?)")
            .bind(&placed_at)
            .execute(&mut *tx)
            .await?;
        let order_id = inserted.last_insert_rowid();

        for line in order.lines() {
            sqlx::query(
                "INSERT INTO order_items (
                    order_id,
                    item,
                    product_name,
                    stock_code,
                    price_total,
                    price_unit_measure
                 ) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(order_id)
            .bind(&line.item)
            .bind(&line.product.name)
            .bind(&line.product.stock_code.0)
            .bind(line.product.price_total.to_string())
            .bind(&line.product.price_unit_measure)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(order_id)
    }

    async fn load_order(
        &self,
        id: i64,
    ) -> Result<Option<(StoredOrder, Vec<StoredOrderItem>)>, RepositoryError> {
        let row = sqlx::query("SELECT id, placed_at FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };

        let order = StoredOrder { id: row.get("id"), placed_at: parse_timestamp(&row, "placed_at")? };

        let items = sqlx::query(
            "SELECT order_id, item, product_name, stock_code, price_total, price_unit_measure
             FROM order_items
             WHERE order_id = ?
             ORDER BY id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(item_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some((order, items)))
    }

    async fn has_been_ordered(&self, stock_code: &StockCode) -> Result<bool, RepositoryError> {
        let row = sqlx::query(
            "SELECT id FROM order_items WHERE stock_code = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(&stock_code.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }
}

#[async_trait::async_trait]
impl OrderHistory for SqlOrderRepository {
    async fn has_been_ordered(&self, stock_code: &StockCode) -> Result<bool, CapabilityError> {
        OrderRepository::has_been_ordered(self, stock_code)
            .await
            .map_err(|error| CapabilityError::History(error.to_string()))
    }
}

fn item_from_row(row: SqliteRow) -> Result<StoredOrderItem, RepositoryError> {
    let price_raw: String = row.get("price_total");
    let price_total = price_raw
        .parse::<Decimal>()
        .map_err(|error| RepositoryError::Decode(format!("invalid price_total: {error}")))?;

    Ok(StoredOrderItem {
        order_id: row.get("order_id"),
        item: row.get("item"),
        product_name: row.get("product_name"),
        stock_code: StockCode(row.get("stock_code")),
        price_total,
        price_unit_measure: row.get("price_unit_measure"),
    })
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = row.get(column);
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid {column}: {error}")))
}
