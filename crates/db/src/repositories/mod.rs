use async_trait::async_trait;
use thiserror::Error;

use aisle_core::domain::order::{Order, StoredOrder, StoredOrderItem};
use aisle_core::domain::placement::{Placement, PlacementId};
use aisle_core::domain::product::StockCode;

pub mod orders;
pub mod placements;
pub mod sms;

pub use orders::SqlOrderRepository;
pub use placements::SqlPlacementRepository;
pub use sms::SqlSmsRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a placed order; returns the new order id. Only called after
    /// the checkout commit signal, never for partial placements.
    async fn store_order(&self, order: &Order) -> Result<i64, RepositoryError>;

    async fn load_order(
        &self,
        id: i64,
    ) -> Result<Option<(StoredOrder, Vec<StoredOrderItem>)>, RepositoryError>;

    async fn has_been_ordered(&self, stock_code: &StockCode) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait SmsRepository: Send + Sync {
    async fn store_message(&self, body: &str) -> Result<i64, RepositoryError>;

    /// Atomically select the newest unused message, parse it, and mark it
    /// used. A message without a parsable code stays unused.
    async fn consume_latest_code(&self) -> Result<Option<String>, RepositoryError>;
}

#[async_trait]
pub trait PlacementRepository: Send + Sync {
    async fn create(&self, placement: &Placement) -> Result<(), RepositoryError>;
    async fn mark_running(&self, id: &PlacementId) -> Result<(), RepositoryError>;
    async fn mark_placed(&self, id: &PlacementId, order_id: i64) -> Result<(), RepositoryError>;
    async fn mark_failed(&self, id: &PlacementId, error: &str) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &PlacementId) -> Result<Option<Placement>, RepositoryError>;
}
