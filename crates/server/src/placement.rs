use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use aisle_agent::{LlmProductRecommender, OllamaChatClient};
use aisle_core::domain::placement::PlacementId;
use aisle_core::domain::product::Product;
use aisle_core::resolver::{CapabilityError, ProductCatalog, ProductResolver};
use aisle_db::repositories::{
    OrderRepository, PlacementRepository, SqlOrderRepository, SqlPlacementRepository,
};
use aisle_db::DbPool;
use aisle_retailer::Supermarket;

const PLACEMENT_QUEUE_DEPTH: usize = 16;

#[derive(Debug)]
pub struct PlacementJob {
    pub placement_id: PlacementId,
    pub shopping_list: Vec<String>,
}

/// Adapts the retailer capability to the resolver's catalog seam.
pub struct SupermarketCatalog(pub Arc<dyn Supermarket>);

#[async_trait]
impl ProductCatalog for SupermarketCatalog {
    async fn search_products(&self, term: &str) -> Result<Vec<Product>, CapabilityError> {
        self.0
            .search_products(term)
            .await
            .map_err(|error| CapabilityError::Search(error.to_string()))
    }
}

pub struct PlacementWorker {
    resolver:
        ProductResolver<SupermarketCatalog, SqlOrderRepository, LlmProductRecommender<OllamaChatClient>>,
    supermarket: Arc<dyn Supermarket>,
    orders: SqlOrderRepository,
    placements: SqlPlacementRepository,
    deadline: Duration,
}

impl PlacementWorker {
    pub fn new(
        db_pool: DbPool,
        supermarket: Arc<dyn Supermarket>,
        recommender: LlmProductRecommender<OllamaChatClient>,
        deadline: Duration,
    ) -> Self {
        let resolver = ProductResolver::new(
            SupermarketCatalog(Arc::clone(&supermarket)),
            SqlOrderRepository::new(db_pool.clone()),
            recommender,
        );

        Self {
            resolver,
            supermarket,
            orders: SqlOrderRepository::new(db_pool.clone()),
            placements: SqlPlacementRepository::new(db_pool),
            deadline,
        }
    }

    async fn process(&self, job: PlacementJob) {
        info!(
            event_name = "placement.started",
            placement_id = %job.placement_id,
            items = job.shopping_list.len(),
            "background placement started"
        );
        if let Err(repo_error) = self.placements.mark_running(&job.placement_id).await {
            warn!(
                event_name = "placement.status_update_failed",
                placement_id = %job.placement_id,
                error = %repo_error,
                "could not mark placement running"
            );
        }

        match tokio::time::timeout(self.deadline, self.place(&job)).await {
            Ok(Ok(order_id)) => {
                if let Err(repo_error) =
                    self.placements.mark_placed(&job.placement_id, order_id).await
                {
                    warn!(
                        event_name = "placement.status_update_failed",
                        placement_id = %job.placement_id,
                        error = %repo_error,
                        "could not mark placement placed"
                    );
                }
                info!(
                    event_name = "placement.succeeded",
                    placement_id = %job.placement_id,
                    order_id,
                    "order processed and stored"
                );
            }
            Ok(Err(place_error)) => {
                self.record_failure(&job.placement_id, &place_error.to_string()).await;
            }
            Err(_elapsed) => {
                self.record_failure(&job.placement_id, "placement deadline exceeded").await;
            }
        }
    }

    async fn place(&self, job: &PlacementJob) -> anyhow::Result<i64> {
        let order = self.resolver.resolve(&job.shopping_list).await;
        if order.is_empty() {
            anyhow::bail!("no shopping-list items could be resolved to products");
        }

        self.supermarket.place_order(&order).await?;
        let order_id = self.orders.store_order(&order).await?;
        Ok(order_id)
    }

    async fn record_failure(&self, placement_id: &PlacementId, reason: &str) {
        error!(
            event_name = "placement.failed",
            placement_id = %placement_id,
            error = %reason,
            "order placement failed"
        );
        if let Err(repo_error) = self.placements.mark_failed(placement_id, reason).await {
            warn!(
                event_name = "placement.status_update_failed",
                placement_id = %placement_id,
                error = %repo_error,
                "could not mark placement failed"
            );
        }
    }
}

/// Start the single placement worker. One worker drains the queue, so
/// placements against the one retailer account never overlap on cart or
/// 2FA state.
pub fn spawn(worker: PlacementWorker) -> mpsc::Sender<PlacementJob> {
    let (jobs, mut queue) = mpsc::channel::<PlacementJob>(PLACEMENT_QUEUE_DEPTH);

    tokio::spawn(async move {
        while let Some(job) = queue.recv().await {
            worker.process(job).await;
        }
    });

    jobs
}
