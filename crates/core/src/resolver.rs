use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::order::Order;
use crate::domain::product::{Product, StockCode};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("catalog search failed: {0}")]
    Search(String),
    #[error("order history lookup failed: {0}")]
    History(String),
    #[error("recommendation failed: {0}")]
    Recommendation(String),
}

/// Retailer product search. An `Err` is a transport/decoding failure and is
/// distinct from `Ok(vec![])` (a search that genuinely found nothing).
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn search_products(&self, term: &str) -> Result<Vec<Product>, CapabilityError>;
}

/// Answers whether a stock code has appeared in any past order.
#[async_trait]
pub trait OrderHistory: Send + Sync {
    async fn has_been_ordered(&self, stock_code: &StockCode) -> Result<bool, CapabilityError>;
}

/// External knowledge-based selection over a candidate set. Returns
/// `Ok(None)` when the reply is malformed or names no candidate.
#[async_trait]
pub trait ProductRecommender: Send + Sync {
    async fn recommend(
        &self,
        item: &str,
        candidates: &[Product],
    ) -> Result<Option<StockCode>, CapabilityError>;
}

/// Which rule selected the product, in precedence order. Free deterministic
/// rules run first, paid inference last, and the fallback guarantees a
/// selection whenever any candidate exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchStrategy {
    ExactName,
    OrderHistory,
    Recommendation,
    FirstCandidate,
}

pub struct ProductResolver<C, H, R> {
    catalog: C,
    history: H,
    recommender: R,
}

impl<C, H, R> ProductResolver<C, H, R>
where
    C: ProductCatalog,
    H: OrderHistory,
    R: ProductRecommender,
{
    pub fn new(catalog: C, history: H, recommender: R) -> Self {
        Self { catalog, history, recommender }
    }

    /// Resolve a shopping list to an order. Items whose search fails or
    /// yields no candidates are dropped with a warning; the rest of the
    /// batch continues.
    pub async fn resolve(&self, shopping_list: &[String]) -> Order {
        let mut order = Order::default();

        for item in shopping_list {
            let candidates = match self.catalog.search_products(item).await {
                Ok(candidates) => candidates,
                Err(error) => {
                    warn!(
                        event_name = "resolver.search_failed",
                        item = %item,
                        error = %error,
                        "catalog search failed, dropping item"
                    );
                    continue;
                }
            };

            let Some((product, strategy)) = self.select(item, &candidates).await else {
                warn!(
                    event_name = "resolver.no_candidates",
                    item = %item,
                    "no purchasable products found, dropping item"
                );
                continue;
            };

            info!(
                event_name = "resolver.item_resolved",
                item = %item,
                stock_code = %product.stock_code,
                strategy = ?strategy,
                "shopping-list item resolved"
            );
            order.insert(item.clone(), product);
        }

        order
    }

    async fn select(
        &self,
        item: &str,
        candidates: &[Product],
    ) -> Option<(Product, MatchStrategy)> {
        if let Some(product) =
            candidates.iter().find(|candidate| candidate.name.to_lowercase() == item.to_lowercase())
        {
            return Some((product.clone(), MatchStrategy::ExactName));
        }

        for candidate in candidates {
            match self.history.has_been_ordered(&candidate.stock_code).await {
                Ok(true) => return Some((candidate.clone(), MatchStrategy::OrderHistory)),
                Ok(false) => {}
                Err(error) => {
                    warn!(
                        event_name = "resolver.history_lookup_failed",
                        item = %item,
                        stock_code = %candidate.stock_code,
                        error = %error,
                        "order history lookup failed, skipping candidate"
                    );
                }
            }
        }

        match self.recommender.recommend(item, candidates).await {
            Ok(Some(stock_code)) => {
                if let Some(product) =
                    candidates.iter().find(|candidate| candidate.stock_code == stock_code)
                {
                    return Some((product.clone(), MatchStrategy::Recommendation));
                }
                debug!(
                    event_name = "resolver.recommendation_unmatched",
                    item = %item,
                    stock_code = %stock_code,
                    "recommended stock code names no candidate"
                );
            }
            Ok(None) => {}
            Err(error) => {
                warn!(
                    event_name = "resolver.recommendation_failed",
                    item = %item,
                    error = %error,
                    "recommendation failed, falling back to first candidate"
                );
            }
        }

        candidates.first().map(|product| (product.clone(), MatchStrategy::FirstCandidate))
    }
}
