use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aisle_core::config::RetailerConfig;
use aisle_core::domain::product::{Product, StockCode};

use crate::RetailerError;

const SEARCH_PAGE_SIZE: u32 = 24;
const SORT_TRADER_RELEVANCE: &str = "TraderRelevance";
const EXCLUDE_UNTRACEABLE_VENDORS: &str = "UntraceableVendors";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Client for the retailer's product search API. Search failures are
/// `Err(...)`, distinct from a search that found nothing.
pub struct CatalogClient {
    http: reqwest::Client,
    store_url: String,
    search_url: String,
}

impl CatalogClient {
    pub fn new(config: &RetailerConfig) -> Result<Self, RetailerError> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let store_url = config.store_url.trim_end_matches('/').to_owned();
        let search_url = format!("{store_url}/apis/ui/Search/products");

        Ok(Self { http, store_url, search_url })
    }

    /// Fetch the store homepage so the cookie jar carries a session before
    /// the first search call.
    pub async fn prime_session(&self) -> Result<(), RetailerError> {
        let response = self.http.get(&self.store_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RetailerError::UnexpectedStatus(status.as_u16()));
        }
        Ok(())
    }

    pub async fn search_products(&self, term: &str) -> Result<Vec<Product>, RetailerError> {
        let request = SearchRequest {
            filters: Vec::new(),
            page_number: 1,
            page_size: SEARCH_PAGE_SIZE,
            search_term: term,
            sort_type: SORT_TRADER_RELEVANCE,
            exclude_search_types: vec![EXCLUDE_UNTRACEABLE_VENDORS],
        };

        let response = self.http.post(&self.search_url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RetailerError::UnexpectedStatus(status.as_u16()));
        }

        let payload: SearchResponse = response
            .json()
            .await
            .map_err(|error| RetailerError::MalformedResponse(error.to_string()))?;

        Ok(products_from_response(payload))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SearchRequest<'a> {
    filters: Vec<serde_json::Value>,
    page_number: u32,
    page_size: u32,
    search_term: &'a str,
    sort_type: &'a str,
    exclude_search_types: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResponse {
    #[serde(default)]
    products: Vec<SearchResult>,
}

/// One search hit: the retailer nests variant tiles per result and the
/// last tile carries the current pricing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResult {
    #[serde(default)]
    products: Vec<ProductTile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProductTile {
    display_name: String,
    stockcode: i64,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    cup_string: Option<String>,
    #[serde(default)]
    is_available: bool,
    #[serde(default)]
    is_purchasable: bool,
}

fn products_from_response(payload: SearchResponse) -> Vec<Product> {
    payload
        .products
        .into_iter()
        .filter_map(|result| {
            let tile = result.products.into_iter().last()?;
            let product = Product {
                name: tile.display_name,
                stock_code: StockCode(tile.stockcode.to_string()),
                price_total: tile.price.unwrap_or_default(),
                price_unit_measure: tile.cup_string.unwrap_or_default(),
                is_available: tile.is_available,
                is_purchasable: tile.is_purchasable,
            };
            product.is_orderable().then_some(product)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::catalog::{products_from_response, SearchRequest, SearchResponse};

    fn decode(raw: &str) -> SearchResponse {
        serde_json::from_str(raw).expect("fixture should decode")
    }

    #[test]
    fn request_body_matches_search_api_shape() {
        let request = SearchRequest {
            filters: Vec::new(),
            page_number: 1,
            page_size: 24,
            search_term: "milk",
            sort_type: "TraderRelevance",
            exclude_search_types: vec!["UntraceableVendors"],
        };

        let encoded = serde_json::to_value(&request).expect("request should encode");
        assert_eq!(
            encoded,
            serde_json::json!({
                "Filters": [],
                "PageNumber": 1,
                "PageSize": 24,
                "SearchTerm": "milk",
                "SortType": "TraderRelevance",
                "ExcludeSearchTypes": ["UntraceableVendors"],
            })
        );
    }

    #[test]
    fn last_nested_tile_is_the_canonical_product() {
        let payload = decode(
            r#"{
                "Products": [
                    {
                        "Products": [
                            {
                                "DisplayName": "Milk 2L (old listing)",
                                "Stockcode": 100,
                                "Price": 2.95,
                                "IsAvailable": true,
                                "IsPurchasable": true
                            },
                            {
                                "DisplayName": "Milk 2L",
                                "Stockcode": 101,
                                "Price": 3.10,
                                "CupString": "$1.55 / 1L",
                                "IsAvailable": true,
                                "IsPurchasable": true
                            }
                        ]
                    }
                ]
            }"#,
        );

        let products = products_from_response(payload);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].stock_code.0, "101");
        assert_eq!(products[0].name, "Milk 2L");
        assert_eq!(products[0].price_total, Decimal::new(310, 2));
        assert_eq!(products[0].price_unit_measure, "$1.55 / 1L");
    }

    #[test]
    fn unavailable_or_unpurchasable_last_tiles_are_filtered_out() {
        // Result A's last tile is unavailable, so result A must be absent
        // even though an earlier tile was fine.
        let payload = decode(
            r#"{
                "Products": [
                    {
                        "Products": [
                            {
                                "DisplayName": "Bread (in stock variant)",
                                "Stockcode": 200,
                                "IsAvailable": true,
                                "IsPurchasable": true
                            },
                            {
                                "DisplayName": "Bread",
                                "Stockcode": 201,
                                "IsAvailable": false,
                                "IsPurchasable": true
                            }
                        ]
                    },
                    {
                        "Products": [
                            {
                                "DisplayName": "Rolls",
                                "Stockcode": 202,
                                "IsAvailable": true,
                                "IsPurchasable": false
                            }
                        ]
                    },
                    {
                        "Products": [
                            {
                                "DisplayName": "Bagels",
                                "Stockcode": 203,
                                "IsAvailable": true,
                                "IsPurchasable": true
                            }
                        ]
                    }
                ]
            }"#,
        );

        let products = products_from_response(payload);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].stock_code.0, "203");
    }

    #[test]
    fn results_without_nested_tiles_are_skipped() {
        let payload = decode(
            r#"{
                "Products": [
                    { "Products": [] },
                    {
                        "Products": [
                            {
                                "DisplayName": "Eggs 12pk",
                                "Stockcode": 300,
                                "IsAvailable": true,
                                "IsPurchasable": true
                            }
                        ]
                    }
                ]
            }"#,
        );

        let products = products_from_response(payload);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].stock_code.0, "300");
    }

    #[test]
    fn missing_price_defaults_to_zero() {
        let payload = decode(
            r#"{
                "Products": [
                    {
                        "Products": [
                            {
                                "DisplayName": "Mystery Item",
                                "Stockcode": 400,
                                "Price": null,
                                "IsAvailable": true,
                                "IsPurchasable": true
                            }
                        ]
                    }
                ]
            }"#,
        );

        let products = products_from_response(payload);
        assert_eq!(products[0].price_total, Decimal::ZERO);
    }

    #[test]
    fn empty_payload_decodes_to_zero_results() {
        let products = products_from_response(decode("{}"));
        assert!(products.is_empty());
    }
}
