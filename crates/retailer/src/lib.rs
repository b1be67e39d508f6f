pub mod browser;
pub mod catalog;
pub mod checkout;
pub mod selectors;
pub mod webdriver;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;
use tracing::warn;

use aisle_core::checkout::CheckoutTransitionError;
use aisle_core::config::{CheckoutConfig, RetailerConfig};
use aisle_core::domain::order::Order;
use aisle_core::domain::product::Product;
use aisle_core::twofa::{CodeSource, ManualCodePrompt};

use browser::{BrowserError, BrowserLauncher, BrowserPage};
use catalog::CatalogClient;
use checkout::CheckoutOrchestrator;

#[derive(Debug, Error)]
pub enum RetailerError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog search returned status {0}")]
    UnexpectedStatus(u16),
    #[error("malformed catalog response: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("required control `{0}` was not present")]
    MissingControl(String),
    #[error("no delivery time slots available")]
    NoDeliverySlot,
    #[error("no two-factor code available from messages or manual entry")]
    SecondFactorUnavailable,
    #[error(transparent)]
    Transition(#[from] CheckoutTransitionError),
}

/// The retailer capability: product search plus order placement. One
/// implementation per retailer; everything page-structure specific stays
/// behind this boundary.
#[async_trait]
pub trait Supermarket: Send + Sync {
    async fn search_products(&self, term: &str) -> Result<Vec<Product>, RetailerError>;

    /// Drive a full browser checkout for the order. The browser session is
    /// exclusively owned by this call and torn down on every exit path.
    async fn place_order(&self, order: &Order) -> Result<(), RetailerError>;
}

#[derive(Clone)]
pub struct AccountCredentials {
    pub email: String,
    pub password: SecretString,
    pub card_cvv: SecretString,
}

pub struct Woolworths {
    catalog: CatalogClient,
    launcher: Box<dyn BrowserLauncher>,
    codes: Arc<dyn CodeSource>,
    prompt: Arc<dyn ManualCodePrompt>,
    auth: AccountCredentials,
    checkout: CheckoutConfig,
    store_url: String,
    auth_url: String,
}

impl Woolworths {
    pub fn new(
        config: &RetailerConfig,
        checkout: CheckoutConfig,
        launcher: Box<dyn BrowserLauncher>,
        codes: Arc<dyn CodeSource>,
        prompt: Arc<dyn ManualCodePrompt>,
    ) -> Result<Self, RetailerError> {
        Ok(Self {
            catalog: CatalogClient::new(config)?,
            launcher,
            codes,
            prompt,
            auth: AccountCredentials {
                email: config.email.clone(),
                password: config.password.clone(),
                card_cvv: config.card_cvv.clone(),
            },
            checkout,
            store_url: config.store_url.trim_end_matches('/').to_owned(),
            auth_url: config.auth_url.clone(),
        })
    }

    /// Fetch the store homepage once so the search API sees a session
    /// cookie. Best-effort: a failure here only degrades search.
    pub async fn prime_session(&self) {
        if let Err(error) = self.catalog.prime_session().await {
            warn!(
                event_name = "retailer.session_prime_failed",
                error = %error,
                "could not prime retailer session"
            );
        }
    }
}

#[async_trait]
impl Supermarket for Woolworths {
    async fn search_products(&self, term: &str) -> Result<Vec<Product>, RetailerError> {
        self.catalog.search_products(term).await
    }

    async fn place_order(&self, order: &Order) -> Result<(), RetailerError> {
        let mut page = self.launcher.launch().await?;

        let orchestrator = CheckoutOrchestrator {
            auth: &self.auth,
            config: &self.checkout,
            store_url: &self.store_url,
            auth_url: &self.auth_url,
            codes: self.codes.as_ref(),
            prompt: self.prompt.as_ref(),
        };
        let outcome = orchestrator.run(page.as_mut(), order).await;

        if let Err(error) = page.close().await {
            warn!(
                event_name = "checkout.session_close_failed",
                error = %error,
                "browser session did not close cleanly"
            );
        }

        outcome
    }
}
