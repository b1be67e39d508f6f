use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BrowserError {
    #[error("webdriver session error: {0}")]
    Session(String),
    #[error("element `{0}` was not found")]
    MissingElement(String),
    #[error("timed out waiting for `{0}`")]
    WaitTimeout(String),
}

/// Minimal driving surface over one authenticated browser page. The
/// checkout orchestrator is written against this trait so the WebDriver
/// binding stays in one adapter and tests can script page behavior.
#[async_trait]
pub trait BrowserPage: Send {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), BrowserError>;

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError>;

    /// Click the first element matching `selector`. `Ok(false)` when no
    /// element matches.
    async fn click_first(&mut self, selector: &str) -> Result<bool, BrowserError>;

    /// Click the first button containing `text`. `Ok(false)` when absent.
    async fn click_text(&mut self, text: &str) -> Result<bool, BrowserError>;

    async fn is_visible(&mut self, selector: &str) -> Result<bool, BrowserError>;

    /// Whether the first element matching `selector` is disabled. Errors
    /// when the element is missing entirely.
    async fn is_disabled(&mut self, selector: &str) -> Result<bool, BrowserError>;

    async fn is_text_visible(&mut self, text: &str) -> Result<bool, BrowserError>;

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Fixed wait used where the site offers no completion signal.
    async fn settle(&mut self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    /// Tear the session down. Called on every exit path; idempotent.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>, BrowserError>;
}
