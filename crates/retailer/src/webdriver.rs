use std::time::{Duration, Instant};

use async_trait::async_trait;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;

use crate::browser::{BrowserError, BrowserLauncher, BrowserPage};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

fn session_error(error: WebDriverError) -> BrowserError {
    BrowserError::Session(error.to_string())
}

/// Launches real Chrome sessions through a WebDriver endpoint
/// (chromedriver or Selenium).
pub struct WebDriverLauncher {
    webdriver_url: String,
    user_agent: String,
    headless: bool,
}

impl WebDriverLauncher {
    pub fn new(webdriver_url: impl Into<String>, user_agent: impl Into<String>, headless: bool) -> Self {
        Self { webdriver_url: webdriver_url.into(), user_agent: user_agent.into(), headless }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let mut caps = DesiredCapabilities::chrome();
        caps.add_arg(&format!("--user-agent={}", self.user_agent)).map_err(session_error)?;
        if self.headless {
            caps.add_arg("--headless=new").map_err(session_error)?;
        }

        let driver = WebDriver::new(&self.webdriver_url, caps).await.map_err(session_error)?;
        Ok(Box::new(WebDriverPage { driver: Some(driver) }))
    }
}

pub struct WebDriverPage {
    driver: Option<WebDriver>,
}

impl WebDriverPage {
    fn driver(&self) -> Result<&WebDriver, BrowserError> {
        self.driver
            .as_ref()
            .ok_or_else(|| BrowserError::Session("browser session already closed".to_owned()))
    }
}

fn button_with_text(text: &str) -> String {
    format!("//button[contains(normalize-space(.), '{text}')]")
}

fn any_with_text(text: &str) -> String {
    format!("//*[contains(normalize-space(.), '{text}')]")
}

#[async_trait]
impl BrowserPage for WebDriverPage {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        self.driver()?.goto(url).await.map_err(session_error)
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let element = self
            .driver()?
            .find(By::Css(selector))
            .await
            .map_err(|_| BrowserError::MissingElement(selector.to_owned()))?;
        element.clear().await.map_err(session_error)?;
        element.send_keys(value).await.map_err(session_error)
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        let element = self
            .driver()?
            .find(By::Css(selector))
            .await
            .map_err(|_| BrowserError::MissingElement(selector.to_owned()))?;
        element.click().await.map_err(session_error)
    }

    async fn click_first(&mut self, selector: &str) -> Result<bool, BrowserError> {
        let elements = self
            .driver()?
            .find_all(By::Css(selector))
            .await
            .map_err(session_error)?;
        let Some(element) = elements.first() else { return Ok(false) };
        element.click().await.map_err(session_error)?;
        Ok(true)
    }

    async fn click_text(&mut self, text: &str) -> Result<bool, BrowserError> {
        let elements =
            self.driver()?.find_all(By::XPath(&button_with_text(text))).await.map_err(session_error)?;
        for element in &elements {
            if element.is_displayed().await.map_err(session_error)? {
                element.click().await.map_err(session_error)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn is_visible(&mut self, selector: &str) -> Result<bool, BrowserError> {
        match self.driver()?.find(By::Css(selector)).await {
            Ok(element) => element.is_displayed().await.map_err(session_error),
            Err(_) => Ok(false),
        }
    }

    async fn is_disabled(&mut self, selector: &str) -> Result<bool, BrowserError> {
        let element = self
            .driver()?
            .find(By::Css(selector))
            .await
            .map_err(|_| BrowserError::MissingElement(selector.to_owned()))?;
        let enabled = element.is_enabled().await.map_err(session_error)?;
        Ok(!enabled)
    }

    async fn is_text_visible(&mut self, text: &str) -> Result<bool, BrowserError> {
        let elements =
            self.driver()?.find_all(By::XPath(&any_with_text(text))).await.map_err(session_error)?;
        for element in &elements {
            if element.is_displayed().await.map_err(session_error)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.driver()?.find(By::Css(selector)).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::WaitTimeout(selector.to_owned()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if let Some(driver) = self.driver.take() {
            driver.quit().await.map_err(session_error)?;
        }
        Ok(())
    }
}
