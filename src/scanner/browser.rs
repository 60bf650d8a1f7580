use crate::scanner::headless::BrowserDriver;
use crate::scanner::BrowserError;
use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::prelude::*;
use tokio::sync::Mutex;

/// Chrome session driven over the WebDriver protocol
pub struct WebDriverBrowser {
    driver: Mutex<Option<WebDriver>>,
}

impl WebDriverBrowser {
    /// Starts a headless Chrome session on the WebDriver server at
    /// `webdriver_url` (e.g. `http://localhost:4444`)
    pub async fn connect(webdriver_url: &str, user_agent: &str) -> Result<Self, BrowserError> {
        let mut caps = DesiredCapabilities::chrome();
        caps.set_headless()?;
        caps.add_chrome_arg(&format!("--user-agent={}", user_agent))?;
        caps.add_chrome_arg("--window-size=1366,900")?;
        caps.add_chrome_arg("--disable-dev-shm-usage")?;
        caps.add_chrome_arg("--no-sandbox")?;

        let driver = WebDriver::new(webdriver_url, caps).await?;
        tracing::info!("Connected to WebDriver at {}", webdriver_url);

        Ok(Self {
            driver: Mutex::new(Some(driver)),
        })
    }
}

#[async_trait]
impl BrowserDriver for WebDriverBrowser {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or(BrowserError::Closed)?;

        driver.set_page_load_timeout(timeout).await?;
        driver
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation(format!("{}: {}", url, e)))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or(BrowserError::Closed)?;

        let ret = driver
            .execute(script, Vec::new())
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(ret.json().clone())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or(BrowserError::Closed)?;
        Ok(driver.source().await?)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let driver = self.driver.lock().await.take();
        if let Some(driver) = driver {
            driver.quit().await?;
            tracing::debug!("Browser session closed");
        }
        Ok(())
    }
}
