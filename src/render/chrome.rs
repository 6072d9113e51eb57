//! Headless Chromium page source (feature `browser`).
//!
//! One browser process is launched per run; every `open` gets its own tab, so
//! concurrent download units never share page state. Tabs are closed by
//! `close`, and [`ChromePageSource::shutdown`] tears the browser down.

use super::RenderedPageSource;
use crate::dom::DomSnapshot;
use crate::error::RenderError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

const SCROLL_TO_END: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Page source driving a Chromium instance over CDP.
pub struct ChromePageSource {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromePageSource {
    /// Launch Chromium. `request_timeout` bounds every CDP call, so a hung
    /// renderer cannot block a unit forever.
    #[instrument(level = "info")]
    pub async fn launch(headless: bool, request_timeout: Duration) -> Result<Self, RenderError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(request_timeout)
            .window_size(1920, 1080)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-notifications")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--mute-audio");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(RenderError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    trace!(error = %e, "Browser handler event error");
                }
            }
            debug!("Browser handler task completed");
        });

        info!("Browser launched");
        Ok(Self { browser, handler })
    }

    /// Close the browser and wait for the process to exit.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed to wait for browser exit");
        }
        self.handler.abort();
        info!("Browser shut down");
    }
}

impl RenderedPageSource for ChromePageSource {
    type Handle = Page;

    async fn open(&self, url: &str) -> Result<Page, RenderError> {
        self.browser
            .new_page(url)
            .await
            .map_err(|e| RenderError::Browser(format!("cannot open {url}: {e}")))
    }

    async fn snapshot(&self, page: &Page) -> Result<DomSnapshot, RenderError> {
        let html = page
            .content()
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;
        Ok(DomSnapshot::parse(html))
    }

    async fn trigger_more(&self, page: &Page) -> Result<(), RenderError> {
        page.evaluate(SCROLL_TO_END)
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Browser(e.to_string()))
    }

    async fn close(&self, page: Page) {
        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close tab");
        }
    }
}
