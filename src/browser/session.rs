use async_trait::async_trait;
use chromiumoxide::{Browser, Handler};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::connection::connect_to_browser;
use super::headless::launch_browser;
use super::{BrowserSession, ChromePage, SearchPage, SessionFactory};
use crate::config::BrowserSettings;
use crate::error::BrowserError;
use crate::infrastructure::JsExecutor;

/// A browser plus the task driving its CDP event loop
pub struct ChromeSession {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    fn new(browser: Browser, mut handler: Handler) -> Self {
        // drive browser events in the background
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser event loop stopped: {}", e);
                    break;
                }
            }
        });
        Self {
            browser: Mutex::new(browser),
            handler,
        }
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn new_page(&self) -> Result<Box<dyn SearchPage>, BrowserError> {
        if !self.is_connected() {
            return Err(BrowserError::Disconnected);
        }
        let page = self.browser.lock().await.new_page("about:blank").await?;
        Ok(Box::new(ChromePage::new(JsExecutor::new(page))))
    }

    fn is_connected(&self) -> bool {
        !self.handler.is_finished()
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("⚠️ Browser did not close cleanly: {}", e);
        }
        self.handler.abort();
        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Launches (or attaches to) Chromium according to [`BrowserSettings`]
pub struct ChromeSessionFactory {
    settings: BrowserSettings,
}

impl ChromeSessionFactory {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionFactory for ChromeSessionFactory {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let (browser, handler) = match self.settings.debug_port {
            Some(port) => connect_to_browser(port).await?,
            None => launch_browser(&self.settings).await?,
        };
        let session = ChromeSession::new(browser, handler);

        // give the event loop a moment to sync browser state
        sleep(std::time::Duration::from_millis(300)).await;
        Ok(Box::new(session))
    }
}
