use std::path::Path;

use async_trait::async_trait;
use chromiumoxide::page::ScreenshotParams;
use tracing::debug;

use super::SearchPage;
use crate::error::BrowserError;
use crate::infrastructure::js_executor::{js_string, JsExecutor};

/// Chromium tab behind the [`SearchPage`] capability
pub struct ChromePage {
    executor: JsExecutor,
}

impl ChromePage {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }

    /// Click the first element matching `selector` whose trimmed text is `text`
    async fn click_by_text(&self, selector: &str, text: &str) -> Result<bool, BrowserError> {
        let script = format!(
            r#"(() => {{
                const want = {text};
                const hit = Array.from(document.querySelectorAll({selector}))
                    .find(el => (el.innerText || el.value || '').trim() === want);
                if (!hit) return false;
                hit.click();
                return true;
            }})()"#,
            text = js_string(text),
            selector = js_string(selector),
        );
        self.executor.eval_as(script).await
    }
}

#[async_trait]
impl SearchPage for ChromePage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        debug!("goto {}", url);
        self.executor.page().goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.executor.page().url().await?.unwrap_or_default())
    }

    async fn click_button(&self, text: &str) -> Result<bool, BrowserError> {
        self.click_by_text(r#"button, [role="button"], input[type="submit"]"#, text)
            .await
    }

    async fn submit_query(&self, selector: &str, text: &str) -> Result<bool, BrowserError> {
        if !self.has_element(selector).await? {
            return Ok(false);
        }
        let input = self.executor.page().find_element(selector).await?;
        input.click().await?;
        input.type_str(text).await?;
        input.press_key("Enter").await?;
        Ok(true)
    }

    async fn click_link(&self, text: &str) -> Result<bool, BrowserError> {
        self.click_by_text("a", text).await
    }

    async fn has_element(&self, selector: &str) -> Result<bool, BrowserError> {
        let script = format!("document.querySelector({}) !== null", js_string(selector));
        self.executor.eval_as(script).await
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.executor.page().content().await?)
    }

    async fn screenshot(&self, path: &Path) -> Result<(), BrowserError> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let params = ScreenshotParams::builder().full_page(true).build();
        self.executor.page().save_screenshot(params, path).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.executor.page().clone().close().await?;
        Ok(())
    }
}
