//! Browser sessions
//!
//! The navigator drives pages through [`SearchPage`] and [`BrowserSession`]
//! only, so the Chromium backend can be swapped for a scripted one in tests.

pub mod connection;
pub mod headless;
pub mod page;
pub mod session;

use std::path::Path;

use async_trait::async_trait;

use crate::error::BrowserError;

pub use page::ChromePage;
pub use session::{ChromeSession, ChromeSessionFactory};

/// One tab, as far as the navigator is concerned
#[async_trait]
pub trait SearchPage: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Click the first button whose visible text equals `text`
    async fn click_button(&self, text: &str) -> Result<bool, BrowserError>;

    /// Type `text` into the element matching `selector` and press Enter
    ///
    /// `Ok(false)` when no such element exists.
    async fn submit_query(&self, selector: &str, text: &str) -> Result<bool, BrowserError>;

    /// Click the first link whose visible text equals `text`
    async fn click_link(&self, text: &str) -> Result<bool, BrowserError>;

    async fn has_element(&self, selector: &str) -> Result<bool, BrowserError>;

    /// Serialized DOM
    async fn content(&self) -> Result<String, BrowserError>;

    async fn screenshot(&self, path: &Path) -> Result<(), BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

/// A browser process (or attachment) owned by exactly one worker
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn SearchPage>, BrowserError>;

    /// Whether the CDP connection is still alive
    fn is_connected(&self) -> bool;

    async fn close(&self) -> Result<(), BrowserError>;
}

/// Opens fresh sessions for workers
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}
