use chromiumoxide::{Browser, Handler};
use tracing::{error, info};

use crate::error::BrowserError;

/// Attach to a browser already listening on a remote debugging port
pub async fn connect_to_browser(port: u16) -> Result<(Browser, Handler), BrowserError> {
    let browser_url = format!("http://localhost:{}", port);
    info!("Connecting to browser: {}", browser_url);

    let (browser, handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("❌ Failed to connect to browser: {}", e);
        BrowserError::ConnectionFailed {
            url: browser_url.clone(),
            source: e,
        }
    })?;

    info!("✓ Connected to {}", browser_url);
    Ok((browser, handler))
}
