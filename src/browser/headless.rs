use chromiumoxide::{Browser, BrowserConfig, Handler};
use tracing::{debug, error, info};

use crate::config::BrowserSettings;
use crate::error::BrowserError;

/// Flags that keep the automation banner and sandbox quirks out of the way
const STEALTH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--lang=en-US",
    "--window-size=1920,1080",
];

/// Launch a local browser process
///
/// The caller owns the returned handler and must drive it.
pub async fn launch_browser(settings: &BrowserSettings) -> Result<(Browser, Handler), BrowserError> {
    info!("🚀 Launching browser (headless: {})...", settings.headless);

    let mut builder = BrowserConfig::builder();
    builder = if settings.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(executable) = &settings.executable {
        debug!("Using browser executable: {}", executable.display());
        builder = builder.chrome_executable(executable);
    }

    let config = builder
        .args(launch_args(&settings.user_agent))
        .build()
        .map_err(|e| {
            error!("❌ Invalid browser configuration: {}", e);
            BrowserError::LaunchFailed(e)
        })?;

    let (browser, handler) = Browser::launch(config).await.map_err(|e| {
        error!("❌ Failed to launch browser: {}", e);
        BrowserError::LaunchFailed(e.to_string())
    })?;

    info!("✓ Browser launched");
    Ok((browser, handler))
}

fn launch_args(user_agent: &str) -> Vec<String> {
    let mut args: Vec<String> = STEALTH_ARGS.iter().map(|a| a.to_string()).collect();
    if !user_agent.is_empty() {
        args.push(format!("--user-agent={}", user_agent));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args_carry_user_agent() {
        let args = launch_args("TestAgent/1.0");
        assert!(args.contains(&"--user-agent=TestAgent/1.0".to_string()));
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
    }

    #[test]
    fn test_empty_user_agent_is_omitted() {
        assert!(launch_args("").iter().all(|a| !a.starts_with("--user-agent")));
    }
}
