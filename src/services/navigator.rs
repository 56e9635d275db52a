//! Result-page navigation - capability layer
//!
//! Drives one page from the engine's home surface to a local-results page:
//!
//! ```text
//! Start → HomeLoaded → QuerySubmitted → LocalResultsReady
//! ```
//!
//! Every remote step is bounded by a timeout and followed by a fixed settle
//! delay. Only home loading is retried; later steps have fallbacks instead.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{BrowserSession, SearchPage};
use crate::config::{Config, NavigatorSettings, SearchSettings};
use crate::error::{BrowserError, NavigationError};
use crate::services::retry::RetryPolicy;

/// Navigation progress of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Start,
    HomeLoaded,
    QuerySubmitted,
    LocalResultsReady,
}

/// How the local-results page was finally reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsRoute {
    /// The submitted query already landed in local-results mode
    Direct,
    /// Through the maps / places link
    MapsLink,
    /// Fresh page on the constructed local-results URL
    ForcedUrl,
}

/// A page in `LocalResultsReady`
pub struct ReadyPage {
    pub page: Box<dyn SearchPage>,
    pub route: ResultsRoute,
    /// Whether a result container showed up before the wait ran out
    pub results_visible: bool,
}

pub struct ResultPageNavigator {
    search: SearchSettings,
    settings: NavigatorSettings,
    debug_dir: Option<PathBuf>,
}

impl ResultPageNavigator {
    pub fn new(search: SearchSettings, settings: NavigatorSettings, debug_dir: Option<PathBuf>) -> Self {
        Self {
            search,
            settings,
            debug_dir,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.search.clone(),
            config.navigator.clone(),
            config.browser.debug_dir.clone(),
        )
    }

    /// Retry policy for loading the home surface
    pub fn home_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.settings.max_attempts,
            Duration::from_millis(self.settings.backoff_ms),
        )
    }

    /// Local-results URL for `query`, URL-encoded
    pub fn local_results_url(&self, query: &str) -> Result<String, url::ParseError> {
        let mut url = Url::parse(&self.search.local_results_url)?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(url.into())
    }

    /// Reach a local-results page for `query` on a fresh page of `session`
    ///
    /// `tag` only labels logs and screenshots.
    pub async fn reach_local_results(
        &self,
        session: &dyn BrowserSession,
        query: &str,
        tag: &str,
    ) -> Result<ReadyPage, NavigationError> {
        let direct_url = self.local_results_url(query)?;

        // Start → HomeLoaded
        let page = self.load_home(session, tag).await?;
        let mut state = NavState::HomeLoaded;
        self.dismiss_consent(page.as_ref(), tag).await;

        // HomeLoaded → QuerySubmitted
        if !self.submit_query(page.as_ref(), query).await {
            info!("{} Query input unavailable, using direct results URL", tag);
            if let Err(e) = self.bounded("direct results load", self.page_load_timeout(), page.goto(&direct_url)).await {
                close_quietly(page.as_ref()).await;
                return Err(aborted(state, e));
            }
        }
        state = NavState::QuerySubmitted;
        self.settle(self.settings.submit_settle_ms).await;

        // QuerySubmitted → LocalResultsReady
        let (page, route) = if self.in_local_results(page.as_ref()).await {
            (page, ResultsRoute::Direct)
        } else if self.follow_maps_link(page.as_ref(), tag).await {
            (page, ResultsRoute::MapsLink)
        } else {
            warn!("⚠️ {} No local results affordance, forcing direct URL on a fresh page", tag);
            close_quietly(page.as_ref()).await;
            let page = self.force_direct(session, &direct_url).await.map_err(|e| aborted(state, e))?;
            (page, ResultsRoute::ForcedUrl)
        };
        state = NavState::LocalResultsReady;
        debug!("{} Reached {:?} via {:?}", tag, state, route);

        self.settle(self.settings.final_settle_ms).await;
        self.capture(page.as_ref(), tag, "results").await;
        let results_visible = self.wait_for_results(page.as_ref()).await;
        if !results_visible {
            warn!("⚠️ {} No result container appeared within {}s", tag, self.settings.results_timeout_secs);
            self.capture(page.as_ref(), tag, "no-results").await;
        }

        Ok(ReadyPage {
            page,
            route,
            results_visible,
        })
    }

    /// Open a page on the home surface, recreating it between attempts
    async fn load_home(
        &self,
        session: &dyn BrowserSession,
        tag: &str,
    ) -> Result<Box<dyn SearchPage>, NavigationError> {
        let policy = self.home_policy();
        let mut attempt = 1;

        loop {
            let error = match self.bounded("new page", self.page_load_timeout(), session.new_page()).await {
                Ok(page) => {
                    match self
                        .bounded("home load", self.page_load_timeout(), page.goto(&self.search.home_url))
                        .await
                    {
                        Ok(()) => {
                            debug!("{} Home loaded on attempt {}", tag, attempt);
                            self.capture(page.as_ref(), tag, "home").await;
                            return Ok(page);
                        }
                        Err(e) => {
                            close_quietly(page.as_ref()).await;
                            e
                        }
                    }
                }
                Err(e) => e,
            };

            if !policy.should_retry(attempt) {
                return Err(NavigationError::HomeUnreachable {
                    attempts: attempt,
                    source: error,
                });
            }
            let delay = policy.delay(attempt);
            warn!(
                "⚠️ {} Home load failed (attempt {}/{}): {}, retrying in {:?}",
                tag, attempt, policy.max_attempts, error, delay
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// Best effort; a missing overlay is the normal case
    async fn dismiss_consent(&self, page: &dyn SearchPage, tag: &str) {
        for label in &self.search.consent_buttons {
            match self.bounded("consent check", self.ui_timeout(), page.click_button(label)).await {
                Ok(true) => {
                    info!("{} Dismissed consent overlay via '{}'", tag, label);
                    self.settle(self.settings.consent_settle_ms).await;
                    return;
                }
                Ok(false) => {}
                Err(e) => debug!("{} Consent button '{}' check failed: {}", tag, label, e),
            }
        }
    }

    /// `true` once one of the configured inputs took the query
    async fn submit_query(&self, page: &dyn SearchPage, query: &str) -> bool {
        for selector in &self.search.query_inputs {
            match self
                .bounded("query submit", self.page_load_timeout(), page.submit_query(selector, query))
                .await
            {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!("Query input '{}' failed: {}", selector, e),
            }
        }
        false
    }

    async fn in_local_results(&self, page: &dyn SearchPage) -> bool {
        match self.bounded("url check", self.ui_timeout(), page.current_url()).await {
            Ok(url) => url.contains(&self.search.local_results_marker),
            Err(e) => {
                debug!("Could not read current URL: {}", e);
                false
            }
        }
    }

    async fn follow_maps_link(&self, page: &dyn SearchPage, tag: &str) -> bool {
        for text in &self.search.maps_links {
            match self.bounded("maps link", self.ui_timeout(), page.click_link(text)).await {
                Ok(true) => {
                    info!("{} Followed '{}' link", tag, text);
                    self.settle(self.settings.maps_settle_ms).await;
                    return true;
                }
                Ok(false) => {}
                Err(e) => debug!("{} Maps link '{}' failed: {}", tag, text, e),
            }
        }
        false
    }

    async fn force_direct(
        &self,
        session: &dyn BrowserSession,
        direct_url: &str,
    ) -> Result<Box<dyn SearchPage>, BrowserError> {
        let fallback_timeout = Duration::from_secs(self.settings.fallback_load_timeout_secs);
        let page = self.bounded("new page", fallback_timeout, session.new_page()).await?;
        if let Err(e) = self.bounded("forced results load", fallback_timeout, page.goto(direct_url)).await {
            close_quietly(page.as_ref()).await;
            return Err(e);
        }
        Ok(page)
    }

    /// Poll for any result container until the results timeout
    async fn wait_for_results(&self, page: &dyn SearchPage) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(self.settings.results_timeout_secs);
        loop {
            for selector in &self.search.result_selectors {
                if let Ok(true) = self.bounded("results check", self.ui_timeout(), page.has_element(selector)).await {
                    return true;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            sleep(Duration::from_millis(500)).await;
        }
    }

    async fn capture(&self, page: &dyn SearchPage, tag: &str, stage: &str) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        let file = format!(
            "{}-{}-{}.png",
            chrono::Utc::now().format("%Y%m%dT%H%M%S"),
            sanitize(tag),
            stage
        );
        if let Err(e) = page.screenshot(&dir.join(file)).await {
            debug!("Screenshot '{}' failed: {}", stage, e);
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        limit: Duration,
        fut: impl Future<Output = Result<T, BrowserError>>,
    ) -> Result<T, BrowserError> {
        timeout(limit, fut)
            .await
            .map_err(|_| BrowserError::timeout(operation, limit))?
    }

    async fn settle(&self, ms: u64) {
        if ms > 0 {
            sleep(Duration::from_millis(ms)).await;
        }
    }

    fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.page_load_timeout_secs)
    }

    fn ui_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.ui_check_timeout_secs)
    }
}

fn aborted(state: NavState, source: BrowserError) -> NavigationError {
    NavigationError::ExtractionAborted { state, source }
}

async fn close_quietly(page: &dyn SearchPage) {
    if let Err(e) = page.close().await {
        debug!("Page close failed: {}", e);
    }
}

fn sanitize(tag: &str) -> String {
    tag.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
