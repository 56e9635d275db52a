//! Query processing flow - workflow layer
//!
//! Defines the full handling of one query:
//! 1. navigate to local results
//! 2. extract candidates
//! 3. per candidate: intake → enrich → draft → persist → dispatch
//!
//! Navigation and extraction failures end the query with zero results.
//! Enrichment and dispatch failures are contained per candidate. Only store
//! errors propagate.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::browser::BrowserSession;
use crate::config::Config;
use crate::error::{DispatchError, EnrichmentError, StoreResult};
use crate::models::{Enrichment, LeadPayload, ScrapedCandidate};
use crate::services::enricher::fallback_enrichment;
use crate::services::lead_intake::{AdmittedLead, IntakeDecision, LeadIntake, SkipReason};
use crate::services::{Dispatcher, Enricher, FieldExtractor, MessageGenerator, ResultPageNavigator};
use crate::workflow::lead_quota::LeadQuota;
use crate::workflow::query_ctx::QueryCtx;

/// Counters for one query, summed up per cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    /// Navigation or page read failed after every fallback
    pub aborted: bool,
    pub candidates: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub admitted: usize,
    pub enrich_fallbacks: usize,
    pub dispatched: usize,
    pub dispatch_failed: usize,
    pub quota_reached: bool,
}

impl QueryOutcome {
    pub fn absorb(&mut self, other: &QueryOutcome) {
        self.aborted |= other.aborted;
        self.candidates += other.candidates;
        self.rejected += other.rejected;
        self.skipped += other.skipped;
        self.admitted += other.admitted;
        self.enrich_fallbacks += other.enrich_fallbacks;
        self.dispatched += other.dispatched;
        self.dispatch_failed += other.dispatch_failed;
        self.quota_reached |= other.quota_reached;
    }
}

/// Query flow
///
/// - owns the capabilities, never a browser session
/// - decides what happens on each failure
pub struct QueryFlow {
    navigator: ResultPageNavigator,
    extractor: FieldExtractor,
    enricher: Arc<dyn Enricher>,
    dispatcher: Arc<dyn Dispatcher>,
    messages: MessageGenerator,
    page_timeout: Duration,
    enrich_timeout: Duration,
    dispatch_timeout: Duration,
}

impl QueryFlow {
    pub fn new(
        config: &Config,
        extractor: FieldExtractor,
        enricher: Arc<dyn Enricher>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            navigator: ResultPageNavigator::from_config(config),
            extractor,
            enricher,
            dispatcher,
            messages: MessageGenerator::new(),
            page_timeout: Duration::from_secs(config.navigator.page_load_timeout_secs),
            enrich_timeout: config.enrich_timeout(),
            dispatch_timeout: config.dispatch_timeout(),
        }
    }

    pub async fn run(
        &self,
        session: &dyn BrowserSession,
        intake: &LeadIntake,
        quota: &LeadQuota,
        ctx: &QueryCtx,
    ) -> StoreResult<QueryOutcome> {
        let mut outcome = QueryOutcome::default();
        let task = &ctx.task;

        if quota.is_exhausted(task.country) {
            info!("{} Lead target reached, skipping", ctx);
            outcome.quota_reached = true;
            return Ok(outcome);
        }

        info!("{} 🔍 Searching: {}", ctx, task.query_text);
        let Some(html) = self.fetch_results(session, ctx).await else {
            outcome.aborted = true;
            return Ok(outcome);
        };

        let candidates = self.extractor.extract(&html, task.country);
        outcome.candidates = candidates.len();
        if candidates.is_empty() {
            info!("{} ExtractionEmpty: no result nodes matched", ctx);
            return Ok(outcome);
        }
        info!("{} ✓ Extracted {} candidates", ctx, candidates.len());

        for candidate in candidates {
            match intake.admit(candidate, task, Utc::now()).await? {
                IntakeDecision::Rejected(reason) => {
                    debug!("{} Rejected: {:?}", ctx, reason);
                    outcome.rejected += 1;
                }
                IntakeDecision::Skipped { business, reason } => {
                    match reason {
                        SkipReason::CoolingDown { dispatched_at } => info!(
                            "{} ⏭️ {} contacted on {}, cooling down",
                            ctx,
                            business.name,
                            dispatched_at.format("%Y-%m-%d")
                        ),
                        SkipReason::SeenThisCycle => {
                            debug!("{} {} already handled this cycle", ctx, business.name)
                        }
                    }
                    outcome.skipped += 1;
                }
                IntakeDecision::Admitted(admitted) => {
                    if !quota.try_take(task.country) {
                        info!("{} Lead target for {} reached", ctx, task.country);
                        outcome.quota_reached = true;
                        break;
                    }
                    outcome.admitted += 1;
                    self.process_lead(intake, &admitted, ctx, &mut outcome).await?;
                }
            }
        }

        info!(
            "{} 📊 {} candidates: {} admitted, {} dispatched, {} skipped, {} rejected",
            ctx,
            outcome.candidates,
            outcome.admitted,
            outcome.dispatched,
            outcome.skipped,
            outcome.rejected
        );
        Ok(outcome)
    }

    /// Reach local results and read the DOM; the page is always closed
    async fn fetch_results(&self, session: &dyn BrowserSession, ctx: &QueryCtx) -> Option<String> {
        let tag = ctx.to_string();
        let ready = match self
            .navigator
            .reach_local_results(session, &ctx.task.query_text, &tag)
            .await
        {
            Ok(ready) => ready,
            Err(e) => {
                error!("{} ❌ ExtractionAborted: {}", ctx, e);
                return None;
            }
        };

        let content = timeout(self.page_timeout, ready.page.content()).await;
        if let Err(e) = ready.page.close().await {
            debug!("{} Page close failed: {}", ctx, e);
        }

        match content {
            Ok(Ok(html)) => Some(html),
            Ok(Err(e)) => {
                error!("{} ❌ ExtractionAborted: could not read page: {}", ctx, e);
                None
            }
            Err(_) => {
                error!("{} ❌ ExtractionAborted: page read timed out", ctx);
                None
            }
        }
    }

    async fn process_lead(
        &self,
        intake: &LeadIntake,
        admitted: &AdmittedLead,
        ctx: &QueryCtx,
        outcome: &mut QueryOutcome,
    ) -> StoreResult<()> {
        let name = &admitted.candidate.name;

        let enrichment = match self.enrich(&admitted.candidate).await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                warn!("{} ⚠️ Enrichment failed for {}: {}, using fallback", ctx, name, e);
                outcome.enrich_fallbacks += 1;
                random_fallback()
            }
        };
        let message = self.draft_message(name, &enrichment);

        let lead = intake.commit(admitted, &enrichment, &message, Utc::now()).await?;
        let payload = admitted.payload(&enrichment, &message);

        match self.dispatch(&payload).await {
            Ok(()) => {
                intake.confirm_dispatch(&lead, Utc::now()).await?;
                info!("{} ✓ Dispatched lead #{} for {}", ctx, lead.id, name);
                outcome.dispatched += 1;
            }
            Err(e) => {
                warn!("{} ⚠️ Dispatch failed for {}: {}, retrying next cycle", ctx, name, e);
                outcome.dispatch_failed += 1;
            }
        }
        Ok(())
    }

    /// Kept synchronous so the thread-local rng never lives across an await
    fn draft_message(&self, name: &str, enrichment: &Enrichment) -> String {
        self.messages.generate(
            name,
            &enrichment.industry,
            &enrichment.pain_point,
            &mut rand::thread_rng(),
        )
    }

    async fn enrich(&self, candidate: &ScrapedCandidate) -> Result<Enrichment, EnrichmentError> {
        timeout(
            self.enrich_timeout,
            self.enricher.enrich(&candidate.name, candidate.category.as_deref()),
        )
        .await
        .map_err(|_| EnrichmentError::Timeout(self.enrich_timeout))?
    }

    async fn dispatch(&self, payload: &LeadPayload) -> Result<(), DispatchError> {
        timeout(self.dispatch_timeout, self.dispatcher.dispatch(payload))
            .await
            .map_err(|_| DispatchError::Timeout(self.dispatch_timeout))?
    }
}

fn random_fallback() -> Enrichment {
    fallback_enrichment(&mut rand::thread_rng())
}
