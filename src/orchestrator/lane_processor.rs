//! Lane processor - orchestration layer
//!
//! One worker, one browser session, its share of the cycle's queries in
//! order. The session is re-created when it is found disconnected and is
//! closed on every exit path, deadline included.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::browser::{BrowserSession, SessionFactory};
use crate::error::AppResult;
use crate::services::LeadIntake;
use crate::workflow::{LeadQuota, QueryCtx, QueryFlow, QueryOutcome};

/// Shared, per-cycle inputs of every lane
#[derive(Clone)]
pub struct LaneShared {
    pub flow: Arc<QueryFlow>,
    pub sessions: Arc<dyn SessionFactory>,
    pub intake: Arc<LeadIntake>,
    pub quota: Arc<LeadQuota>,
    /// Set by the first lane that hits a store error
    pub halt: Arc<AtomicBool>,
    /// Process-wide shutdown request
    pub stop: Arc<AtomicBool>,
    pub deadline: Instant,
}

/// What one lane got through
#[derive(Debug, Default, Clone)]
pub struct LaneReport {
    pub queries_run: usize,
    pub aborted_queries: usize,
    pub outcome: QueryOutcome,
    pub timed_out: bool,
}

/// Run a lane to completion or until the cycle deadline
pub async fn process_lane(worker: usize, queries: Vec<QueryCtx>, shared: LaneShared) -> AppResult<LaneReport> {
    let mut report = LaneReport::default();
    let mut session: Option<Box<dyn BrowserSession>> = None;

    let result = timeout_at(
        shared.deadline,
        run_queries(worker, &queries, &shared, &mut session, &mut report),
    )
    .await;

    if let Some(session) = session.take() {
        if let Err(e) = session.close().await {
            warn!("[worker #{}] ⚠️ Session close failed: {}", worker, e);
        }
    }

    match result {
        Ok(Ok(())) => Ok(report),
        Ok(Err(e)) => {
            shared.halt.store(true, Ordering::SeqCst);
            Err(e)
        }
        Err(_) => {
            warn!(
                "[worker #{}] ⏱️ Cycle deadline reached after {}/{} queries",
                worker,
                report.queries_run,
                queries.len()
            );
            report.timed_out = true;
            Ok(report)
        }
    }
}

async fn run_queries(
    worker: usize,
    queries: &[QueryCtx],
    shared: &LaneShared,
    session: &mut Option<Box<dyn BrowserSession>>,
    report: &mut LaneReport,
) -> AppResult<()> {
    for ctx in queries {
        if shared.halt.load(Ordering::SeqCst) || shared.stop.load(Ordering::SeqCst) {
            info!("[worker #{}] Cycle halted, leaving remaining queries", worker);
            break;
        }

        let Some(active) = ensure_session(worker, session, shared.sessions.as_ref()).await else {
            report.aborted_queries += 1;
            continue;
        };

        let outcome = shared
            .flow
            .run(active, &shared.intake, &shared.quota, ctx)
            .await?;
        report.queries_run += 1;
        if outcome.aborted {
            report.aborted_queries += 1;
        }
        report.outcome.absorb(&outcome);
    }
    Ok(())
}

/// Healthy session for the next query, re-created when disconnected
async fn ensure_session<'a>(
    worker: usize,
    slot: &'a mut Option<Box<dyn BrowserSession>>,
    factory: &dyn SessionFactory,
) -> Option<&'a dyn BrowserSession> {
    if let Some(stale) = slot.take_if(|s| !s.is_connected()) {
        warn!("[worker #{}] ⚠️ Browser session disconnected, recreating", worker);
        if let Err(e) = stale.close().await {
            debug!("[worker #{}] Stale session close failed: {}", worker, e);
        }
    }

    if slot.is_none() {
        match factory.open().await {
            Ok(fresh) => *slot = Some(fresh),
            Err(e) => {
                error!("[worker #{}] ❌ Could not open browser session: {}", worker, e);
                return None;
            }
        }
    }
    slot.as_deref()
}
