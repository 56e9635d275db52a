//! Pipeline orchestrator - orchestration layer
//!
//! One cycle:
//! 1. optional retention purge
//! 2. select the cycle's queries from the rotation
//! 3. fan them out to worker lanes, one browser session per lane
//! 4. drain every lane and sum the counters
//!
//! A store error stops the cycle: lanes finish the query in hand, take no new
//! one, and the error is returned once all lanes are drained.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::browser::SessionFactory;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::LeadStore;
use crate::models::{PurgeReport, QueryTask};
use crate::orchestrator::lane_processor::{process_lane, LaneReport, LaneShared};
use crate::services::{LeadIntake, QueryRotator, RetentionPolicy};
use crate::utils::logging;
use crate::workflow::{LeadQuota, QueryCtx, QueryFlow, QueryOutcome};

/// Summed result of one cycle
#[derive(Debug, Default, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    /// Queries selected by the rotation
    pub selected: usize,
    /// Queries that actually ran
    pub queries_run: usize,
    pub aborted_queries: usize,
    pub outcome: QueryOutcome,
    pub timed_out: bool,
    pub purge: Option<PurgeReport>,
}

impl CycleReport {
    fn absorb(&mut self, lane: &LaneReport) {
        self.queries_run += lane.queries_run;
        self.aborted_queries += lane.aborted_queries;
        self.outcome.absorb(&lane.outcome);
        self.timed_out |= lane.timed_out;
    }
}

pub struct PipelineOrchestrator {
    config: Config,
    store: Arc<dyn LeadStore>,
    sessions: Arc<dyn SessionFactory>,
    flow: Arc<QueryFlow>,
    rotator: QueryRotator,
    retention: Option<RetentionPolicy>,
    cycles: AtomicU64,
    stop: Arc<AtomicBool>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: Config,
        store: Arc<dyn LeadStore>,
        sessions: Arc<dyn SessionFactory>,
        flow: QueryFlow,
    ) -> Self {
        Self {
            rotator: QueryRotator::from_config(&config),
            retention: config.retention().map(RetentionPolicy::new),
            store,
            sessions,
            flow: Arc::new(flow),
            cycles: AtomicU64::new(0),
            stop: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    /// Ask every lane to stop after the query in hand
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Run one full cycle
    pub async fn run_cycle(&self) -> AppResult<CycleReport> {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let mut report = CycleReport {
            cycle,
            ..Default::default()
        };

        if let Some(retention) = &self.retention {
            report.purge = Some(retention.purge(self.store.as_ref(), Utc::now()).await?);
        }

        let mut rng = StdRng::from_entropy();
        let tasks = self
            .rotator
            .next_batch(self.store.as_ref(), Utc::now(), &mut rng)
            .await?;
        report.selected = tasks.len();

        if tasks.is_empty() {
            warn!("⚠️ Cycle #{}: every query pair is still cooling down", cycle);
            return Ok(report);
        }

        let lanes = split_lanes(cycle, tasks, self.config.workers);
        logging::log_cycle_start(cycle, report.selected, lanes.len());

        let shared = LaneShared {
            flow: Arc::clone(&self.flow),
            sessions: Arc::clone(&self.sessions),
            intake: Arc::new(LeadIntake::for_cycle(Arc::clone(&self.store), &self.config)),
            quota: Arc::new(LeadQuota::from_config(&self.config)),
            halt: Arc::new(AtomicBool::new(false)),
            stop: Arc::clone(&self.stop),
            deadline: Instant::now() + self.config.cycle_timeout(),
        };

        let mut workers = JoinSet::new();
        for (worker, queries) in lanes.into_iter().enumerate() {
            let shared = shared.clone();
            workers.spawn(process_lane(worker + 1, queries, shared));
        }

        let mut fatal = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(lane)) => report.absorb(&lane),
                Ok(Err(e)) => {
                    error!("❌ Cycle #{} halted: {}", cycle, e);
                    fatal.get_or_insert(e);
                }
                Err(e) => {
                    error!("❌ Worker task failed: {}", e);
                    fatal.get_or_insert(AppError::Worker(e.to_string()));
                }
            }
        }

        logging::print_cycle_stats(
            cycle,
            report.queries_run,
            report.aborted_queries,
            report.outcome.candidates,
            report.outcome.admitted,
            report.outcome.dispatched,
            report.outcome.dispatch_failed,
            report.timed_out,
        );

        match fatal {
            Some(e) => Err(e),
            None => {
                info!("✓ Cycle #{} complete", cycle);
                Ok(report)
            }
        }
    }
}

/// Deal tasks round-robin over at most `workers` lanes
fn split_lanes(cycle: u64, tasks: Vec<QueryTask>, workers: usize) -> Vec<Vec<QueryCtx>> {
    let lane_count = workers.max(1).min(tasks.len());
    let mut lanes: Vec<Vec<QueryCtx>> = (0..lane_count).map(|_| Vec::new()).collect();
    for (index, task) in tasks.into_iter().enumerate() {
        let lane = index % lane_count;
        lanes[lane].push(QueryCtx::new(cycle, index + 1, lane + 1, task));
    }
    lanes
}
