//! Application runner - orchestration layer
//!
//! Wires the concrete backends together and drives cycles until the run is
//! over:
//! - one-shot mode (`cycle_interval_secs` unset) runs a single cycle
//! - interval mode sleeps between cycles until Ctrl-C
//!
//! Ctrl-C never kills work in flight: lanes are asked to stop, the cycle
//! drains and its statistics are still printed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::browser::{ChromeSessionFactory, SessionFactory};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{LeadStore, MemoryStore, SqliteStore};
use crate::orchestrator::pipeline::{CycleReport, PipelineOrchestrator};
use crate::services::{
    DiscordDispatcher, Dispatcher, Enricher, FallbackEnricher, FieldExtractor, LlmEnricher,
    LogDispatcher,
};
use crate::workflow::QueryFlow;

/// Application main structure
pub struct App {
    pipeline: PipelineOrchestrator,
    interval: Option<Duration>,
}

impl App {
    /// Build every backend from configuration
    pub async fn initialize(config: Config) -> AppResult<Self> {
        let store: Arc<dyn LeadStore> = if config.dry_run {
            info!("🧪 Using in-memory store");
            Arc::new(MemoryStore::new())
        } else {
            info!("📦 Opening database: {}", config.database_url);
            Arc::new(SqliteStore::connect(&config.database_url).await?)
        };

        let sessions: Arc<dyn SessionFactory> =
            Arc::new(ChromeSessionFactory::new(config.browser.clone()));

        Self::with_backends(config, store, sessions)
    }

    /// Assemble the app around an already built store and session factory
    pub fn with_backends(
        config: Config,
        store: Arc<dyn LeadStore>,
        sessions: Arc<dyn SessionFactory>,
    ) -> AppResult<Self> {
        let enricher = build_enricher(&config);
        let dispatcher = build_dispatcher(&config);
        let extractor = FieldExtractor::from_config(&config)?;
        let flow = QueryFlow::new(&config, extractor, enricher, dispatcher);

        Ok(Self {
            interval: config.cycle_interval_secs.map(Duration::from_secs),
            pipeline: PipelineOrchestrator::new(config, store, sessions, flow),
        })
    }

    /// Run cycles until done or interrupted
    pub async fn run(&self) -> AppResult<()> {
        let mut cycles = 0usize;
        let mut leads = 0usize;

        loop {
            let (result, interrupted) = self.cycle_or_interrupt().await;
            cycles += 1;

            match result {
                Ok(report) => leads += report.outcome.admitted,
                Err(AppError::Store(e)) if self.interval.is_some() && !interrupted => {
                    error!("❌ Cycle aborted by store error: {}, retrying next interval", e);
                }
                Err(e) => return Err(e),
            }

            if interrupted {
                warn!("⚠️ Interrupted, shutting down after draining the cycle");
                break;
            }

            let Some(interval) = self.interval else {
                break;
            };

            info!("💤 Next cycle in {}s", interval.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    warn!("⚠️ Interrupted while idle, shutting down");
                    break;
                }
            }
        }

        print_final_stats(cycles, leads);
        Ok(())
    }

    /// One cycle raced against Ctrl-C; an interrupt still drains the cycle
    async fn cycle_or_interrupt(&self) -> (AppResult<CycleReport>, bool) {
        let cycle = self.pipeline.run_cycle();
        tokio::pin!(cycle);

        tokio::select! {
            result = &mut cycle => (result, false),
            _ = tokio::signal::ctrl_c() => {
                warn!("⚠️ Ctrl-C received, letting workers finish their current query");
                self.pipeline.request_stop();
                (cycle.await, true)
            }
        }
    }
}

fn build_enricher(config: &Config) -> Arc<dyn Enricher> {
    if config.llm.api_key.is_empty() {
        warn!("⚠️ No LLM API key configured, leads get generic enrichment");
        Arc::new(FallbackEnricher)
    } else {
        info!("🤖 Enrichment model: {}", config.llm.model_name);
        Arc::new(LlmEnricher::new(&config.llm))
    }
}

fn build_dispatcher(config: &Config) -> Arc<dyn Dispatcher> {
    match (&config.discord.webhook_url, config.dry_run) {
        (Some(url), false) => Arc::new(DiscordDispatcher::new(url.clone())),
        _ => {
            info!("📝 Leads will be logged, not sent");
            Arc::new(LogDispatcher)
        }
    }
}

// ========== log helpers ==========

fn print_final_stats(cycles: usize, leads: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 Run finished");
    info!("{}", "=".repeat(60));
    info!("🔁 Cycles: {}", cycles);
    info!("✅ New leads: {}", leads);
    info!("{}", "=".repeat(60));
}
