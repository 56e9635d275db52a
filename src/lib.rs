//! # Lead Engine
//!
//! Finds local businesses through a search engine's local results, turns them
//! into deduplicated leads and pushes them to a sales channel.
//!
//! ## Architecture
//!
//! Four strict layers:
//!
//! ### ① Infrastructure
//! - `browser/` - owns Chromium sessions and pages, exposes [`browser::SearchPage`]
//! - `infrastructure/` - `JsExecutor` and the [`infrastructure::LeadStore`] backends
//!
//! ### ② Services
//! - `services/` - what can be done with one query or one candidate
//! - `ResultPageNavigator` - search home → local results state machine
//! - `FieldExtractor` - result cards → candidates
//! - `PhoneNormalizer`, `QueryRotator`, `LeadIntake`
//! - `Enricher`, `MessageGenerator`, `Dispatcher`
//!
//! ### ③ Workflow
//! - `workflow/` - the full handling of one query
//! - `QueryCtx` - which query of which cycle
//! - `QueryFlow` - navigate → extract → admit → enrich → persist → dispatch
//!
//! ### ④ Orchestration
//! - `orchestrator/pipeline` - one cycle across worker lanes
//! - `orchestrator/batch_processor` - the `App`: backends, cycles, shutdown

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// Commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{LeadStore, MemoryStore, SqliteStore};
pub use models::{Country, QueryTask, ScrapedCandidate};
pub use orchestrator::{App, CycleReport, PipelineOrchestrator};
pub use workflow::{QueryCtx, QueryFlow, QueryOutcome};
