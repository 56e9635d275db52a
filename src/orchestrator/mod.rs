//! Orchestration layer
//!
//! Scheduling and resources only, no business decisions:
//!
//! ```text
//! batch_processor::App        (cycles, Ctrl-C, backend wiring)
//!     ↓
//! pipeline::PipelineOrchestrator (one cycle: purge → rotate → fan out → drain)
//!     ↓
//! lane_processor              (one worker: its session and its queries)
//!     ↓
//! workflow::QueryFlow         (one query)
//! ```
//!
//! Browser sessions are only ever owned here, one per lane.

pub mod batch_processor;
pub mod lane_processor;
pub mod pipeline;

pub use batch_processor::App;
pub use lane_processor::LaneReport;
pub use pipeline::{CycleReport, PipelineOrchestrator};
