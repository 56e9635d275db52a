pub mod lead_quota;
pub mod query_ctx;
pub mod query_flow;

pub use lead_quota::LeadQuota;
pub use query_ctx::QueryCtx;
pub use query_flow::{QueryFlow, QueryOutcome};
