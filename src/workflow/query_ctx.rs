//! Query processing context
//!
//! Wraps "which query of which cycle am I working on"

use std::fmt::Display;

use crate::models::QueryTask;

#[derive(Debug, Clone)]
pub struct QueryCtx {
    pub cycle: u64,
    /// 1-based position in the cycle's batch (log display only)
    pub query_index: usize,
    pub worker: usize,
    pub task: QueryTask,
}

impl QueryCtx {
    pub fn new(cycle: u64, query_index: usize, worker: usize, task: QueryTask) -> Self {
        Self {
            cycle,
            query_index,
            worker,
            task,
        }
    }
}

impl Display for QueryCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[cycle #{} query #{} worker #{} {} {}/{}]",
            self.cycle,
            self.query_index,
            self.worker,
            self.task.country.code(),
            self.task.location,
            self.task.industry
        )
    }
}
