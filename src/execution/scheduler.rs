//! Execution scheduler - determines which tasks to run next

use crate::core::PipelineRun;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strategy for scheduling task execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchedulingStrategy {
    /// Execute tasks in dependency order, one at a time
    #[default]
    Sequential,

    /// Execute all ready tasks in parallel
    Parallel,

    /// Limited parallelism (max N concurrent tasks)
    LimitedParallel(usize),
}

impl fmt::Display for SchedulingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingStrategy::Sequential => f.write_str("sequential"),
            SchedulingStrategy::Parallel => f.write_str("parallel"),
            SchedulingStrategy::LimitedParallel(max) => write!(f, "parallel-limited:{}", max),
        }
    }
}

/// Scheduler for determining which tasks to run
#[derive(Debug, Clone, Default)]
pub struct ExecutionScheduler {
    strategy: SchedulingStrategy,
}

impl ExecutionScheduler {
    pub fn new(strategy: SchedulingStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SchedulingStrategy {
        self.strategy
    }

    /// Get the next batch of tasks to start
    pub fn next_tasks(&self, run: &PipelineRun) -> Vec<String> {
        match self.strategy {
            SchedulingStrategy::Sequential => self.next_limited_parallel(run, 1),
            SchedulingStrategy::Parallel => self.next_parallel(run),
            SchedulingStrategy::LimitedParallel(max) => self.next_limited_parallel(run, max),
        }
    }

    fn next_parallel(&self, run: &PipelineRun) -> Vec<String> {
        run.ready_tasks().iter().map(|t| t.id.clone()).collect()
    }

    fn next_limited_parallel(&self, run: &PipelineRun, max: usize) -> Vec<String> {
        let running_count = run.running_tasks().len();
        let remaining = max.saturating_sub(running_count);

        if remaining == 0 {
            return vec![];
        }

        run.ready_tasks()
            .into_iter()
            .take(remaining)
            .map(|t| t.id.clone())
            .collect()
    }
}
