//! Queue types for the worker pool

use serde::Serialize;

use crate::domain::{Task, WorkerStatus};

/// A task waiting in the priority queue
#[derive(Debug)]
pub(crate) struct QueuedTask {
    pub task: Task,
    /// Monotonic submission counter, breaks ties FIFO
    pub seq: u64,
}

impl Eq for QueuedTask {}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.task.task_id == other.task.task_id
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap: lower priority value first,
        // then earlier submission
        other
            .task
            .priority
            .cmp(&self.task.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Aggregate pool statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct PoolStats {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub avg_execution_time: f64,
}

/// Point-in-time snapshot of the pool
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub total_workers: usize,
    pub active_workers: usize,
    pub idle_workers: usize,
    pub error_workers: usize,
    pub queue_depth: usize,
    pub stats: PoolStats,
}

/// Snapshot of one worker slot
#[derive(Debug, Clone)]
pub struct WorkerSnapshot {
    pub worker_id: String,
    pub status: WorkerStatus,
    pub current_task: Option<String>,
    pub task_count: u64,
    pub error_count: u64,
}
