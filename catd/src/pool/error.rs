//! Worker pool error types

use thiserror::Error;

/// Errors surfaced by the pool's public contract
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Worker pool is not running")]
    NotRunning,

    #[error("Task queue is full")]
    QueueFull,

    #[error("Task {task_id} timed out")]
    TaskTimeout { task_id: String },

    #[error("Task {task_id} not found")]
    UnknownTask { task_id: String },

    #[error("Task {task_id} was cancelled before completing")]
    Cancelled { task_id: String },
}
