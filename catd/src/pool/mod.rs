//! Bounded worker pool
//!
//! Priority queue, per-task retry with exponential backoff, one-shot result
//! futures, results cache, and health monitoring.

mod config;
mod core;
mod error;
mod handler;
mod queue;

pub use config::PoolConfig;
pub use core::WorkerPool;
pub use error::PoolError;
pub use handler::TaskHandler;
pub use queue::{PoolStats, PoolStatus, WorkerSnapshot};
