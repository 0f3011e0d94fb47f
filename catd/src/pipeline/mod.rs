//! Batch orchestration over the worker pool

mod coordinator;
pub mod updates;

pub use coordinator::{BatchCoordinator, BatchReport, OutcomeStatus, ProductOutcome};
