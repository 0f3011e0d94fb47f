//! Persistence contracts the pipeline depends on
//!
//! The production implementation lives outside this crate; the in-memory
//! implementation backs tests and the CLI.

mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ChangeLogEntry, PipelineRun, Product, ProductUpdate, RunStatus, TaskType};

pub use memory::MemoryStore;

/// Persistence failures, already stripped of backend detail
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Product {0} not found")]
    ProductNotFound(i64),

    #[error("Pipeline run {0} not found")]
    RunNotFound(i64),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Catalog persistence adapter
///
/// Change-log appends are append-only; pipeline-run mutations go through
/// the dedicated update/complete calls.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_product(&self, id: i64) -> Result<Option<Product>, StoreError>;

    /// Upsert scalar product columns
    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<(), StoreError>;

    /// Idempotent replacement of the product's tag set
    async fn replace_product_tags(&self, id: i64, tags: Vec<String>) -> Result<(), StoreError>;

    async fn append_change_log(&self, entry: ChangeLogEntry) -> Result<(), StoreError>;

    async fn create_pipeline_run(&self, task_type: TaskType, total: u32) -> Result<i64, StoreError>;

    async fn update_pipeline_run(&self, run_id: i64, processed: u32, failed: u32) -> Result<(), StoreError>;

    /// Finalize a run; sets the end time internally
    async fn complete_pipeline_run(
        &self,
        run_id: i64,
        status: RunStatus,
        processed: u32,
        failed: u32,
    ) -> Result<(), StoreError>;

    /// Most recent runs, newest first
    async fn recent_pipeline_runs(&self, limit: usize) -> Result<Vec<PipelineRun>, StoreError>;

    /// Audit readback for one product
    async fn change_log(&self, product_id: i64) -> Result<Vec<ChangeLogEntry>, StoreError>;
}
