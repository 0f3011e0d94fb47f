//! Batch coordinator
//!
//! Orchestrates a list of product ids through one task type: creates the
//! pipeline run record, fans tasks out to the pool, consumes results in
//! submission order, persists mutations plus audit entries, and pushes
//! progress to the broadcaster.

use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use super::updates::{derive_update, normalize_tags};
use crate::domain::{ChangeLogEntry, Product, RunStatus, TaskResult, TaskType};
use crate::pool::{PoolError, WorkerPool};
use crate::progress::{CurrentRun, PROGRESS_CHANNEL, ProgressBroadcaster, ProgressEvent};
use crate::store::{CatalogStore, StoreError};

/// How many recent runs a progress event carries
const RECENT_RUNS_LIMIT: usize = 10;

/// Progress is pushed every this many completions, and once at the end
const PROGRESS_EVERY: u32 = 5;

/// Priority used for product tasks
const PRODUCT_PRIORITY: i32 = 1;

/// Per-product outcome of a batch
#[derive(Debug, Clone, Serialize)]
pub struct ProductOutcome {
    pub product_id: i64,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
    Timeout,
}

/// Summary returned to the caller once a batch finishes
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: i64,
    pub status: RunStatus,
    pub total: u32,
    pub processed: u32,
    pub failed: u32,
    pub outcomes: Vec<ProductOutcome>,
}

/// Drives one batch of products through the worker pool
pub struct BatchCoordinator {
    pool: Arc<WorkerPool>,
    store: Arc<dyn CatalogStore>,
    broadcaster: Arc<ProgressBroadcaster>,
    /// Per-result await deadline
    result_timeout: Duration,
}

impl BatchCoordinator {
    pub fn new(
        pool: Arc<WorkerPool>,
        store: Arc<dyn CatalogStore>,
        broadcaster: Arc<ProgressBroadcaster>,
        result_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            store,
            broadcaster,
            result_timeout,
        }
    }

    /// Run one task type over a list of product ids
    ///
    /// The batch always finishes: per-product failures accumulate in the
    /// report instead of aborting the run. The pipeline run ends Completed
    /// iff every product succeeded.
    pub async fn run_batch(&self, product_ids: &[i64], task_type: TaskType, quantize: bool) -> Result<BatchReport> {
        let total = product_ids.len() as u32;
        let run_id = self.store.create_pipeline_run(task_type, total).await?;
        info!(run_id, %task_type, total, "pipeline run started");

        let mut processed = 0u32;
        let mut failed = 0u32;
        let mut outcomes: Vec<ProductOutcome> = Vec::with_capacity(product_ids.len());
        let mut submitted: Vec<(String, i64)> = Vec::with_capacity(product_ids.len());

        // Fan out in submission order; workers drain concurrently
        for (position, &product_id) in product_ids.iter().enumerate() {
            match self.store.get_product(product_id).await {
                Ok(Some(product)) => {
                    let payload = Self::payload_for(&product, task_type, quantize);
                    match self.pool.submit(task_type, payload, PRODUCT_PRIORITY).await {
                        Ok(task_id) => submitted.push((task_id, product_id)),
                        Err(e) => {
                            // Saturated or stopped pool is fatal for the batch;
                            // the rest of the fan-out is written off so the
                            // run's counters still add up to the total
                            error!(product_id, error = %e, "task submission failed, aborting fan-out");
                            failed += 1;
                            outcomes.push(Self::error_outcome(product_id, e.to_string()));
                            for &remaining in &product_ids[position + 1..] {
                                failed += 1;
                                outcomes.push(Self::error_outcome(remaining, format!("Batch aborted: {}", e)));
                            }
                            break;
                        }
                    }
                }
                Ok(None) => {
                    warn!(product_id, "product not found, skipping");
                    failed += 1;
                    outcomes.push(Self::error_outcome(product_id, "Product not found".to_string()));
                }
                Err(e) => {
                    warn!(product_id, error = %e, "product fetch failed");
                    failed += 1;
                    outcomes.push(Self::error_outcome(product_id, e.to_string()));
                }
            }
        }

        // Consume in submission order; persistence for one product never
        // interleaves with another's
        for (task_id, product_id) in &submitted {
            let outcome = match self.pool.await_result(task_id, Some(self.result_timeout)).await {
                Ok(result) if result.success => match self.apply_result(*product_id, task_type, &result).await {
                    Ok(model_used) => {
                        info!(product_id, model = %model_used, "product processed");
                        ProductOutcome {
                            product_id: *product_id,
                            status: OutcomeStatus::Success,
                            error: None,
                            model_used: Some(model_used),
                        }
                    }
                    Err(e) => {
                        error!(product_id, error = %e, "persisting product result failed");
                        Self::error_outcome(*product_id, e.to_string())
                    }
                },
                Ok(result) => {
                    let message = result.error.unwrap_or_else(|| "Task failed".to_string());
                    error!(product_id, error = %message, "task failed");
                    Self::error_outcome(*product_id, message)
                }
                Err(PoolError::TaskTimeout { .. }) => {
                    error!(product_id, %task_id, "task timed out");
                    ProductOutcome {
                        product_id: *product_id,
                        status: OutcomeStatus::Timeout,
                        error: Some("Task timed out".to_string()),
                        model_used: None,
                    }
                }
                Err(e) => {
                    error!(product_id, error = %e, "awaiting task result failed");
                    Self::error_outcome(*product_id, e.to_string())
                }
            };

            if outcome.status == OutcomeStatus::Success {
                processed += 1;
            } else {
                failed += 1;
            }
            outcomes.push(outcome);

            if let Err(e) = self.store.update_pipeline_run(run_id, processed, failed).await {
                warn!(run_id, error = %e, "failed to update pipeline run counters");
            }

            let done = processed + failed;
            if done % PROGRESS_EVERY == 0 || done == total {
                self.broadcast_progress(run_id, processed, failed, total).await;
            }
        }

        let status = if failed == 0 { RunStatus::Completed } else { RunStatus::Failed };
        self.store.complete_pipeline_run(run_id, status, processed, failed).await?;
        info!(run_id, %status, processed, failed, "pipeline run finished");

        Ok(BatchReport {
            run_id,
            status,
            total,
            processed,
            failed,
            outcomes,
        })
    }

    /// Persist one successful result: product update, tag replacement,
    /// audit append - in that order, aborting on the first failure
    async fn apply_result(&self, product_id: i64, task_type: TaskType, result: &TaskResult) -> Result<String, StoreError> {
        let prior = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(StoreError::ProductNotFound(product_id))?;
        let old_snapshot = serde_json::to_value(&prior).unwrap_or(Value::Null);

        let update = derive_update(&result.value);
        if !update.is_empty() {
            self.store.update_product(product_id, update).await?;
        }

        if let Some(tags_value) = result.value.get("optimized_tags") {
            self.store.replace_product_tags(product_id, normalize_tags(tags_value)).await?;
        }

        let source = result
            .value
            .get("model_used")
            .and_then(Value::as_str)
            .unwrap_or("worker_pool")
            .to_string();

        self.store
            .append_change_log(ChangeLogEntry::new(
                product_id,
                task_type.as_str(),
                old_snapshot,
                Value::Object(result.value.clone()),
                &source,
            ))
            .await?;

        Ok(source)
    }

    async fn broadcast_progress(&self, run_id: i64, processed: u32, failed: u32, total: u32) {
        let pipeline_runs = match self.store.recent_pipeline_runs(RECENT_RUNS_LIMIT).await {
            Ok(runs) => runs,
            Err(e) => {
                warn!(error = %e, "failed to snapshot recent runs for progress event");
                Vec::new()
            }
        };

        let percentage = if total > 0 {
            processed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        self.broadcaster
            .broadcast(
                PROGRESS_CHANNEL,
                ProgressEvent::new(
                    pipeline_runs,
                    CurrentRun {
                        id: run_id,
                        processed,
                        failed,
                        total,
                        percentage,
                    },
                ),
            )
            .await;
    }

    fn payload_for(product: &Product, task_type: TaskType, quantize: bool) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("id".to_string(), json!(product.id));
        payload.insert("title".to_string(), json!(product.title));
        payload.insert("body_html".to_string(), json!(product.body_html));
        payload.insert("product_type".to_string(), json!(product.category));
        payload.insert("tags".to_string(), json!(product.tags));
        payload.insert("task_type".to_string(), json!(task_type.as_str()));
        payload.insert("quantize".to_string(), json!(quantize));
        payload
    }

    fn error_outcome(product_id: i64, error: String) -> ProductOutcome {
        ProductOutcome {
            product_id,
            status: OutcomeStatus::Error,
            error: Some(error),
            model_used: None,
        }
    }
}
