//! In-memory catalog store
//!
//! Backs integration tests and the CLI's seeded runs. Mirrors the
//! contract of the external database adapter, including last-writer-wins
//! on concurrent tag replacement.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{CatalogStore, StoreError};
use crate::domain::{ChangeLogEntry, PipelineRun, Product, ProductUpdate, RunStatus, TaskType};

/// HashMap-backed CatalogStore
#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<HashMap<i64, Product>>,
    change_log: RwLock<Vec<ChangeLogEntry>>,
    runs: RwLock<HashMap<i64, PipelineRun>>,
    next_run_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_run_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    /// Insert or replace a product record
    pub async fn insert_product(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }

    /// Seed several products at once
    pub async fn seed(&self, products: impl IntoIterator<Item = Product>) {
        let mut map = self.products.write().await;
        for product in products {
            map.insert(product.id, product);
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_product(&self, id: i64) -> Result<Option<Product>, StoreError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<(), StoreError> {
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or(StoreError::ProductNotFound(id))?;

        if let Some(title) = update.title {
            product.title = title;
        }
        if let Some(body_html) = update.body_html {
            product.body_html = body_html;
        }
        if let Some(normalized) = update.normalized_category {
            product.normalized_category = Some(normalized);
        }
        if let Some(confidence) = update.category_confidence {
            product.category_confidence = Some(confidence);
        }
        Ok(())
    }

    async fn replace_product_tags(&self, id: i64, tags: Vec<String>) -> Result<(), StoreError> {
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or(StoreError::ProductNotFound(id))?;
        product.tags = tags.join(", ");
        Ok(())
    }

    async fn append_change_log(&self, entry: ChangeLogEntry) -> Result<(), StoreError> {
        self.change_log.write().await.push(entry);
        Ok(())
    }

    async fn create_pipeline_run(&self, task_type: TaskType, total: u32) -> Result<i64, StoreError> {
        let run_id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        self.runs.write().await.insert(run_id, PipelineRun::new(run_id, task_type, total));
        Ok(run_id)
    }

    async fn update_pipeline_run(&self, run_id: i64, processed: u32, failed: u32) -> Result<(), StoreError> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(&run_id).ok_or(StoreError::RunNotFound(run_id))?;
        run.processed = processed;
        run.failed = failed;
        Ok(())
    }

    async fn complete_pipeline_run(
        &self,
        run_id: i64,
        status: RunStatus,
        processed: u32,
        failed: u32,
    ) -> Result<(), StoreError> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(&run_id).ok_or(StoreError::RunNotFound(run_id))?;
        run.status = status;
        run.processed = processed;
        run.failed = failed;
        run.end_time = Some(Utc::now());
        Ok(())
    }

    async fn recent_pipeline_runs(&self, limit: usize) -> Result<Vec<PipelineRun>, StoreError> {
        let runs = self.runs.read().await;
        let mut all: Vec<PipelineRun> = runs.values().cloned().collect();
        all.sort_by(|a, b| b.run_id.cmp(&a.run_id));
        all.truncate(limit);
        Ok(all)
    }

    async fn change_log(&self, product_id: i64) -> Result<Vec<ChangeLogEntry>, StoreError> {
        Ok(self
            .change_log
            .read()
            .await
            .iter()
            .filter(|entry| entry.product_id == product_id)
            .cloned()
            .collect())
    }
}
