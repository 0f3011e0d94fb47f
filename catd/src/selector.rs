//! Model selection for task types
//!
//! Picks the first declared-capable model that is currently available,
//! falling back to the configured fallback order. Availability verdicts
//! are cached briefly to avoid probe storms when a batch fans out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::ModelCapability;
use crate::domain::TaskType;
use crate::llm::ModelClient;

/// How long an availability verdict stays trusted
const AVAILABILITY_TTL: Duration = Duration::from_secs(30);

/// Errors from model selection
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("No model available for task type {task_type}")]
    NoModelAvailable { task_type: TaskType },
}

/// Selects the best available model for a task type
pub struct ModelSelector {
    client: Arc<dyn ModelClient>,
    capabilities: Vec<ModelCapability>,
    fallback_order: Vec<String>,
    /// model -> (verdict, probed at); races only cost a redundant probe
    availability: Mutex<HashMap<String, (bool, Instant)>>,
}

impl ModelSelector {
    pub fn new(client: Arc<dyn ModelClient>, capabilities: Vec<ModelCapability>, fallback_order: Vec<String>) -> Self {
        Self {
            client,
            capabilities,
            fallback_order,
            availability: Mutex::new(HashMap::new()),
        }
    }

    /// Return the best available model name for a task type
    ///
    /// Capability declarations are tried in declaration order, then the
    /// fallback order.
    pub async fn select(&self, task_type: TaskType) -> Result<String, SelectorError> {
        for capability in &self.capabilities {
            if capability.tasks.contains(&task_type) && self.check(&capability.model).await {
                debug!(model = %capability.model, %task_type, "selected declared-capable model");
                return Ok(capability.model.clone());
            }
        }

        for model in &self.fallback_order {
            if self.check(model).await {
                debug!(%model, %task_type, "selected fallback model");
                return Ok(model.clone());
            }
        }

        Err(SelectorError::NoModelAvailable { task_type })
    }

    /// First fallback-order model that differs from `current`
    pub fn next_fallback(&self, current: &str) -> Option<&str> {
        self.fallback_order
            .iter()
            .map(String::as_str)
            .find(|model| *model != current)
    }

    /// Declared token budget for a model, or a safe default
    pub fn max_tokens(&self, model: &str) -> u32 {
        self.capabilities
            .iter()
            .find(|c| c.model == model)
            .map(|c| c.max_tokens)
            .unwrap_or(1024)
    }

    async fn check(&self, model: &str) -> bool {
        {
            let cache = self.availability.lock().await;
            if let Some((verdict, probed_at)) = cache.get(model)
                && probed_at.elapsed() < AVAILABILITY_TTL
            {
                return *verdict;
            }
        }

        let verdict = self.client.is_available(model).await;
        self.availability
            .lock()
            .await
            .insert(model.to_string(), (verdict, Instant::now()));
        verdict
    }
}
