//! Handler seam between the pool and task execution

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::TaskType;

/// Executes one task's payload into a reply map
///
/// The pool owns retries and result publication; handlers only turn a
/// payload into a reply or an error. Implementations must be safe to call
/// concurrently from every worker.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task_type: TaskType, payload: &Map<String, Value>) -> eyre::Result<Map<String, Value>>;
}
