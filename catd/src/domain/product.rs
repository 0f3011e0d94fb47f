//! Catalog records: products, pipeline runs, and the audit log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TaskType;

/// A catalog product as seen by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub body_html: String,
    /// Free-form category string as imported
    pub category: String,
    /// Comma-separated tag list
    pub tags: String,
    #[serde(default)]
    pub normalized_category: Option<String>,
    #[serde(default)]
    pub category_confidence: Option<f64>,
}

/// Partial product mutation derived from a task reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub body_html: Option<String>,
    pub normalized_category: Option<String>,
    pub category_confidence: Option<f64>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body_html.is_none()
            && self.normalized_category.is_none()
            && self.category_confidence.is_none()
    }
}

/// Terminal and intermediate states of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Bookkeeping record for one batch invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: i64,
    pub task_type: TaskType,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total: u32,
    pub processed: u32,
    pub failed: u32,
}

impl PipelineRun {
    /// Create a fresh run in the Running state
    pub fn new(run_id: i64, task_type: TaskType, total: u32) -> Self {
        Self {
            run_id,
            task_type,
            status: RunStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            total,
            processed: 0,
            failed: 0,
        }
    }
}

/// Append-only audit record of one field transformation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub product_id: i64,
    /// Task type value the change belongs to
    pub field: String,
    pub old: Value,
    pub new: Value,
    /// Model name that produced the change, or a subsystem marker
    pub source: String,
    pub created_at: DateTime<Utc>,
    /// Only field that may mutate after append
    pub reviewed: bool,
}

impl ChangeLogEntry {
    pub fn new(product_id: i64, field: impl Into<String>, old: Value, new: Value, source: impl Into<String>) -> Self {
        Self {
            product_id,
            field: field.into(),
            old,
            new,
            source: source.into(),
            created_at: Utc::now(),
            reviewed: false,
        }
    }
}
