//! Task and result records passed through the worker pool

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Enrichment operation applied to a single product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    MetaOptimization,
    ContentRewriting,
    KeywordAnalysis,
    TagOptimization,
    CategoryNormalization,
    SchemaAnalysis,
}

impl TaskType {
    /// All task types, in pipeline order
    pub const ALL: [TaskType; 6] = [
        TaskType::MetaOptimization,
        TaskType::ContentRewriting,
        TaskType::KeywordAnalysis,
        TaskType::TagOptimization,
        TaskType::CategoryNormalization,
        TaskType::SchemaAnalysis,
    ];

    /// Wire/storage name of this task type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetaOptimization => "meta_optimization",
            Self::ContentRewriting => "content_rewriting",
            Self::KeywordAnalysis => "keyword_analysis",
            Self::TagOptimization => "tag_optimization",
            Self::CategoryNormalization => "category_normalization",
            Self::SchemaAnalysis => "schema_analysis",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "meta_optimization" | "meta" => Ok(Self::MetaOptimization),
            "content_rewriting" | "content" => Ok(Self::ContentRewriting),
            "keyword_analysis" | "keywords" => Ok(Self::KeywordAnalysis),
            "tag_optimization" | "tags" => Ok(Self::TagOptimization),
            "category_normalization" | "categories" => Ok(Self::CategoryNormalization),
            "schema_analysis" | "schema" => Ok(Self::SchemaAnalysis),
            _ => Err(format!("Unknown task type: {}", s)),
        }
    }
}

/// One unit of work for the pool
#[derive(Debug, Clone)]
pub struct Task {
    /// Opaque unique id, assigned at submit
    pub task_id: String,
    pub task_type: TaskType,
    /// Product fields plus flags, owned by the pool after submit
    pub payload: Map<String, Value>,
    /// Lower value = served first
    pub priority: i32,
    pub created_at: Instant,
}

impl Task {
    pub fn new(task_id: impl Into<String>, task_type: TaskType, payload: Map<String, Value>, priority: i32) -> Self {
        Self {
            task_id: task_id.into(),
            task_type,
            payload,
            priority,
            created_at: Instant::now(),
        }
    }
}

/// Outcome of a task, published exactly once
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub task_id: String,
    pub success: bool,
    /// Validated reply map on success, empty otherwise
    pub value: Map<String, Value>,
    pub error: Option<String>,
    /// Wall-clock execution time in seconds
    pub execution_time: f64,
}

impl TaskResult {
    /// Create a successful result
    pub fn ok(task_id: impl Into<String>, value: Map<String, Value>, execution_time: f64) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            value,
            error: None,
            execution_time,
        }
    }

    /// Create a failed result carrying the last error message
    pub fn failed(task_id: impl Into<String>, error: impl Into<String>, execution_time: f64) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            value: Map::new(),
            error: Some(error.into()),
            execution_time,
        }
    }
}

/// State of one execution slot in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Idle,
    Busy,
    Error,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_roundtrip() {
        for task_type in TaskType::ALL {
            let parsed: TaskType = task_type.as_str().parse().unwrap();
            assert_eq!(parsed, task_type);
        }
    }

    #[test]
    fn test_task_type_short_aliases() {
        assert_eq!("meta".parse::<TaskType>().unwrap(), TaskType::MetaOptimization);
        assert_eq!("tags".parse::<TaskType>().unwrap(), TaskType::TagOptimization);
        assert!("bogus".parse::<TaskType>().is_err());
    }

    #[test]
    fn test_task_type_serde() {
        let json = serde_json::to_string(&TaskType::KeywordAnalysis).unwrap();
        assert_eq!(json, "\"keyword_analysis\"");

        let parsed: TaskType = serde_json::from_str("\"category_normalization\"").unwrap();
        assert_eq!(parsed, TaskType::CategoryNormalization);
    }

    #[test]
    fn test_result_constructors() {
        let ok = TaskResult::ok("t-1", Map::new(), 0.5);
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = TaskResult::failed("t-2", "boom", 1.0);
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(failed.value.is_empty());
    }
}
