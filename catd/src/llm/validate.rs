//! Per-task reply validation

use serde_json::{Map, Value};

use crate::domain::TaskType;

/// Fields a reply must carry to count as a usable answer for a task type
pub fn required_fields(task_type: TaskType) -> &'static [&'static str] {
    match task_type {
        TaskType::MetaOptimization => &["meta_title", "meta_description", "seo_keywords"],
        TaskType::ContentRewriting => &["optimized_title", "optimized_description"],
        TaskType::KeywordAnalysis => &["primary_keywords", "long_tail_keywords"],
        TaskType::TagOptimization => &["optimized_tags", "removed_tags", "added_tags"],
        TaskType::SchemaAnalysis => &["schema_compliance", "issues"],
        // Final values come from the taxonomy matcher, not the model
        TaskType::CategoryNormalization => &[],
    }
}

/// True iff every required field for the task type is present
pub fn validate_reply(reply: &Map<String, Value>, task_type: TaskType) -> bool {
    required_fields(task_type).iter().all(|field| reply.contains_key(*field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_meta_optimization_requires_all_three() {
        let full = as_map(json!({
            "meta_title": "Red Hat",
            "meta_description": "Buy a red hat.",
            "seo_keywords": "red,hat"
        }));
        assert!(validate_reply(&full, TaskType::MetaOptimization));

        let partial = as_map(json!({"meta_title": "Red Hat"}));
        assert!(!validate_reply(&partial, TaskType::MetaOptimization));
    }

    #[test]
    fn test_unrelated_fields_do_not_validate() {
        let reply = as_map(json!({"foo": "bar"}));
        assert!(!validate_reply(&reply, TaskType::KeywordAnalysis));
        assert!(!validate_reply(&reply, TaskType::TagOptimization));
        assert!(!validate_reply(&reply, TaskType::SchemaAnalysis));
    }

    #[test]
    fn test_category_normalization_has_no_required_fields() {
        assert!(validate_reply(&Map::new(), TaskType::CategoryNormalization));
    }

    #[test]
    fn test_tag_optimization_fields() {
        let reply = as_map(json!({
            "optimized_tags": "a, b",
            "removed_tags": ["c"],
            "added_tags": ["d"]
        }));
        assert!(validate_reply(&reply, TaskType::TagOptimization));
    }
}
