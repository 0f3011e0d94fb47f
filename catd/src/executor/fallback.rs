//! Rule-based fallback replies
//!
//! Deterministic, safe defaults returned only after every model attempt
//! has failed. Always marked with `fallback_used: true` so downstream
//! analytics can tell them apart from model output.

use serde_json::{Map, Value, json};

use crate::domain::TaskType;

/// Deterministic reply for a task type
pub fn rule_based_fallback(task_type: TaskType) -> Map<String, Value> {
    let value = match task_type {
        TaskType::MetaOptimization => json!({
            "meta_title": "Optimized Product",
            "meta_description": "Quality product with excellent features and competitive pricing.",
            "seo_keywords": "product, quality, features, buy",
            "fallback_used": true,
        }),
        TaskType::ContentRewriting => json!({
            "optimized_title": "Enhanced Product Version",
            "optimized_description": "<p>Improved product description with better features.</p>",
            "content_score": 0.5,
            "improvements": ["Basic content optimization applied"],
            "fallback_used": true,
        }),
        TaskType::KeywordAnalysis => json!({
            "primary_keywords": ["product", "features"],
            "long_tail_keywords": ["quality product features"],
            "competitor_terms": ["similar products"],
            "difficulty_estimate": "medium",
            "fallback_used": true,
        }),
        TaskType::TagOptimization => json!({
            "optimized_tags": "product, quality, features",
            "removed_tags": ["old_irrelevant_tag"],
            "added_tags": ["new_relevant_tag"],
            "tag_analysis": "Basic tag optimization applied",
            "fallback_used": true,
        }),
        TaskType::SchemaAnalysis => json!({
            "schema_compliance": true,
            "issues": [],
            "fallback_used": true,
        }),
        TaskType::CategoryNormalization => json!({
            "category": Value::Null,
            "fallback_used": true,
        }),
    };

    match value {
        Value::Object(map) => map,
        _ => unreachable!("fallback replies are objects"),
    }
}
