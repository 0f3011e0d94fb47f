//! Mapping from task replies to product mutations

use serde_json::{Map, Value};

use crate::domain::ProductUpdate;

/// Derive the product column updates a reply implies
///
/// `meta_title` and `optimized_title` both target the title; the rewrite
/// wins when both are present. Category fields pass through unchanged.
pub fn derive_update(reply: &Map<String, Value>) -> ProductUpdate {
    let mut update = ProductUpdate::default();

    if let Some(title) = reply.get("meta_title").and_then(Value::as_str) {
        update.title = Some(title.to_string());
    }
    if let Some(title) = reply.get("optimized_title").and_then(Value::as_str) {
        update.title = Some(title.to_string());
    }
    if let Some(body) = reply.get("optimized_description").and_then(Value::as_str) {
        update.body_html = Some(body.to_string());
    }
    if let Some(category) = reply.get("normalized_category").and_then(Value::as_str) {
        update.normalized_category = Some(category.to_string());
    }
    if let Some(confidence) = reply.get("category_confidence").and_then(Value::as_f64) {
        update.category_confidence = Some(confidence);
    }

    update
}

/// Normalize a reply's tag value into a trimmed, non-empty list
///
/// Models answer with either a comma-separated string or a JSON list.
pub fn normalize_tags(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
