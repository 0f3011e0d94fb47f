//! Compiled-in default prompt templates
//!
//! One template per task type, named after the task type's wire value.
//! Files in the configured prompt directory override these.

pub const META_OPTIMIZATION: &str = r#"You are an e-commerce SEO specialist. Write optimized meta tags for the
product below.

Product title: {{title}}
Category: {{product_type}}
Current tags: {{tags}}
Description:
{{description}}

Rules:
- meta_title: at most 60 characters, include the main product term
- meta_description: 120-155 characters, compelling and factual
- seo_keywords: comma-separated, 5-10 terms, most relevant first

Respond with ONLY a JSON object, starting with { and ending with }:
{"meta_title": "...", "meta_description": "...", "seo_keywords": "..."}
"#;

pub const CONTENT_REWRITING: &str = r#"You are an e-commerce copywriter. Rewrite the product content below for
clarity and search relevance while keeping every factual claim.

Product title: {{title}}
Category: {{product_type}}
Description:
{{description}}

Respond with ONLY a JSON object, starting with { and ending with }:
{"optimized_title": "...", "optimized_description": "<p>...</p>"}
"#;

pub const KEYWORD_ANALYSIS: &str = r#"You are an SEO analyst. Produce a keyword analysis for the product below.

Product title: {{title}}
Category: {{product_type}}
Current tags: {{tags}}
Description:
{{description}}

Respond with ONLY a JSON object, starting with { and ending with }:
{"primary_keywords": ["..."], "long_tail_keywords": ["..."], "competitor_terms": ["..."], "difficulty_estimate": "low|medium|high"}
"#;

pub const TAG_OPTIMIZATION: &str = r#"You are an e-commerce merchandiser. Review and optimize the tag set of the
product below. Keep tags short, lowercase, and deduplicated.

Product title: {{title}}
Category: {{product_type}}
Current tags: {{tags}}
Description:
{{description}}

Respond with ONLY a JSON object, starting with { and ending with }:
{"optimized_tags": "tag1, tag2, tag3", "removed_tags": ["..."], "added_tags": ["..."]}
"#;

pub const SCHEMA_ANALYSIS: &str = r#"You are a data quality auditor. Check the product record below for
completeness: missing title, empty description, absent category, or
placeholder text.

Product title: {{title}}
Category: {{product_type}}
Current tags: {{tags}}
Description:
{{description}}

Respond with ONLY a JSON object, starting with { and ending with }:
{"schema_compliance": true, "issues": ["..."]}
"#;

pub const CATEGORY_NORMALIZATION: &str = r#"You classify products into a canonical category taxonomy. Pick the single
best-fitting path for the product below. Answer with a taxonomy path only,
never with prose.

Product title: {{title}}
Current category: {{product_type}}
Description:
{{description}}

Sample taxonomy paths:
{{sample_categories}}

Respond with ONLY a JSON object, starting with { and ending with }:
{"category": "Top Level > Mid Level > Leaf"}
"#;

/// Look up an embedded template by task type name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "meta_optimization" => Some(META_OPTIMIZATION),
        "content_rewriting" => Some(CONTENT_REWRITING),
        "keyword_analysis" => Some(KEYWORD_ANALYSIS),
        "tag_optimization" => Some(TAG_OPTIMIZATION),
        "schema_analysis" => Some(SCHEMA_ANALYSIS),
        "category_normalization" => Some(CATEGORY_NORMALIZATION),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskType;
    use crate::llm::validate::required_fields;

    #[test]
    fn test_every_task_type_has_a_template() {
        for task_type in TaskType::ALL {
            assert!(get_embedded(task_type.as_str()).is_some(), "missing template for {}", task_type);
        }
    }

    #[test]
    fn test_unknown_name_has_no_template() {
        assert!(get_embedded("nonexistent").is_none());
    }

    #[test]
    fn test_templates_mention_required_fields() {
        for task_type in TaskType::ALL {
            let template = get_embedded(task_type.as_str()).unwrap();
            for field in required_fields(task_type) {
                assert!(template.contains(field), "{} template missing field {}", task_type, field);
            }
        }
    }
}
