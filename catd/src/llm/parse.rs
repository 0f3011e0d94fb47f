//! Structured-reply extraction from raw model output
//!
//! Models are asked to answer with a single JSON object, but local models
//! routinely wrap it in markdown fences, prose, comments, or near-JSON.
//! Extraction is strict-first: take the first balanced object, try a strict
//! parse, then apply conservative cleanup before giving up.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```(?:json)?").unwrap());
static LINE_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"//[^\n]*").unwrap());
static BLOCK_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static SINGLE_QUOTED_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'([^']*)'(\s*:)").unwrap());
static SINGLE_QUOTED_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":\s*'([^']*)'").unwrap());
static TRAILING_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*([}\]])").unwrap());

/// Parse a model reply into a JSON object map
///
/// Never fails: when no object can be recovered, the returned map carries
/// the raw text under `raw_response` plus an `error` marker, and the
/// caller's validation/retry path takes over.
pub fn parse_reply(text: &str) -> Map<String, Value> {
    if let Some(candidate) = extract_object(text) {
        if let Ok(Value::Object(map)) = serde_json::from_str(&candidate) {
            return map;
        }

        let cleaned = clean_json(&candidate);
        if let Ok(Value::Object(map)) = serde_json::from_str(&cleaned) {
            return map;
        }

        warn!(candidate_len = candidate.len(), "reply candidate did not parse after cleanup");
    }

    let mut map = Map::new();
    map.insert("raw_response".to_string(), Value::String(text.to_string()));
    map.insert("error".to_string(), Value::String("JSON parsing failed".to_string()));
    map
}

/// Extract the first balanced `{...}` substring, string-aware
fn extract_object(text: &str) -> Option<String> {
    let stripped = FENCE_RE.replace_all(text, "");
    let start = stripped.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in stripped[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(stripped[start..start + offset + c.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// Repair common near-JSON issues in model output
///
/// Applied only after a strict parse has failed, so a well-formed reply is
/// never touched. Quote conversion only fires on clearly delimited keys
/// and values, leaving apostrophes inside double-quoted strings alone.
fn clean_json(candidate: &str) -> String {
    let cleaned = LINE_COMMENT_RE.replace_all(candidate, "");
    let cleaned = BLOCK_COMMENT_RE.replace_all(&cleaned, "");
    let cleaned = SINGLE_QUOTED_KEY_RE.replace_all(&cleaned, "\"$1\"$2");
    let cleaned = SINGLE_QUOTED_VALUE_RE.replace_all(&cleaned, ": \"$1\"");
    TRAILING_COMMA_RE.replace_all(&cleaned, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_clean_object() {
        let reply = parse_reply(r#"{"meta_title": "Red Hat", "seo_keywords": "red,hat"}"#);
        assert_eq!(reply["meta_title"], "Red Hat");
        assert_eq!(reply["seo_keywords"], "red,hat");
    }

    #[test]
    fn test_parse_fenced_object_with_prose() {
        let text = "Here is the result:\n```json\n{\"optimized_title\": \"Better Hat\"}\n```\nHope that helps!";
        let reply = parse_reply(text);
        assert_eq!(reply["optimized_title"], "Better Hat");
    }

    #[test]
    fn test_parse_trailing_commas() {
        let reply = parse_reply(r#"{"primary_keywords": ["hat", "red",], "long_tail_keywords": [],}"#);
        assert_eq!(reply["primary_keywords"][1], "red");
    }

    #[test]
    fn test_parse_single_quoted_keys_and_values() {
        let reply = parse_reply(r#"{'meta_title': 'Red Hat', "meta_description": "A hat."}"#);
        assert_eq!(reply["meta_title"], "Red Hat");
        assert_eq!(reply["meta_description"], "A hat.");
    }

    #[test]
    fn test_parse_comments_stripped() {
        let text = "{\n  \"schema_compliance\": true, // looks fine\n  /* nothing found */\n  \"issues\": []\n}";
        let reply = parse_reply(text);
        assert_eq!(reply["schema_compliance"], true);
    }

    #[test]
    fn test_parse_braces_inside_strings() {
        let reply = parse_reply(r#"{"optimized_description": "use {curly} braces"}"#);
        assert_eq!(reply["optimized_description"], "use {curly} braces");
    }

    #[test]
    fn test_parse_garbage_returns_raw_response() {
        let reply = parse_reply("I could not produce JSON, sorry.");
        assert_eq!(reply["error"], "JSON parsing failed");
        assert_eq!(reply["raw_response"], "I could not produce JSON, sorry.");
    }

    #[test]
    fn test_parse_unbalanced_returns_raw_response() {
        let reply = parse_reply(r#"{"meta_title": "Red Hat""#);
        assert_eq!(reply["error"], "JSON parsing failed");
    }

    #[test]
    fn test_apostrophes_in_double_quoted_strings_survive() {
        let reply = parse_reply(r#"{"meta_description": "It's a great hat"}"#);
        assert_eq!(reply["meta_description"], "It's a great hat");
    }

    proptest! {
        // A valid reply parses to the same map on a second pass
        #[test]
        fn test_parse_is_idempotent_for_valid_objects(
            entries in prop::collection::btree_map("[a-z_]{1,12}", "[a-zA-Z0-9 ',.]{0,24}", 1..6)
        ) {
            let map: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            let text = serde_json::to_string(&Value::Object(map.clone())).unwrap();

            let first = parse_reply(&text);
            prop_assert_eq!(&first, &map);

            let second = parse_reply(&serde_json::to_string(&Value::Object(first.clone())).unwrap());
            prop_assert_eq!(second, first);
        }
    }
}
