//! Bounded HTML-to-text conversion for prompt building

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::TaskType;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Word budget for the description slot of each task's prompt
pub fn word_budget(task_type: TaskType) -> usize {
    match task_type {
        TaskType::MetaOptimization => 500,
        TaskType::ContentRewriting => 800,
        TaskType::KeywordAnalysis => 600,
        TaskType::TagOptimization => 800,
        TaskType::SchemaAnalysis => 400,
        TaskType::CategoryNormalization => 200,
    }
}

/// Convert product HTML to bounded plain text
///
/// Tags are rewritten to text, whitespace collapsed, and the result
/// truncated to `max_words` words.
pub fn clean_html(html: &str, max_words: usize) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let text = html2md::rewrite_html(html, false);
    let collapsed = WHITESPACE_RE.replace_all(&text, " ");
    truncate_words(collapsed.trim(), max_words)
}

/// Keep at most `max_words` whitespace-separated words
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let mut words = text.split_whitespace();
    let truncated: Vec<&str> = words.by_ref().take(max_words).collect();
    truncated.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_html_strips_tags() {
        let text = clean_html("<p>A <strong>red</strong> hat.</p>", 100);
        assert!(!text.contains('<'));
        assert!(text.contains("red"));
        assert!(text.contains("hat"));
    }

    #[test]
    fn test_clean_html_collapses_whitespace() {
        let text = clean_html("<p>A\n\n   hat.</p>\n<p>Warm.</p>", 100);
        assert!(!text.contains('\n'));
        assert!(!text.contains("  "));
    }

    #[test]
    fn test_clean_html_empty_input() {
        assert_eq!(clean_html("", 100), "");
        assert_eq!(clean_html("   ", 100), "");
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("one two three four", 2), "one two");
        assert_eq!(truncate_words("one two", 10), "one two");
        assert_eq!(truncate_words("", 10), "");
    }

    #[test]
    fn test_clean_html_respects_budget() {
        let html = format!("<p>{}</p>", "word ".repeat(1000));
        let text = clean_html(&html, 50);
        assert_eq!(text.split_whitespace().count(), 50);
    }

    #[test]
    fn test_every_task_type_has_a_budget() {
        for task_type in TaskType::ALL {
            assert!(word_budget(task_type) > 0);
        }
    }
}
