//! Per-task execution: prompts, retries, model fallback, rule-based recovery

mod core;
mod fallback;
mod html;

pub use core::{ExecutorConfig, TaskExecutor};
pub use fallback::rule_based_fallback;
pub use html::{clean_html, truncate_words, word_budget};
