//! Prompt Loader
//!
//! Renders per-task prompt templates, preferring files in the configured
//! prompt directory over the embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;
use crate::domain::TaskType;

/// Context for rendering prompt templates
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    pub title: String,
    /// Category string as imported
    pub product_type: String,
    /// Comma-separated current tags
    pub tags: String,
    /// Cleaned, truncated description text
    pub description: String,
    /// Newline-joined taxonomy sample (category normalization only)
    pub sample_categories: String,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    prompt_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader with an optional file override directory
    pub fn new(prompt_dir: Option<impl AsRef<Path>>) -> Self {
        Self {
            hbs: Self::engine(),
            prompt_dir: prompt_dir.map(|d| d.as_ref().to_path_buf()),
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        Self {
            hbs: Self::engine(),
            prompt_dir: None,
        }
    }

    // Prompts are plain text, not HTML - disable entity escaping
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by task type
    ///
    /// Checks `{prompt-dir}/{task_type}.hbs` first, then the embedded
    /// fallback.
    fn load_template(&self, task_type: TaskType) -> Result<String> {
        if let Some(ref dir) = self.prompt_dir {
            let path = dir.join(format!("{}.hbs", task_type.as_str()));
            if path.exists() {
                debug!(path = %path.display(), "loading prompt from file");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(task_type.as_str())
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", task_type))
    }

    /// Render the template for a task type with the given context
    pub fn render(&self, task_type: TaskType, context: &PromptContext) -> Result<String> {
        let template = self.load_template(task_type)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", task_type, e))
    }
}
