//! Task execution against the model runtime
//!
//! Turns one product payload into a validated reply map: render the task's
//! prompt, call the selected model with bounded retries and model fallback,
//! and fall back to a deterministic rule-based reply on exhaustion.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::fallback::rule_based_fallback;
use super::html::{clean_html, word_budget};
use crate::domain::TaskType;
use crate::llm::{GenerateOptions, ModelClient, parse, validate};
use crate::pool::TaskHandler;
use crate::prompts::{PromptContext, PromptLoader};
use crate::selector::ModelSelector;
use crate::taxonomy::TaxonomyMatcher;

/// Executor tuning knobs
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Model attempts before the rule-based fallback
    pub retry_attempts: u32,
    /// model -> quantized variant, substituted when a payload asks for it
    pub quantized: HashMap<String, String>,
    pub temperature: f64,
    pub top_p: f64,
    /// Taxonomy paths offered to the normalization prompt
    pub taxonomy_sample: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            quantized: HashMap::new(),
            temperature: 0.3,
            top_p: 0.9,
            taxonomy_sample: 200,
        }
    }
}

/// Executes one product+task into a reply map
pub struct TaskExecutor {
    client: Arc<dyn ModelClient>,
    selector: Arc<ModelSelector>,
    prompts: PromptLoader,
    matcher: Arc<TaxonomyMatcher>,
    config: ExecutorConfig,
}

impl TaskExecutor {
    pub fn new(
        client: Arc<dyn ModelClient>,
        selector: Arc<ModelSelector>,
        prompts: PromptLoader,
        matcher: Arc<TaxonomyMatcher>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            client,
            selector,
            prompts,
            matcher,
            config,
        }
    }

    fn context_for(&self, task_type: TaskType, payload: &Map<String, Value>) -> PromptContext {
        let field = |name: &str| payload.get(name).and_then(Value::as_str).unwrap_or("").to_string();

        let body_html = field("body_html");
        let sample_categories = if task_type == TaskType::CategoryNormalization {
            self.matcher.tree().sample(self.config.taxonomy_sample).join("\n")
        } else {
            String::new()
        };

        PromptContext {
            title: field("title"),
            product_type: field("product_type"),
            tags: field("tags"),
            description: clean_html(&body_html, word_budget(task_type)),
            sample_categories,
        }
    }

    /// Model name to send, honoring the payload's quantize flag
    fn effective_model(&self, model: &str, payload: &Map<String, Value>) -> String {
        let quantize = payload.get("quantize").and_then(Value::as_bool).unwrap_or(false);
        if quantize
            && let Some(quantized) = self.config.quantized.get(model)
        {
            debug!(model, quantized, "substituting quantized model");
            return quantized.clone();
        }
        model.to_string()
    }

    fn options_for(&self, model: &str) -> GenerateOptions {
        GenerateOptions {
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            num_predict: self.selector.max_tokens(model),
        }
    }

    /// Standard enrichment: retries across fallback models, then the
    /// rule-based reply
    async fn enrich(&self, task_type: TaskType, payload: &Map<String, Value>) -> Result<Map<String, Value>> {
        let mut model = self.selector.select(task_type).await?;
        let prompt = self.prompts.render(task_type, &self.context_for(task_type, payload))?;

        for attempt in 0..self.config.retry_attempts.max(1) {
            let effective = self.effective_model(&model, payload);
            match self.client.generate(&effective, &prompt, self.options_for(&model)).await {
                Ok(text) => {
                    let mut reply = parse::parse_reply(&text);
                    if validate::validate_reply(&reply, task_type) {
                        info!(model = %effective, %task_type, "validated model reply");
                        reply.insert("model_used".to_string(), Value::String(effective));
                        return Ok(reply);
                    }
                    warn!(
                        model = %effective,
                        %task_type,
                        attempt = attempt + 1,
                        "reply failed validation"
                    );
                }
                Err(e) => {
                    warn!(
                        model = %effective,
                        %task_type,
                        attempt = attempt + 1,
                        error = %e,
                        "generation failed"
                    );
                }
            }

            // Never the same model twice in a row
            match self.selector.next_fallback(&model) {
                Some(next) => model = next.to_string(),
                None => break,
            }
        }

        info!(%task_type, "model attempts exhausted, using rule-based fallback");
        Ok(rule_based_fallback(task_type))
    }

    /// Category normalization: the model only proposes a candidate; the
    /// taxonomy matcher always produces the final path and confidence
    async fn normalize_category(&self, payload: &Map<String, Value>) -> Result<Map<String, Value>> {
        let original = payload
            .get("product_type")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let candidate = self.category_candidate(payload).await;
        let (path, confidence) = self.matcher.resolve(candidate.as_deref(), &original);

        let mut reply = Map::new();
        reply.insert("normalized_category".to_string(), Value::String(path));
        reply.insert(
            "category_confidence".to_string(),
            serde_json::Number::from_f64(confidence)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        );
        reply.insert("original_category".to_string(), Value::String(original));
        Ok(reply)
    }

    /// Best-effort candidate from the model; any failure yields None
    async fn category_candidate(&self, payload: &Map<String, Value>) -> Option<String> {
        let task_type = TaskType::CategoryNormalization;
        let mut model = self.selector.select(task_type).await.ok()?;
        let prompt = self.prompts.render(task_type, &self.context_for(task_type, payload)).ok()?;

        for _attempt in 0..self.config.retry_attempts.max(1) {
            let effective = self.effective_model(&model, payload);
            match self.client.generate(&effective, &prompt, self.options_for(&model)).await {
                Ok(text) => {
                    let reply = parse::parse_reply(&text);
                    return ["category", "normalized_category", "product_type"]
                        .iter()
                        .find_map(|key| reply.get(*key))
                        .and_then(Value::as_str)
                        .map(str::to_string);
                }
                Err(e) => {
                    debug!(model = %effective, error = %e, "candidate generation failed");
                    match self.selector.next_fallback(&model) {
                        Some(next) => model = next.to_string(),
                        None => break,
                    }
                }
            }
        }

        None
    }
}

#[async_trait]
impl TaskHandler for TaskExecutor {
    async fn handle(&self, task_type: TaskType, payload: &Map<String, Value>) -> Result<Map<String, Value>> {
        match task_type {
            TaskType::CategoryNormalization => self.normalize_category(payload).await,
            _ => self.enrich(task_type, payload).await,
        }
    }
}
