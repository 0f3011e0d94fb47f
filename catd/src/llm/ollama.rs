//! Ollama runtime client implementation
//!
//! Implements the ModelClient trait against the local Ollama HTTP API:
//! `/api/tags` for availability and `/api/generate` for completions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{GenerateOptions, LlmError, ModelClient};
use crate::config::OllamaConfig;

/// Client for a local Ollama instance
pub struct OllamaClient {
    base_url: String,
    /// Generation calls, long timeout
    http: Client,
    /// Availability probes, short timeout
    probe: Client,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new client from configuration
    pub fn from_config(config: &OllamaConfig) -> Result<Self, LlmError> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;
        let probe = Client::builder()
            .timeout(Duration::from_secs(config.probe_timeout_secs))
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            probe,
            timeout,
        })
    }

    /// List model names the runtime currently serves
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.probe.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Upstream { status, message });
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Build the generation request body
    fn build_body(model: &str, prompt: &str, opts: GenerateOptions) -> serde_json::Value {
        serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": opts.temperature,
                "top_p": opts.top_p,
                "num_predict": opts.num_predict,
            },
        })
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn is_available(&self, model: &str) -> bool {
        // Cheap catalog probe first
        match self.list_models().await {
            Ok(models) => {
                if models.iter().any(|m| m == model) {
                    return true;
                }
            }
            Err(e) => {
                debug!(model, error = %e, "availability probe failed");
                return false;
            }
        }

        // Not in the catalog - a minimal generation call settles it
        let url = format!("{}/api/generate", self.base_url);
        let body = serde_json::json!({"model": model, "prompt": "test", "stream": false});
        match self.probe.post(&url).json(&body).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(model, error = %e, "generation probe failed");
                false
            }
        }
    }

    async fn generate(&self, model: &str, prompt: &str, opts: GenerateOptions) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = Self::build_body(model, prompt, opts);

        debug!(model, prompt_len = prompt.len(), "sending generation request");

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout)
            } else {
                LlmError::Network(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Upstream { status, message });
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.response)
    }
}

// Ollama API response types

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: &str) -> OllamaConfig {
        OllamaConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OllamaClient::from_config(&test_config("http://localhost:11434/")).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_build_body() {
        let body = OllamaClient::build_body(
            "llama3",
            "describe this product",
            GenerateOptions {
                temperature: 0.25,
                top_p: 0.9,
                num_predict: 512,
            },
        );

        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 512);
        assert_eq!(body["options"]["top_p"], 0.9);
    }

    #[tokio::test]
    async fn test_unreachable_runtime_fails_closed() {
        // Nothing listens on this port; the probe must report unavailable
        let client = OllamaClient::from_config(&test_config("http://127.0.0.1:1")).unwrap();
        assert!(!client.is_available("llama3").await);
    }
}
