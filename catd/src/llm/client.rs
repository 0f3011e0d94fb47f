//! ModelClient trait definition

use async_trait::async_trait;

use super::LlmError;

/// Options forwarded to the runtime's generation endpoint
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub top_p: f64,
    /// Maximum tokens the model may produce
    pub num_predict: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
            num_predict: 1024,
        }
    }
}

/// Stateless model client - each generation call is independent
///
/// Implementations must fail closed on availability: any transport
/// error during a probe reports the model as unavailable.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Check whether a model can serve requests right now
    async fn is_available(&self, model: &str) -> bool;

    /// Run one non-streaming generation and return the raw reply text
    async fn generate(&self, model: &str, prompt: &str, opts: GenerateOptions) -> Result<String, LlmError>;
}
