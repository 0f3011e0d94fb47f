//! Model runtime client
//!
//! Availability probing, text generation against the local Ollama runtime,
//! structured-reply extraction, and per-task validation.

mod client;
mod error;
mod ollama;
pub mod parse;
pub mod validate;

#[cfg(test)]
pub use client::mock;
pub use client::{GenerateOptions, ModelClient};
pub use error::LlmError;
pub use ollama::OllamaClient;
