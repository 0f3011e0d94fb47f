//! Prompt templates and rendering

pub mod embedded;
mod loader;

pub use loader::{PromptContext, PromptLoader};
