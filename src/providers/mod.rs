//! Providers module - planner backends
//!
//! Defines the `LlmProvider` trait and the types shared by all backends.
//! The only shipped implementation targets OpenAI-compatible Chat Completions
//! APIs; everything downstream depends on the trait, so tests substitute
//! scripted providers.

pub mod openai;
mod types;

pub use openai::OpenAIProvider;
pub use types::{ChatOptions, LlmProvider, LlmResponse, LlmToolCall, ToolDefinition, Usage};
