//! Provider types for Deskpilot
//!
//! This module defines the core types and traits for the planner backend,
//! including the `LlmProvider` trait, chat options, and response types.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::Message;
use crate::error::ProviderError;

/// Definition of a tool that can be called by the planner.
///
/// Tool definitions describe the available tools, their parameters,
/// and how the model should invoke them. The router builds one per
/// catalog entry, local and remote alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The name of the tool (unique within the merged catalog)
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Trait for planner backends.
///
/// Implement this to add a new LLM provider. The provider translates between
/// Deskpilot's message format and its API format. Failures come back as
/// `ProviderError` so callers can classify them without string matching;
/// every one of them ends the turn.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// `tools` may be empty; providers must then omit the tool block from the
    /// request entirely. The per-call timeout in `options` bounds the whole
    /// round trip.
    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        options: ChatOptions,
    ) -> std::result::Result<LlmResponse, ProviderError>;

    /// Provider name (e.g. "openai")
    fn name(&self) -> &str;
}

/// Options for one chat completion request.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Maximum number of tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature for sampling
    pub temperature: Option<f32>,
    /// Wall-clock bound on the whole request
    pub timeout: Duration,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            max_tokens: None,
            temperature: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Response from a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Text content of the response
    pub content: String,
    /// Tool calls requested by the model (if any)
    pub tool_calls: Vec<LlmToolCall>,
    /// Token usage information (if available)
    pub usage: Option<Usage>,
}

impl LlmResponse {
    /// A plain text response with no tool calls.
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            tool_calls: vec![],
            usage: None,
        }
    }

    /// A response carrying tool calls.
    pub fn with_tools(content: &str, tool_calls: Vec<LlmToolCall>) -> Self {
        Self {
            content: content.to_string(),
            tool_calls,
            usage: None,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// A tool call requested by the model.
///
/// Arguments are kept structured. Providers whose wire format carries them as
/// a JSON string parse at the boundary; a string that fails to parse maps to
/// `Value::Null` so schema validation rejects the call instead of the
/// provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool to execute
    pub name: String,
    /// Structured arguments for the tool
    pub arguments: Value,
}

impl LlmToolCall {
    pub fn new(id: &str, name: &str, arguments: Value) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }
    }
}

/// Token usage information from a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_llm_response_text() {
        let response = LlmResponse::text("Hello, world!");
        assert_eq!(response.content, "Hello, world!");
        assert!(!response.has_tool_calls());
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_llm_response_with_tools() {
        let call = LlmToolCall::new("call_1", "lookup_order_tool", json!({"order_number": "ORD-001"}));
        let response = LlmResponse::with_tools("Looking that up.", vec![call]);

        assert!(response.has_tool_calls());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "lookup_order_tool");
        assert_eq!(response.tool_calls[0].arguments["order_number"], "ORD-001");
    }

    #[test]
    fn test_llm_response_with_usage() {
        let response = LlmResponse::text("Hello").with_usage(Usage::new(100, 50));
        let usage = response.usage.unwrap();
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_chat_options_builder() {
        let options = ChatOptions::new()
            .with_max_tokens(1000)
            .with_temperature(0.7)
            .with_timeout(Duration::from_secs(30));
        assert_eq!(options.max_tokens, Some(1000));
        assert_eq!(options.temperature, Some(0.7));
        assert_eq!(options.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_chat_options_default_timeout() {
        let options = ChatOptions::default();
        assert!(options.max_tokens.is_none());
        assert_eq!(options.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_tool_definition_new() {
        let tool = ToolDefinition::new(
            "search_knowledge_base_tool",
            "Search support articles",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" }
                },
                "required": ["query"]
            }),
        );
        assert_eq!(tool.name, "search_knowledge_base_tool");
        assert!(tool.parameters.is_object());
    }
}
