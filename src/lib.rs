//! Deskpilot - tool-calling customer support agent orchestrator

pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod intent;
pub mod providers;
pub mod remote;
pub mod router;
pub mod tools;

pub use agent::{ContextBuilder, GraphExecutor, TurnRequest, TurnResponse};
pub use config::Config;
pub use conversation::{ConversationStore, Message, Role, ToolCall};
pub use error::{AgentError, ProviderError, Result, ToolErrorKind, ToolFailure};
pub use intent::{Intent, IntentClassifier, IntentResult, KeywordClassifier};
pub use providers::{ChatOptions, LlmProvider, LlmResponse, LlmToolCall, ToolDefinition, Usage};
pub use remote::{RemoteToolClient, RemoteToolSpec};
pub use router::{ToolCallRecord, ToolCatalogEntry, ToolOrigin, ToolOutcome, ToolRouter};
pub use tools::{Tool, ToolContext, ToolRegistry};
