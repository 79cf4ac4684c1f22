//! Error types for Deskpilot
//!
//! Two layers of classification live here. `ProviderError` categorizes LLM
//! backend failures; any of them is fatal to the turn because no answer can be
//! synthesized without the model. `ToolFailure` categorizes tool dispatch
//! failures; none of them is fatal — the executor turns them into ordinary
//! tool-role messages so the model can retry, substitute, or apologize.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Provider Error Classification
// ============================================================================

/// Structured LLM provider error classification.
///
/// Fine-grained categorization of provider HTTP failures so callers can make
/// retry decisions without string matching. Every variant propagates to the
/// request boundary: a turn cannot complete without a working planner.
#[derive(Debug)]
pub enum ProviderError {
    /// 401 — Invalid API key or authentication failure
    Auth(String),
    /// 429 — Rate limit or quota exceeded
    RateLimit(String),
    /// 500/502/503/504 — Server-side errors
    ServerError(String),
    /// 400 — Bad request, invalid JSON, malformed parameters
    InvalidRequest(String),
    /// Connection or read timeout
    Timeout(String),
    /// Catch-all for unrecognized errors
    Unknown(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Auth(msg) => write!(f, "authentication error: {}", msg),
            ProviderError::RateLimit(msg) => write!(f, "rate limit error: {}", msg),
            ProviderError::ServerError(msg) => write!(f, "server error: {}", msg),
            ProviderError::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            ProviderError::Timeout(msg) => write!(f, "timeout: {}", msg),
            ProviderError::Unknown(msg) => write!(f, "unknown provider error: {}", msg),
        }
    }
}

impl ProviderError {
    /// Returns `true` if this error is transient and a later retry could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimit(_) | ProviderError::ServerError(_) | ProviderError::Timeout(_)
        )
    }

    /// Returns the HTTP status code associated with this error, if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Auth(_) => Some(401),
            ProviderError::RateLimit(_) => Some(429),
            ProviderError::ServerError(_) => Some(500),
            ProviderError::InvalidRequest(_) => Some(400),
            ProviderError::Timeout(_) | ProviderError::Unknown(_) => None,
        }
    }
}

impl From<ProviderError> for AgentError {
    fn from(err: ProviderError) -> Self {
        AgentError::Provider(err)
    }
}

// ============================================================================
// Tool Failure Classification
// ============================================================================

/// The kind of a non-fatal tool dispatch failure.
///
/// Surfaced to the planner as tool output and logged by kind for
/// observability. `InvalidArguments` is caught before dispatch and treated
/// like an execution error so the model can self-correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// The requested tool name exists in neither catalog
    NotFound,
    /// The dispatched call exceeded its per-call timeout
    Timeout,
    /// The remote tool host could not be reached
    Unreachable,
    /// The tool ran and reported its own failure
    Execution,
    /// Arguments failed schema validation before dispatch
    InvalidArguments,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::NotFound => "tool_not_found",
            ToolErrorKind::Timeout => "tool_timeout",
            ToolErrorKind::Unreachable => "tool_unreachable",
            ToolErrorKind::Execution => "tool_execution_error",
            ToolErrorKind::InvalidArguments => "invalid_tool_arguments",
        }
    }
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified tool dispatch failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolFailure {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Render this failure as planner-visible tool output.
    pub fn as_tool_output(&self) -> String {
        format!("Error ({}): {}", self.kind, self.message)
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for Deskpilot operations.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration-related errors (invalid config, duplicate tool names,
    /// missing required fields)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Structured LLM provider error — fatal to the turn
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// Tool dispatch failure — absorbed by the executor, only visible as an
    /// error when a caller invokes a tool directly
    #[error("Tool error: {0}")]
    Tool(ToolFailure),

    /// Conversation store errors (unknown thread, corrupt state)
    #[error("Conversation error: {0}")]
    Conversation(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote tool host protocol errors outside a single call (handshake,
    /// catalog fetch)
    #[error("Remote tool host error: {0}")]
    Remote(String),
}

impl From<ToolFailure> for AgentError {
    fn from(failure: ToolFailure) -> Self {
        AgentError::Tool(failure)
    }
}

/// A specialized `Result` type for Deskpilot operations.
pub type Result<T> = std::result::Result<T, AgentError>;
