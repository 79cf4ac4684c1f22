//! Tool types for Deskpilot
//!
//! The `Tool` trait is the interface for in-process tools, and `ToolContext`
//! carries per-turn execution context into them.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Trait that all local tools implement.
///
/// Tools are executable functions the planner can call during a turn. A tool
/// returns planner-visible text on success and an `AgentError` on failure;
/// the router classifies the failure and surfaces it as tool output rather
/// than failing the turn.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use deskpilot::tools::{Tool, ToolContext};
/// use deskpilot::error::Result;
///
/// struct PingTool;
///
/// #[async_trait]
/// impl Tool for PingTool {
///     fn name(&self) -> &str { "ping" }
///     fn description(&self) -> &str { "Replies with pong" }
///     fn parameters(&self) -> Value {
///         serde_json::json!({
///             "type": "object",
///             "properties": {},
///             "required": []
///         })
///     }
///     async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<String> {
///         Ok("pong".to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, unique within the merged catalog.
    fn name(&self) -> &str;

    /// Description sent to the planner so it knows when to call this tool.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's arguments.
    fn parameters(&self) -> Value;

    /// Execute the tool with validated arguments.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String>;
}

/// Context provided to tools during execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The conversation thread this call belongs to
    pub thread_id: Option<String>,
    /// The customer associated with the thread, when known
    pub customer_id: Option<i64>,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread(mut self, thread_id: &str) -> Self {
        self.thread_id = Some(thread_id.to_string());
        self
    }

    pub fn with_customer(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_context_new() {
        let ctx = ToolContext::new();
        assert!(ctx.thread_id.is_none());
        assert!(ctx.customer_id.is_none());
    }

    #[test]
    fn test_tool_context_builder_chain() {
        let ctx = ToolContext::new().with_thread("t1").with_customer(42);
        assert_eq!(ctx.thread_id.as_deref(), Some("t1"));
        assert_eq!(ctx.customer_id, Some(42));
    }

    #[test]
    fn test_tool_context_clone() {
        let ctx1 = ToolContext::new().with_thread("t1");
        let ctx2 = ctx1.clone();
        assert_eq!(ctx1.thread_id, ctx2.thread_id);
    }
}
