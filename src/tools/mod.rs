//! Tools module - local tool definitions and execution
//!
//! Infrastructure for in-process tools the planner can call during a turn.
//!
//! - `Tool` trait: the interface that all local tools implement
//! - `ToolContext`: execution context (thread id, customer id)
//! - `ToolRegistry`: registry for managing and executing tools
//!
//! Domain tools (order lookups, ticketing, knowledge base) live behind the
//! remote tool host; this module carries the local side of the catalog.
//!
//! # Example
//!
//! ```rust
//! use deskpilot::tools::{ToolRegistry, ToolContext, EchoTool};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let mut registry = ToolRegistry::new();
//! registry.register(Box::new(EchoTool));
//!
//! let result = registry
//!     .execute("echo", json!({"message": "Hello!"}), &ToolContext::new())
//!     .await;
//! assert_eq!(result.unwrap(), "Hello!");
//! # });
//! ```

mod registry;
mod types;

pub use registry::ToolRegistry;
pub use types::{Tool, ToolContext};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A simple echo tool for exercising the tool infrastructure.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the provided message"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo"
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let message = args
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("(no message)");
        Ok(message.to_string())
    }
}
