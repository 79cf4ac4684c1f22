//! Turn boundary types
//!
//! What callers hand the executor and what they get back. One `TurnRequest`
//! in, one `TurnResponse` out; everything in between is internal.

use crate::router::ToolCallRecord;

/// One inbound customer message.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// The customer's free-text message
    pub message: String,
    /// Conversation thread to continue; None means the default thread
    pub thread_id: Option<String>,
    /// Customer to associate with the thread, when known
    pub customer_id: Option<i64>,
}

impl TurnRequest {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            thread_id: None,
            customer_id: None,
        }
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

/// The completed turn.
#[derive(Debug, Clone)]
pub struct TurnResponse {
    /// The final answer text
    pub response: String,
    /// The thread the turn ran against
    pub thread_id: String,
    /// Audit trail of every tool call dispatched during the turn
    pub tool_calls: Vec<ToolCallRecord>,
    /// The classified intent label
    pub intent: String,
    /// Confidence in the answer, damped for hedged or degraded answers
    pub confidence: f32,
    /// Whether the turn hit its round bound before the planner finished
    pub degraded: bool,
}
