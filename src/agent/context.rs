//! Context builder for planner conversations
//!
//! Assembles the message list the planner sees each round: the support-agent
//! system prompt, an optional intent hint, then the full thread history.

use crate::conversation::Message;
use crate::intent::IntentResult;

/// Default system prompt for the support agent.
const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a customer support agent for an online retailer.

You can look up orders, customer profiles, and support tickets, search the
knowledge base, search the web, and send emails, using the tools available to
you. Use tools whenever the customer's question depends on account or order
data; never invent order numbers, ticket ids, or statuses.

If a tool reports an error, tell the customer what you could not check and
continue with what you do know. Be concise, accurate, and polite."#;

/// Builds the planner-facing message list for a turn.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(prompt: &str) -> Self {
        Self {
            system_prompt: prompt.to_string(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build the message list: system prompt first, then history verbatim.
    ///
    /// The intent hint is appended to the system prompt rather than the
    /// history so it never pollutes the stored thread.
    pub fn build(&self, history: &[Message], intent: Option<&IntentResult>) -> Vec<Message> {
        let system = match intent {
            Some(result) if result.confidence > 0.0 => format!(
                "{}\n\nDetected intent: {} (confidence {:.2})",
                self.system_prompt, result.intent, result.confidence
            ),
            _ => self.system_prompt.clone(),
        };

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(&system));
        messages.extend(history.iter().cloned());
        messages
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::intent::Intent;

    #[test]
    fn test_build_prepends_system_prompt() {
        let builder = ContextBuilder::new();
        let history = vec![Message::user("Hello"), Message::assistant("Hi!")];

        let messages = builder.build(&history, None);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("customer support agent"));
        assert_eq!(messages[1].content, "Hello");
        assert_eq!(messages[2].content, "Hi!");
    }

    #[test]
    fn test_build_appends_intent_hint() {
        let builder = ContextBuilder::new();
        let history = vec![Message::user("Where is ORD-001?")];
        let intent = IntentResult::new(Intent::OrderInquiry, 0.9);

        let messages = builder.build(&history, Some(&intent));
        assert!(messages[0].content.contains("Detected intent: order_inquiry"));
    }

    #[test]
    fn test_build_skips_zero_confidence_hint() {
        let builder = ContextBuilder::new();
        let messages = builder.build(&[Message::user("hi")], Some(&IntentResult::unknown()));
        assert!(!messages[0].content.contains("Detected intent"));
    }

    #[test]
    fn test_custom_system_prompt() {
        let builder = ContextBuilder::with_system_prompt("You are terse.");
        let messages = builder.build(&[], None);
        assert_eq!(messages[0].content, "You are terse.");
    }
}
