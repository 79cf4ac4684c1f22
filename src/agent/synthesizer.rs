//! Response synthesis
//!
//! Composes the turn boundary response from the planner's final text, the
//! classified intent, and the dispatch audit trail. Confidence is damped
//! when the answer hedges or the turn degraded.

use crate::intent::IntentResult;
use crate::router::ToolCallRecord;

use super::types::TurnResponse;

/// Answers containing these phrases get their confidence capped.
const HEDGE_PHRASES: &[&str] = &["i don't know", "i'm not sure", "i am not sure", "i cannot help"];

/// Confidence ceiling for hedged answers.
const HEDGE_CAP: f32 = 0.4;

/// Confidence ceiling for turns that hit the round bound.
const DEGRADED_CAP: f32 = 0.3;

/// Answer used when the round bound is hit and the planner left no text.
const DEGRADED_FALLBACK: &str = "I wasn't able to finish gathering everything needed for a \
complete answer. Please try again, or contact support directly if this is urgent.";

/// Appended when the round bound is hit but the planner did leave text. The
/// caller-facing string is the only place the degradation is visible.
const DEGRADED_NOTE: &str = "Note: I couldn't finish looking everything up, so parts of this \
answer may be incomplete.";

/// Builds the final `TurnResponse`.
pub struct ResponseSynthesizer;

impl ResponseSynthesizer {
    pub fn synthesize(
        thread_id: &str,
        content: &str,
        intent: IntentResult,
        tool_calls: Vec<ToolCallRecord>,
        degraded: bool,
    ) -> TurnResponse {
        let response = if degraded {
            if content.trim().is_empty() {
                DEGRADED_FALLBACK.to_string()
            } else {
                format!("{}\n\n{}", content.trim_end(), DEGRADED_NOTE)
            }
        } else {
            content.to_string()
        };

        let mut confidence = intent.confidence;
        let lower = response.to_lowercase();
        if HEDGE_PHRASES.iter().any(|p| lower.contains(p)) {
            confidence = confidence.min(HEDGE_CAP);
        }
        if degraded {
            confidence = confidence.min(DEGRADED_CAP);
        }

        TurnResponse {
            response,
            thread_id: thread_id.to_string(),
            tool_calls,
            intent: intent.intent.to_string(),
            confidence,
            degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;

    fn order_intent() -> IntentResult {
        IntentResult::new(Intent::OrderInquiry, 0.9)
    }

    #[test]
    fn test_synthesize_plain_answer() {
        let response = ResponseSynthesizer::synthesize(
            "t1",
            "Your order shipped yesterday.",
            order_intent(),
            vec![],
            false,
        );
        assert_eq!(response.response, "Your order shipped yesterday.");
        assert_eq!(response.intent, "order_inquiry");
        assert_eq!(response.confidence, 0.9);
        assert!(!response.degraded);
    }

    #[test]
    fn test_hedged_answer_caps_confidence() {
        let response = ResponseSynthesizer::synthesize(
            "t1",
            "I'm not sure about that, sorry.",
            order_intent(),
            vec![],
            false,
        );
        assert!(response.confidence <= HEDGE_CAP);
    }

    #[test]
    fn test_degraded_turn_caps_confidence() {
        let response = ResponseSynthesizer::synthesize(
            "t1",
            "Here is a partial answer.",
            order_intent(),
            vec![],
            true,
        );
        assert!(response.degraded);
        assert!(response.confidence <= DEGRADED_CAP);
        assert!(response.response.starts_with("Here is a partial answer."));
    }

    #[test]
    fn test_degraded_turn_flags_partial_content() {
        let response = ResponseSynthesizer::synthesize(
            "t1",
            "Let me check that order for you now.",
            order_intent(),
            vec![],
            true,
        );
        assert!(response.response.contains("Let me check that order"));
        assert!(response.response.contains("may be incomplete"));
    }

    #[test]
    fn test_degraded_turn_with_empty_content_uses_fallback() {
        let response =
            ResponseSynthesizer::synthesize("t1", "  ", order_intent(), vec![], true);
        assert!(response.response.contains("wasn't able to finish"));
    }

    #[test]
    fn test_low_confidence_never_raised() {
        let response = ResponseSynthesizer::synthesize(
            "t1",
            "Hello!",
            IntentResult::unknown(),
            vec![],
            false,
        );
        assert_eq!(response.confidence, 0.0);
    }
}
