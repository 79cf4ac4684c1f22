//! Intent classification
//!
//! Best-effort labeling of the inbound message before planning. The label
//! tints the system context and is reported on the turn boundary; it never
//! gates the turn, so classifiers are infallible by contract and degrade to
//! `general` with zero confidence when they cannot do better.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::conversation::Message;
use crate::providers::{ChatOptions, LlmProvider};

/// Supported intent labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    OrderInquiry,
    TechnicalSupport,
    Billing,
    CustomerInquiry,
    TicketManagement,
    KnowledgeBase,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::OrderInquiry => "order_inquiry",
            Intent::TechnicalSupport => "technical_support",
            Intent::Billing => "billing",
            Intent::CustomerInquiry => "customer_inquiry",
            Intent::TicketManagement => "ticket_management",
            Intent::KnowledgeBase => "knowledge_base",
            Intent::General => "general",
        }
    }

    /// Parse a label, tolerating surrounding whitespace and case.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "order_inquiry" => Some(Intent::OrderInquiry),
            "technical_support" => Some(Intent::TechnicalSupport),
            "billing" => Some(Intent::Billing),
            "customer_inquiry" => Some(Intent::CustomerInquiry),
            "ticket_management" => Some(Intent::TicketManagement),
            "knowledge_base" => Some(Intent::KnowledgeBase),
            "general" => Some(Intent::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified intent with the classifier's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentResult {
    pub intent: Intent,
    pub confidence: f32,
}

impl IntentResult {
    pub fn new(intent: Intent, confidence: f32) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// The degraded result used when classification fails.
    pub fn unknown() -> Self {
        Self {
            intent: Intent::General,
            confidence: 0.0,
        }
    }
}

/// Trait for intent classifiers. Infallible: failures degrade internally.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, message: &str) -> IntentResult;
}

// =============================================================================
// Keyword Classifier
// =============================================================================

/// Keyword-scoring classifier, no model call needed.
///
/// Each label has trigger phrases; the label with the most hits wins, with
/// confidence scaled by hit count. Strong domain markers (an ORD- style
/// order number, a TKT- ticket id) pin the label directly.
pub struct KeywordClassifier;

const ORDER_KEYWORDS: &[&str] = &[
    "order", "delivery", "shipping", "shipped", "tracking", "package", "refund my order",
];
const TECH_KEYWORDS: &[&str] = &[
    "error", "bug", "crash", "broken", "not working", "doesn't work", "login", "password",
];
const BILLING_KEYWORDS: &[&str] = &[
    "invoice", "charge", "charged", "billing", "payment", "refund", "subscription", "price",
];
const CUSTOMER_KEYWORDS: &[&str] = &[
    "my account", "my profile", "my details", "my email address", "update my",
];
const TICKET_KEYWORDS: &[&str] = &["ticket", "case number", "escalate", "my request"];
const KB_KEYWORDS: &[&str] = &["how do i", "how to", "guide", "documentation", "instructions", "faq"];

fn count_hits(message: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| message.contains(*k)).count()
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, message: &str) -> IntentResult {
        let lower = message.to_lowercase();

        // Identifier formats beat keyword scoring
        if lower.contains("ord-") {
            return IntentResult::new(Intent::OrderInquiry, 0.9);
        }
        if lower.contains("tkt-") {
            return IntentResult::new(Intent::TicketManagement, 0.9);
        }

        let scores = [
            (Intent::OrderInquiry, count_hits(&lower, ORDER_KEYWORDS)),
            (Intent::TechnicalSupport, count_hits(&lower, TECH_KEYWORDS)),
            (Intent::Billing, count_hits(&lower, BILLING_KEYWORDS)),
            (Intent::CustomerInquiry, count_hits(&lower, CUSTOMER_KEYWORDS)),
            (Intent::TicketManagement, count_hits(&lower, TICKET_KEYWORDS)),
            (Intent::KnowledgeBase, count_hits(&lower, KB_KEYWORDS)),
        ];

        let (intent, hits) = scores
            .into_iter()
            .max_by_key(|(_, hits)| *hits)
            .unwrap_or((Intent::General, 0));

        if hits == 0 {
            return IntentResult::new(Intent::General, 0.5);
        }

        let confidence = match hits {
            1 => 0.7,
            2 => 0.85,
            _ => 0.95,
        };
        debug!(intent = %intent, confidence, "keyword classification");
        IntentResult::new(intent, confidence)
    }
}

// =============================================================================
// LLM Classifier
// =============================================================================

const CLASSIFY_PROMPT: &str = "Classify the customer's message into exactly one category: \
order_inquiry, technical_support, billing, customer_inquiry, ticket_management, \
knowledge_base, or general. Respond with only the category name.";

/// Classifier that asks the planner backend for a label.
///
/// Any failure (provider error, unparseable label) degrades to
/// `general` with zero confidence; the turn proceeds regardless.
pub struct LlmClassifier {
    provider: Arc<dyn LlmProvider>,
    options: ChatOptions,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, options: ChatOptions) -> Self {
        Self { provider, options }
    }
}

#[async_trait]
impl IntentClassifier for LlmClassifier {
    async fn classify(&self, message: &str) -> IntentResult {
        let messages = vec![Message::system(CLASSIFY_PROMPT), Message::user(message)];

        let response = match self
            .provider
            .chat(messages, vec![], self.options.clone())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "intent classification failed, degrading to general");
                return IntentResult::unknown();
            }
        };

        match Intent::parse(&response.content) {
            Some(intent) => IntentResult::new(intent, 0.9),
            None => {
                warn!(label = %response.content, "unrecognized intent label, degrading to general");
                IntentResult::unknown()
            }
        }
    }
}
