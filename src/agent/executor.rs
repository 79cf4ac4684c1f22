//! Graph executor
//!
//! The turn state machine: classify intent, plan, dispatch tools, plan
//! again, synthesize. One inbound message becomes exactly one final answer;
//! tool failures feed back into planning, only a planner failure aborts the
//! turn, and the round bound guarantees termination.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::conversation::{ConversationStore, Message, ToolCall};
use crate::error::{AgentError, Result};
use crate::intent::{IntentClassifier, IntentResult, KeywordClassifier};
use crate::providers::{ChatOptions, LlmProvider, LlmResponse};
use crate::router::{ToolCallRecord, ToolRouter};
use crate::tools::ToolContext;

use super::context::ContextBuilder;
use super::synthesizer::ResponseSynthesizer;
use super::types::{TurnRequest, TurnResponse};

/// Thread used when a stateful request names none.
const DEFAULT_THREAD: &str = "default";

/// Coordinates the planner, the tool router, and the conversation store for
/// one turn at a time per thread.
pub struct GraphExecutor {
    config: Config,
    store: ConversationStore,
    provider: Arc<dyn LlmProvider>,
    router: Arc<ToolRouter>,
    classifier: Arc<dyn IntentClassifier>,
    context_builder: ContextBuilder,
}

impl GraphExecutor {
    pub fn new(
        config: Config,
        provider: Arc<dyn LlmProvider>,
        router: Arc<ToolRouter>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Self {
        Self {
            config,
            store: ConversationStore::new(),
            provider,
            router,
            classifier,
            context_builder: ContextBuilder::new(),
        }
    }

    /// Executor with the default keyword classifier.
    pub fn with_defaults(
        config: Config,
        provider: Arc<dyn LlmProvider>,
        router: Arc<ToolRouter>,
    ) -> Self {
        Self::new(config, provider, router, Arc::new(KeywordClassifier))
    }

    pub fn set_context_builder(&mut self, builder: ContextBuilder) {
        self.context_builder = builder;
    }

    /// The conversation store backing this executor.
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Process one stateful turn against a named (or the default) thread.
    pub async fn handle_message(&self, request: TurnRequest) -> Result<TurnResponse> {
        let thread_id = request
            .thread_id
            .clone()
            .unwrap_or_else(|| DEFAULT_THREAD.to_string());

        let span = info_span!("turn", thread_id = %thread_id);
        self.run_turn(&thread_id, request).instrument(span).await
    }

    /// Process one stateless turn on a fresh single-use thread.
    pub async fn generate(&self, message: &str) -> Result<TurnResponse> {
        let thread_id = Uuid::new_v4().to_string();
        let request = TurnRequest::new(message).with_thread(&thread_id);

        let span = info_span!("turn", thread_id = %thread_id, stateless = true);
        self.run_turn(&thread_id, request).instrument(span).await
    }

    async fn run_turn(&self, thread_id: &str, request: TurnRequest) -> Result<TurnResponse> {
        // Serialize whole turns per thread; the guard is scope-bound so every
        // exit path releases it
        let turn_lock = self.store.turn_lock(thread_id).await;
        let _turn_guard = turn_lock.lock().await;

        info!("processing turn");
        self.store.get_or_create(thread_id).await;
        self.store
            .set_customer(thread_id, request.customer_id)
            .await?;

        // Best-effort; never gates the turn
        let intent = self.classifier.classify(&request.message).await;
        debug!(intent = %intent.intent, confidence = intent.confidence, "intent classified");

        self.store
            .append(thread_id, Message::user(&request.message))
            .await?;

        let options = ChatOptions::new()
            .with_max_tokens(self.config.provider.max_tokens)
            .with_temperature(self.config.provider.temperature)
            .with_timeout(self.config.planner_timeout());

        let tool_ctx = {
            let state = self.store.get(thread_id).await;
            let mut ctx = ToolContext::new().with_thread(thread_id);
            if let Some(customer_id) = state.and_then(|s| s.customer_id) {
                ctx = ctx.with_customer(customer_id);
            }
            ctx
        };

        let mut response = self.plan(thread_id, &intent, options.clone()).await?;

        let max_rounds = self.config.agent.max_tool_rounds;
        let mut round = 0;
        let mut all_records: Vec<ToolCallRecord> = Vec::new();

        while response.has_tool_calls() && round < max_rounds {
            round += 1;
            debug!(round, max_rounds, calls = response.tool_calls.len(), "dispatching tool round");

            let calls: Vec<ToolCall> = response
                .tool_calls
                .iter()
                .map(|tc| ToolCall::new(&tc.id, &tc.name, tc.arguments.clone()))
                .collect();

            self.store
                .append(
                    thread_id,
                    Message::assistant_with_tools(&response.content, calls.clone()),
                )
                .await?;

            // Results land in request order regardless of completion order
            let records = self.router.dispatch_all(&calls, &tool_ctx).await;
            let tool_messages: Vec<Message> = records
                .iter()
                .map(|r| Message::tool_result(&r.id, &r.outcome.as_tool_output()))
                .collect();
            self.store.append_all(thread_id, tool_messages).await?;
            all_records.extend(records);

            response = self.plan(thread_id, &intent, options.clone()).await?;
        }

        let degraded = response.has_tool_calls();
        if degraded {
            warn!(rounds = round, "round bound reached, degrading answer");
        }

        let turn = ResponseSynthesizer::synthesize(
            thread_id,
            &response.content,
            intent,
            all_records,
            degraded,
        );

        self.store
            .append(thread_id, Message::assistant(&turn.response))
            .await?;

        info!(
            tool_calls = turn.tool_calls.len(),
            degraded = turn.degraded,
            "turn completed"
        );
        Ok(turn)
    }

    /// One planner call over the current thread history and catalog snapshot.
    async fn plan(
        &self,
        thread_id: &str,
        intent: &IntentResult,
        options: ChatOptions,
    ) -> Result<LlmResponse> {
        let history = self.store.history(thread_id).await?;
        let messages = self.context_builder.build(&history, Some(intent));
        let definitions = self.router.definitions().await;

        self.provider
            .chat(messages, definitions, options)
            .await
            .map_err(AgentError::Provider)
    }
}
