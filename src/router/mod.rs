//! Tool router - merged catalog and dispatch
//!
//! One place knows every tool the planner may call. Local registry entries
//! and remote host entries merge into a single catalog; a duplicate name
//! across the two sources is a configuration error at startup. Dispatch
//! validates arguments against the advertised schema, bounds every call with
//! a timeout, and converts every failure into a planner-visible record so a
//! broken tool can never fail the turn.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::conversation::ToolCall;
use crate::error::{AgentError, Result, ToolErrorKind, ToolFailure};
use crate::providers::ToolDefinition;
use crate::remote::{RemoteToolClient, RemoteToolSpec};
use crate::tools::{ToolContext, ToolRegistry};

/// Where a catalog entry is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOrigin {
    Local,
    Remote,
}

impl std::fmt::Display for ToolOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolOrigin::Local => write!(f, "local"),
            ToolOrigin::Remote => write!(f, "remote"),
        }
    }
}

/// One tool in the merged catalog.
#[derive(Debug, Clone)]
pub struct ToolCatalogEntry {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub origin: ToolOrigin,
}

/// The outcome of one dispatched tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(String),
    Failure { kind: ToolErrorKind, message: String },
}

impl ToolOutcome {
    /// The text the planner sees for this outcome.
    pub fn as_tool_output(&self) -> String {
        match self {
            ToolOutcome::Success(text) => text.clone(),
            ToolOutcome::Failure { kind, message } => {
                ToolFailure::new(*kind, message.clone()).as_tool_output()
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }
}

/// Audit record of one dispatched call, reported on the turn boundary.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
    pub origin: Option<ToolOrigin>,
    pub outcome: ToolOutcome,
}

/// Routes planner tool calls to the local registry or the remote host.
pub struct ToolRouter {
    local: ToolRegistry,
    remote: Option<RemoteToolClient>,
    // Swapped wholesale on reconnect; in-flight readers keep their snapshot
    catalog: RwLock<Arc<Vec<ToolCatalogEntry>>>,
    call_timeout: Duration,
}

impl ToolRouter {
    /// Build the router and merge the catalogs.
    ///
    /// `remote` is the client plus the tool listing fetched at connect time.
    /// A name appearing in both sources is a startup configuration error.
    pub fn new(
        local: ToolRegistry,
        remote: Option<(RemoteToolClient, Vec<RemoteToolSpec>)>,
        call_timeout: Duration,
    ) -> Result<Self> {
        let (remote_client, remote_specs) = match remote {
            Some((client, specs)) => (Some(client), specs),
            None => (None, Vec::new()),
        };

        let catalog = Self::merge_catalog(&local, &remote_specs)?;
        info!(
            local = local.len(),
            remote = remote_specs.len(),
            "tool catalog built"
        );

        Ok(Self {
            local,
            remote: remote_client,
            catalog: RwLock::new(Arc::new(catalog)),
            call_timeout,
        })
    }

    fn merge_catalog(
        local: &ToolRegistry,
        remote_specs: &[RemoteToolSpec],
    ) -> Result<Vec<ToolCatalogEntry>> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for def in local.definitions() {
            if !seen.insert(def.name.clone()) {
                return Err(AgentError::Config(format!(
                    "duplicate tool name in catalog: {}",
                    def.name
                )));
            }
            entries.push(ToolCatalogEntry {
                name: def.name,
                description: def.description,
                input_schema: def.parameters,
                origin: ToolOrigin::Local,
            });
        }

        for spec in remote_specs {
            if !seen.insert(spec.name.clone()) {
                return Err(AgentError::Config(format!(
                    "duplicate tool name in catalog: {}",
                    spec.name
                )));
            }
            entries.push(ToolCatalogEntry {
                name: spec.name.clone(),
                description: spec.description.clone().unwrap_or_default(),
                input_schema: spec.input_schema.clone(),
                origin: ToolOrigin::Remote,
            });
        }

        Ok(entries)
    }

    /// Current catalog snapshot.
    pub async fn catalog(&self) -> Arc<Vec<ToolCatalogEntry>> {
        self.catalog.read().await.clone()
    }

    /// Tool definitions for the planner, from the current snapshot.
    pub async fn definitions(&self) -> Vec<ToolDefinition> {
        self.catalog
            .read()
            .await
            .iter()
            .map(|entry| ToolDefinition {
                name: entry.name.clone(),
                description: entry.description.clone(),
                parameters: entry.input_schema.clone(),
            })
            .collect()
    }

    /// Re-fetch the remote listing and swap the whole catalog.
    ///
    /// In-flight turns keep the snapshot they started with.
    pub async fn refresh_catalog(&self, connect_timeout: Duration) -> Result<()> {
        let Some(remote) = &self.remote else {
            return Ok(());
        };
        let specs = remote.list_tools(connect_timeout).await?;
        let merged = Self::merge_catalog(&self.local, &specs)?;
        info!(entries = merged.len(), "tool catalog refreshed");
        *self.catalog.write().await = Arc::new(merged);
        Ok(())
    }

    /// Dispatch every call of one planner round, preserving request order.
    ///
    /// Calls run concurrently; `join_all` yields results in input order, so
    /// the records land exactly as requested even when calls finish out of
    /// order. This never returns an error: every failure is a record.
    pub async fn dispatch_all(&self, calls: &[ToolCall], ctx: &ToolContext) -> Vec<ToolCallRecord> {
        let snapshot = self.catalog().await;
        let futures = calls
            .iter()
            .map(|call| self.dispatch(call, ctx, &snapshot));
        join_all(futures).await
    }

    /// Dispatch a single call against a catalog snapshot.
    async fn dispatch(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
        snapshot: &[ToolCatalogEntry],
    ) -> ToolCallRecord {
        let entry = snapshot.iter().find(|e| e.name == call.name);

        let outcome = match entry {
            None => ToolOutcome::Failure {
                kind: ToolErrorKind::NotFound,
                message: format!("no such tool: {}", call.name),
            },
            Some(entry) => {
                if let Err(message) = validate_arguments(&entry.input_schema, &call.arguments) {
                    ToolOutcome::Failure {
                        kind: ToolErrorKind::InvalidArguments,
                        message,
                    }
                } else {
                    match entry.origin {
                        ToolOrigin::Local => self.dispatch_local(call, ctx).await,
                        ToolOrigin::Remote => self.dispatch_remote(call).await,
                    }
                }
            }
        };

        match &outcome {
            ToolOutcome::Success(_) => {
                debug!(tool = %call.name, call_id = %call.id, "tool call succeeded")
            }
            ToolOutcome::Failure { kind, message } => {
                warn!(tool = %call.name, call_id = %call.id, kind = %kind, %message, "tool call failed")
            }
        }

        ToolCallRecord {
            id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            origin: entry.map(|e| e.origin),
            outcome,
        }
    }

    async fn dispatch_local(&self, call: &ToolCall, ctx: &ToolContext) -> ToolOutcome {
        let execution = self
            .local
            .execute(&call.name, call.arguments.clone(), ctx);
        match tokio::time::timeout(self.call_timeout, execution).await {
            Ok(Ok(output)) => ToolOutcome::Success(output),
            Ok(Err(AgentError::Tool(failure))) => ToolOutcome::Failure {
                kind: failure.kind,
                message: failure.message,
            },
            Ok(Err(other)) => ToolOutcome::Failure {
                kind: ToolErrorKind::Execution,
                message: other.to_string(),
            },
            Err(_) => ToolOutcome::Failure {
                kind: ToolErrorKind::Timeout,
                message: format!("tool exceeded {:?}", self.call_timeout),
            },
        }
    }

    async fn dispatch_remote(&self, call: &ToolCall) -> ToolOutcome {
        let Some(remote) = &self.remote else {
            // Catalog says remote but no client is configured; only possible
            // if the host was disabled after the catalog was built
            return ToolOutcome::Failure {
                kind: ToolErrorKind::Unreachable,
                message: "remote tool host is not configured".to_string(),
            };
        };

        match remote
            .call(&call.name, call.arguments.clone(), self.call_timeout)
            .await
        {
            Ok(output) => ToolOutcome::Success(output),
            Err(err) => ToolOutcome::Failure {
                kind: err.kind(),
                message: err.message().to_string(),
            },
        }
    }
}

/// Lightweight structural check of arguments against a JSON Schema.
///
/// Verifies the argument value is an object and that every `required`
/// property is present. Full schema validation belongs to the tools
/// themselves; this catches the planner emitting garbage before a network
/// round trip is spent on it.
fn validate_arguments(schema: &Value, arguments: &Value) -> std::result::Result<(), String> {
    if !arguments.is_object() {
        return Err(format!(
            "arguments must be a JSON object, got {}",
            type_name(arguments)
        ));
    }

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for field in required {
            if let Some(name) = field.as_str() {
                if arguments.get(name).map(|v| v.is_null()).unwrap_or(true) {
                    return Err(format!("missing required argument: {}", name));
                }
            }
        }
    }

    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{
        JsonRpcRequest, JsonRpcResponse, RemoteTransport, RequestId, TransportError,
    };
    use crate::tools::{EchoTool, Tool};
    use async_trait::async_trait;
    use serde_json::json;

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "Sleeps longer than any sane timeout"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}, "required": []})
        }
        async fn execute(&self, _args: Value, _ctx: &ToolContext) -> crate::error::Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("never".to_string())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}, "required": []})
        }
        async fn execute(&self, _args: Value, _ctx: &ToolContext) -> crate::error::Result<String> {
            Err(AgentError::Tool(ToolFailure::new(
                ToolErrorKind::Execution,
                "database offline",
            )))
        }
    }

    struct UnreachableTransport;

    #[async_trait]
    impl RemoteTransport for UnreachableTransport {
        async fn request(
            &self,
            _request: JsonRpcRequest,
            _timeout: Duration,
        ) -> std::result::Result<JsonRpcResponse, TransportError> {
            Err(TransportError::Unreachable("connection refused".to_string()))
        }
    }

    /// Transport serving a fixed tools/list and echoing tools/call arguments.
    struct FixedTransport {
        tools: Value,
    }

    #[async_trait]
    impl RemoteTransport for FixedTransport {
        async fn request(
            &self,
            request: JsonRpcRequest,
            _timeout: Duration,
        ) -> std::result::Result<JsonRpcResponse, TransportError> {
            let result = match request.method.as_str() {
                "tools/list" => json!({"tools": self.tools}),
                "tools/call" => {
                    let name = request.params.as_ref().unwrap()["name"]
                        .as_str()
                        .unwrap()
                        .to_string();
                    json!({
                        "content": [{"type": "text", "text": format!("{} ok", name)}],
                        "isError": false
                    })
                }
                other => panic!("unexpected method {}", other),
            };
            Ok(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: RequestId::Number(1),
                result: Some(result),
                error: None,
            })
        }
    }

    fn local_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        registry
    }

    fn remote_client(transport: Arc<dyn RemoteTransport>) -> RemoteToolClient {
        RemoteToolClient::new(transport, Duration::from_millis(1))
    }

    fn order_spec() -> RemoteToolSpec {
        RemoteToolSpec {
            name: "lookup_order_tool".to_string(),
            description: Some("Find an order by its number".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {"order_number": {"type": "string"}},
                "required": ["order_number"]
            }),
        }
    }

    #[tokio::test]
    async fn test_catalog_merges_both_origins() {
        let client = remote_client(Arc::new(FixedTransport { tools: json!([]) }));
        let router = ToolRouter::new(
            local_registry(),
            Some((client, vec![order_spec()])),
            Duration::from_secs(5),
        )
        .unwrap();

        let catalog = router.catalog().await;
        assert_eq!(catalog.len(), 2);
        let echo = catalog.iter().find(|e| e.name == "echo").unwrap();
        assert_eq!(echo.origin, ToolOrigin::Local);
        let order = catalog.iter().find(|e| e.name == "lookup_order_tool").unwrap();
        assert_eq!(order.origin, ToolOrigin::Remote);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_config_error() {
        let client = remote_client(Arc::new(FixedTransport { tools: json!([]) }));
        let duplicate = RemoteToolSpec {
            name: "echo".to_string(),
            description: None,
            input_schema: json!({"type": "object"}),
        };
        let Err(err) = ToolRouter::new(
            local_registry(),
            Some((client, vec![duplicate])),
            Duration::from_secs(5),
        ) else {
            panic!("expected config error for duplicate tool name");
        };

        match err {
            AgentError::Config(msg) => assert!(msg.contains("echo")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_local_success() {
        let router = ToolRouter::new(local_registry(), None, Duration::from_secs(5)).unwrap();
        let calls = vec![ToolCall::new("c1", "echo", json!({"message": "hi"}))];

        let records = router.dispatch_all(&calls, &ToolContext::new()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, ToolOutcome::Success("hi".to_string()));
        assert_eq!(records[0].origin, Some(ToolOrigin::Local));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let router = ToolRouter::new(local_registry(), None, Duration::from_secs(5)).unwrap();
        let calls = vec![ToolCall::new("c1", "frobnicate", json!({}))];

        let records = router.dispatch_all(&calls, &ToolContext::new()).await;
        match &records[0].outcome {
            ToolOutcome::Failure { kind, .. } => assert_eq!(*kind, ToolErrorKind::NotFound),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(records[0].origin.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_invalid_arguments_caught_before_execution() {
        let router = ToolRouter::new(local_registry(), None, Duration::from_secs(5)).unwrap();
        // echo requires "message"
        let calls = vec![ToolCall::new("c1", "echo", json!({"wrong": "field"}))];

        let records = router.dispatch_all(&calls, &ToolContext::new()).await;
        match &records[0].outcome {
            ToolOutcome::Failure { kind, message } => {
                assert_eq!(*kind, ToolErrorKind::InvalidArguments);
                assert!(message.contains("message"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_null_arguments_rejected() {
        let router = ToolRouter::new(local_registry(), None, Duration::from_secs(5)).unwrap();
        let calls = vec![ToolCall::new("c1", "echo", Value::Null)];

        let records = router.dispatch_all(&calls, &ToolContext::new()).await;
        match &records[0].outcome {
            ToolOutcome::Failure { kind, .. } => {
                assert_eq!(*kind, ToolErrorKind::InvalidArguments)
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_local_timeout() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(SlowTool));
        let router = ToolRouter::new(registry, None, Duration::from_millis(50)).unwrap();

        let calls = vec![ToolCall::new("c1", "slow", json!({}))];
        let records = router.dispatch_all(&calls, &ToolContext::new()).await;
        match &records[0].outcome {
            ToolOutcome::Failure { kind, .. } => assert_eq!(*kind, ToolErrorKind::Timeout),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_remote_unreachable() {
        let client = remote_client(Arc::new(UnreachableTransport));
        let router = ToolRouter::new(
            ToolRegistry::new(),
            Some((client, vec![order_spec()])),
            Duration::from_secs(5),
        )
        .unwrap();

        let calls = vec![ToolCall::new(
            "c1",
            "lookup_order_tool",
            json!({"order_number": "ORD-001"}),
        )];
        let records = router.dispatch_all(&calls, &ToolContext::new()).await;
        match &records[0].outcome {
            ToolOutcome::Failure { kind, .. } => assert_eq!(*kind, ToolErrorKind::Unreachable),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_all_preserves_request_order() {
        let client = remote_client(Arc::new(FixedTransport { tools: json!([]) }));
        let router = ToolRouter::new(
            local_registry(),
            Some((client, vec![order_spec()])),
            Duration::from_secs(5),
        )
        .unwrap();

        let calls = vec![
            ToolCall::new("c1", "lookup_order_tool", json!({"order_number": "ORD-001"})),
            ToolCall::new("c2", "echo", json!({"message": "middle"})),
            ToolCall::new("c3", "missing_tool", json!({})),
        ];
        let records = router.dispatch_all(&calls, &ToolContext::new()).await;

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert!(records[0].outcome.is_success());
        assert!(records[1].outcome.is_success());
        assert!(!records[2].outcome.is_success());
    }

    #[tokio::test]
    async fn test_failure_isolation_mixed_round() {
        let mut registry = local_registry();
        registry.register(Box::new(FailingTool));
        let router = ToolRouter::new(registry, None, Duration::from_secs(5)).unwrap();

        let calls = vec![
            ToolCall::new("c1", "broken", json!({})),
            ToolCall::new("c2", "echo", json!({"message": "still works"})),
        ];
        let records = router.dispatch_all(&calls, &ToolContext::new()).await;

        assert!(!records[0].outcome.is_success());
        assert_eq!(
            records[1].outcome,
            ToolOutcome::Success("still works".to_string())
        );
    }

    #[tokio::test]
    async fn test_refresh_catalog_swaps_wholesale() {
        let client = remote_client(Arc::new(FixedTransport {
            tools: json!([{
                "name": "get_ticket_tool",
                "description": "Fetch a ticket",
                "inputSchema": {"type": "object", "required": ["ticket_id"]}
            }]),
        }));
        // Start with the order tool; the transport now serves the ticket tool
        let router = ToolRouter::new(
            ToolRegistry::new(),
            Some((client, vec![order_spec()])),
            Duration::from_secs(5),
        )
        .unwrap();

        let before = router.catalog().await;
        assert_eq!(before[0].name, "lookup_order_tool");

        router.refresh_catalog(Duration::from_secs(5)).await.unwrap();

        let after = router.catalog().await;
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].name, "get_ticket_tool");
        // The old snapshot is untouched
        assert_eq!(before[0].name, "lookup_order_tool");
    }

    #[test]
    fn test_validate_arguments() {
        let schema = json!({
            "type": "object",
            "properties": {"q": {"type": "string"}},
            "required": ["q"]
        });

        assert!(validate_arguments(&schema, &json!({"q": "hello"})).is_ok());
        assert!(validate_arguments(&schema, &json!({})).is_err());
        assert!(validate_arguments(&schema, &json!({"q": null})).is_err());
        assert!(validate_arguments(&schema, &json!("not an object")).is_err());
        assert!(validate_arguments(&schema, &Value::Null).is_err());
    }

    #[test]
    fn test_validate_arguments_no_required_block() {
        let schema = json!({"type": "object", "properties": {}});
        assert!(validate_arguments(&schema, &json!({})).is_ok());
        assert!(validate_arguments(&schema, &json!({"extra": 1})).is_ok());
    }

    #[test]
    fn test_outcome_as_tool_output() {
        let ok = ToolOutcome::Success("result text".to_string());
        assert_eq!(ok.as_tool_output(), "result text");

        let failed = ToolOutcome::Failure {
            kind: ToolErrorKind::Timeout,
            message: "too slow".to_string(),
        };
        assert_eq!(failed.as_tool_output(), "Error (tool_timeout): too slow");
    }
}
