//! Remote tool host client
//!
//! Talks JSON-RPC over HTTP POST to the external tool host that carries the
//! domain tools (order lookups, ticketing, knowledge base). The transport is
//! a trait so tests substitute scripted fakes; `HttpTransport` is the real
//! one.
//!
//! One transparent retry with a short backoff is applied to transient
//! failures (timeout, unreachable). Errors the host itself reports are not
//! retried; the tool already ran.

pub mod protocol;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AgentError, Result, ToolErrorKind, ToolFailure};

pub use protocol::{
    CallToolParams, CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    RemoteToolSpec, RequestId, ToolContent, METHOD_NOT_FOUND,
};

// =============================================================================
// Transport
// =============================================================================

/// A transport-level failure, before any JSON-RPC semantics apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within its timeout
    Timeout(String),
    /// The host could not be reached or returned garbage
    Unreachable(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Timeout(msg) => write!(f, "timeout: {}", msg),
            TransportError::Unreachable(msg) => write!(f, "unreachable: {}", msg),
        }
    }
}

/// How a single request reaches the tool host.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    async fn request(
        &self,
        request: JsonRpcRequest,
        timeout: Duration,
    ) -> std::result::Result<JsonRpcResponse, TransportError>;
}

/// JSON-RPC over HTTP POST.
pub struct HttpTransport {
    endpoint: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn request(
        &self,
        request: JsonRpcRequest,
        timeout: Duration,
    ) -> std::result::Result<JsonRpcResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::Unreachable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(TransportError::Unreachable(format!(
                "tool host returned HTTP {}",
                response.status()
            )));
        }

        response.json::<JsonRpcResponse>().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else {
                TransportError::Unreachable(format!("malformed response: {}", e))
            }
        })
    }
}

// =============================================================================
// Call Errors
// =============================================================================

/// A classified failure of one remote tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCallError {
    /// The call exceeded its timeout
    Timeout(String),
    /// The host could not be reached
    Unreachable(String),
    /// The host does not know this tool
    ToolNotFound(String),
    /// The tool ran and reported a failure
    Execution(String),
}

impl RemoteCallError {
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            RemoteCallError::Timeout(_) => ToolErrorKind::Timeout,
            RemoteCallError::Unreachable(_) => ToolErrorKind::Unreachable,
            RemoteCallError::ToolNotFound(_) => ToolErrorKind::NotFound,
            RemoteCallError::Execution(_) => ToolErrorKind::Execution,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RemoteCallError::Timeout(msg)
            | RemoteCallError::Unreachable(msg)
            | RemoteCallError::ToolNotFound(msg)
            | RemoteCallError::Execution(msg) => msg,
        }
    }

}

impl From<TransportError> for RemoteCallError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(msg) => RemoteCallError::Timeout(msg),
            TransportError::Unreachable(msg) => RemoteCallError::Unreachable(msg),
        }
    }
}

impl From<RemoteCallError> for ToolFailure {
    fn from(err: RemoteCallError) -> Self {
        ToolFailure::new(err.kind(), err.message().to_string())
    }
}

// =============================================================================
// Client
// =============================================================================

/// Client for the remote tool host.
///
/// Cheap to clone; the transport is shared.
#[derive(Clone)]
pub struct RemoteToolClient {
    transport: Arc<dyn RemoteTransport>,
    retry_backoff: Duration,
    next_id: Arc<AtomicI64>,
}

impl RemoteToolClient {
    pub fn new(transport: Arc<dyn RemoteTransport>, retry_backoff: Duration) -> Self {
        Self {
            transport,
            retry_backoff,
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Connect over HTTP and fetch the initial tool listing in one step.
    pub async fn connect(
        endpoint: &str,
        connect_timeout: Duration,
        retry_backoff: Duration,
    ) -> Result<(Self, Vec<RemoteToolSpec>)> {
        let client = Self::new(Arc::new(HttpTransport::new(endpoint)), retry_backoff);
        let tools = client.list_tools(connect_timeout).await?;
        debug!(endpoint = %endpoint, tools = tools.len(), "connected to tool host");
        Ok((client, tools))
    }

    fn next_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// One request with a single retry for transient failures.
    async fn send_with_retry(
        &self,
        request: JsonRpcRequest,
        timeout: Duration,
    ) -> std::result::Result<JsonRpcResponse, TransportError> {
        match self.transport.request(request.clone(), timeout).await {
            Ok(response) => Ok(response),
            Err(err) => {
                warn!(method = %request.method, error = %err, "transient tool host failure, retrying once");
                tokio::time::sleep(self.retry_backoff).await;
                self.transport.request(request, timeout).await
            }
        }
    }

    /// Fetch the host's advertised tools.
    pub async fn list_tools(&self, timeout: Duration) -> Result<Vec<RemoteToolSpec>> {
        let request = JsonRpcRequest::new(self.next_id(), "tools/list");
        let response = self
            .send_with_retry(request, timeout)
            .await
            .map_err(|e| AgentError::Remote(format!("tools/list failed: {}", e)))?;

        if let Some(error) = response.error {
            return Err(AgentError::Remote(format!(
                "tools/list rejected ({}): {}",
                error.code, error.message
            )));
        }

        let result = response
            .result
            .ok_or_else(|| AgentError::Remote("tools/list returned no result".to_string()))?;
        let listing: ListToolsResult = serde_json::from_value(result)
            .map_err(|e| AgentError::Remote(format!("malformed tools/list result: {}", e)))?;
        Ok(listing.tools)
    }

    /// Invoke one remote tool.
    ///
    /// Transport failures are retried once; everything the host itself
    /// reports (unknown tool, execution error) is final.
    pub async fn call(
        &self,
        name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> std::result::Result<String, RemoteCallError> {
        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments: Some(arguments),
        })
        .map_err(|e| RemoteCallError::Execution(format!("argument encoding failed: {}", e)))?;

        let request = JsonRpcRequest::new(self.next_id(), "tools/call").with_params(params);

        let response = self.send_with_retry(request, timeout).await?;

        if let Some(error) = response.error {
            if error.code == METHOD_NOT_FOUND {
                return Err(RemoteCallError::ToolNotFound(error.message));
            }
            return Err(RemoteCallError::Execution(format!(
                "host error ({}): {}",
                error.code, error.message
            )));
        }

        let result = response
            .result
            .ok_or_else(|| RemoteCallError::Execution("empty tools/call result".to_string()))?;
        let call_result: CallToolResult = serde_json::from_value(result)
            .map_err(|e| RemoteCallError::Execution(format!("malformed result: {}", e)))?;

        let text = call_result.text();
        if call_result.is_error {
            return Err(RemoteCallError::Execution(text));
        }
        Ok(text)
    }
}
