//! Request routing for one tool server.
//!
//! The dispatcher is stateless across requests: each [`Request`] is resolved to
//! a protocol method, then (for `tools/call`) to a registered tool, validated,
//! executed under the per-call timeout, and wrapped into a [`Response`].

use crate::error::ToolError;
use crate::mcp::protocol::{
    CallToolResult, InitializeResult, Request, Response, RpcError, decode_request,
};
use crate::models::DEFAULT_QUERY_TIMEOUT_SECS;
use crate::tools::ToolService;
use serde_json::{Map, Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default time budget for one `tools/call`.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS);

pub struct Dispatcher<S> {
    service: S,
    call_timeout: Duration,
}

impl<S: ToolService> Dispatcher<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Decode and handle one input line. Blank lines and notifications yield `None`.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match decode_request(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!(code = e.error.code, error = %e.error.message, "Undecodable request line");
                Some(e.into_response())
            }
        }
    }

    /// Handle a decoded request. Returns `None` only for notifications.
    pub async fn handle(&self, request: Request) -> Option<Response> {
        let id = request.response_id();
        debug!(method = %request.method, id = %id, "Handling request");

        let result = match request.method.as_str() {
            "initialize" => serde_json::to_value(InitializeResult::new(self.service.server_name()))
                .map_err(|e| RpcError::tool_failure(format!("Failed to encode result: {}", e))),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.service.registry().list_result()),
            "tools/call" => self.call_tool(request.params).await,
            method if method.starts_with("notifications/") => {
                debug!(method = %method, "Notification received");
                return None;
            }
            method => {
                warn!(method = %method, "Unknown method");
                Err(RpcError::method_not_found(format!("method not found: {}", method)))
            }
        };

        Some(match result {
            Ok(value) => Response::result(id, value),
            Err(error) => Response::error(id, error),
        })
    }

    async fn call_tool(&self, mut params: Map<String, Value>) -> Result<Value, RpcError> {
        let name = match params.remove("name") {
            Some(Value::String(name)) => name,
            Some(_) => return Err(RpcError::invalid_params("tool name must be a string")),
            None => return Err(RpcError::invalid_params("missing tool name")),
        };
        let arguments = match params.remove("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(arguments)) => arguments,
            Some(_) => return Err(RpcError::invalid_params("arguments must be an object")),
        };

        let descriptor = self
            .service
            .registry()
            .get(&name)
            .ok_or_else(|| ToolError::unknown_tool(&name))?;
        let arguments = descriptor.validate(arguments).map_err(|e| {
            warn!(tool = %name, error = %e, "Invalid tool arguments");
            RpcError::from(e)
        })?;

        let started = Instant::now();
        let output = tokio::time::timeout(self.call_timeout, self.service.call_tool(&name, arguments))
            .await
            .map_err(|_| ToolError::timeout(&name, self.call_timeout.as_secs()))
            .and_then(|result| result);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match output {
            Ok(output) => {
                info!(tool = %name, elapsed_ms, is_error = output.is_error, "Tool call finished");
                serde_json::to_value(CallToolResult::from(output))
                    .map_err(|e| RpcError::tool_failure(format!("Failed to encode result: {}", e)))
            }
            Err(e) => {
                warn!(tool = %name, elapsed_ms, error = %e, "Tool call failed");
                Err(e.into())
            }
        }
    }
}
