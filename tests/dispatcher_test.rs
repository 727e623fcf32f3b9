//! Integration tests for request routing, error envelopes and the per-call timeout.

use mcp_tool_servers::error::{ToolError, ToolResult};
use mcp_tool_servers::mcp::protocol::{
    INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, TOOL_EXECUTION_ERROR,
};
use mcp_tool_servers::mcp::{Dispatcher, ParamSpec, ParamType, Request, ToolDescriptor, ToolRegistry};
use mcp_tool_servers::tools::{ToolOutput, ToolService};
use serde_json::{Map, Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Test service: `echo` returns its argument, `fail` errors, `slow` sleeps past any timeout.
struct StubService {
    registry: ToolRegistry,
    calls: AtomicUsize,
}

impl StubService {
    fn new() -> Self {
        Self {
            registry: ToolRegistry::new(vec![
                ToolDescriptor::new("echo", "Echo a message")
                    .param(ParamSpec::required("message", ParamType::String, "Text"))
                    .param(ParamSpec::optional(
                        "repeat",
                        ParamType::Integer,
                        json!(1),
                        "Copies",
                    )),
                ToolDescriptor::new("fail", "Always fails"),
                ToolDescriptor::new("slow", "Never finishes in time"),
            ]),
            calls: AtomicUsize::new(0),
        }
    }
}

impl ToolService for StubService {
    fn server_name(&self) -> &'static str {
        "stub"
    }

    fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult<ToolOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match name {
            "echo" => {
                let message = arguments["message"].as_str().unwrap_or_default();
                let repeat = arguments["repeat"].as_u64().unwrap_or(1) as usize;
                Ok(ToolOutput::text(message.repeat(repeat)))
            }
            "fail" => Err(ToolError::internal("backend exploded")),
            "slow" => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(ToolOutput::text("late"))
            }
            other => Err(ToolError::unknown_tool(other)),
        }
    }
}

fn dispatcher() -> Dispatcher<StubService> {
    Dispatcher::new(StubService::new())
}

async fn call(d: &Dispatcher<StubService>, params: Value) -> Value {
    let response = d.handle(Request::new(1, "tools/call", params)).await.unwrap();
    serde_json::to_value(response).unwrap()
}

#[tokio::test]
async fn test_tools_list_in_registration_order() {
    let response = dispatcher()
        .handle(Request::new(1, "tools/list", json!({})))
        .await
        .unwrap();
    let body = serde_json::to_value(response).unwrap();
    let names: Vec<&str> = body["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["echo", "fail", "slow"]);
    assert_eq!(
        body["result"]["tools"][0]["inputSchema"]["required"],
        json!(["message"])
    );
}

#[tokio::test]
async fn test_call_applies_defaults() {
    let d = dispatcher();
    let body = call(&d, json!({"name": "echo", "arguments": {"message": "hi"}})).await;
    assert_eq!(body["result"]["content"][0]["type"], "text");
    assert_eq!(body["result"]["content"][0]["text"], "hi");
    assert!(body["result"].get("isError").is_none());

    let body = call(&d, json!({"name": "echo", "arguments": {"message": "ab", "repeat": 3}})).await;
    assert_eq!(body["result"]["content"][0]["text"], "ababab");
}

#[tokio::test]
async fn test_unknown_tool_is_method_not_found() {
    let d = dispatcher();
    let body = call(&d, json!({"name": "rm_rf"})).await;
    assert_eq!(body["error"]["code"], METHOD_NOT_FOUND);
    assert!(body["error"]["message"].as_str().unwrap().contains("rm_rf"));
    assert_eq!(d.service().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_arguments_never_reach_handler() {
    let d = dispatcher();
    for arguments in [
        json!({}),
        json!({"message": 5}),
        json!({"message": "x", "repeat": "two"}),
        json!({"message": "x", "extra": true}),
    ] {
        let body = call(&d, json!({"name": "echo", "arguments": arguments})).await;
        assert_eq!(body["error"]["code"], TOOL_EXECUTION_ERROR);
    }
    assert_eq!(d.service().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handler_failure_is_tool_error() {
    let d = dispatcher();
    let body = call(&d, json!({"name": "fail"})).await;
    assert_eq!(body["error"]["code"], TOOL_EXECUTION_ERROR);
    assert!(body["error"]["message"].as_str().unwrap().contains("backend exploded"));
    assert_eq!(d.service().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_tool_error() {
    let d = dispatcher().with_call_timeout(Duration::from_secs(2));
    let body = call(&d, json!({"name": "slow"})).await;
    assert_eq!(body["error"]["code"], TOOL_EXECUTION_ERROR);
    assert!(body["error"]["message"].as_str().unwrap().contains("slow"));

    // The dispatcher keeps serving afterwards.
    let body = call(&d, json!({"name": "echo", "arguments": {"message": "ok"}})).await;
    assert_eq!(body["result"]["content"][0]["text"], "ok");
}

#[tokio::test]
async fn test_bad_call_params() {
    let d = dispatcher();
    for params in [
        json!({"arguments": {}}),
        json!({"name": null}),
        json!({"name": "echo", "arguments": [1, 2]}),
    ] {
        let body = call(&d, params).await;
        assert_eq!(body["error"]["code"], INVALID_PARAMS);
    }
}

#[tokio::test]
async fn test_line_level_errors_keep_id() {
    let d = dispatcher();

    let parse = d.handle_line("{not json").await.unwrap();
    let parse = serde_json::to_value(parse).unwrap();
    assert_eq!(parse["error"]["code"], PARSE_ERROR);
    assert_eq!(parse["id"], Value::Null);

    let invalid = d.handle_line(r#"{"jsonrpc":"2.0","id":"abc","method":42}"#).await.unwrap();
    let invalid = serde_json::to_value(invalid).unwrap();
    assert_eq!(invalid["error"]["code"], INVALID_REQUEST);
    assert_eq!(invalid["id"], "abc");

    let array = d.handle_line("[1,2,3]").await.unwrap();
    assert_eq!(serde_json::to_value(array).unwrap()["error"]["code"], INVALID_REQUEST);
}

#[tokio::test]
async fn test_ping_and_unknown_method() {
    let d = dispatcher();
    let ping = d.handle(Request::new(9, "ping", json!({}))).await.unwrap();
    assert_eq!(serde_json::to_value(ping).unwrap()["result"], json!({}));

    let unknown = d.handle(Request::new(10, "prompts/list", json!({}))).await.unwrap();
    let unknown = serde_json::to_value(unknown).unwrap();
    assert_eq!(unknown["error"]["code"], METHOD_NOT_FOUND);
    assert_eq!(unknown["error"]["message"], "method not found: prompts/list");
}
