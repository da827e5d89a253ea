//! JSON-RPC envelope handling shared by every transport.
//!
//! Transports hand raw payloads to [`RpcHandler`] and write back whatever it returns. `None`
//! means the payload was a notification and nothing is sent.

use crate::dispatcher::{Dispatcher, ToolInfo};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

pub const JSONRPC_VERSION: &str = "2.0";
/// MCP protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponse {
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serialize for the wire. Falls back to a fixed internal-error envelope.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"jsonrpc\":\"2.0\",\"id\":null,\"error\":{{\"code\":{INTERNAL_ERROR},\"message\":\"serialization failed\"}}}}"
            )
        })
    }
}

/// One text block of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
}

/// Result payload of `tools.call`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: None,
        }
    }

    #[must_use]
    pub fn error_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: Some(true),
        }
    }

    /// Concatenated text of every content block.
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|Content::Text { text }| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ListToolsResult {
    tools: Vec<ToolInfo>,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Name and version reported in `initialize` and the info endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "evolution-tools-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Envelope handler: parses requests, routes methods, shapes responses.
pub struct RpcHandler {
    dispatcher: Arc<Dispatcher>,
    info: ServerInfo,
}

impl RpcHandler {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            info: ServerInfo::default(),
        }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Handle one raw payload (a stdio line or an HTTP body).
    pub async fn handle_payload(&self, payload: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                debug!(error = %e, "unparsable envelope");
                Some(JsonRpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                ))
            }
        }
    }

    /// Handle one already-parsed envelope.
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let Value::Object(envelope) = value else {
            return Some(JsonRpcResponse::failure(
                Value::Null,
                INVALID_REQUEST,
                "Invalid request: envelope must be a JSON object",
            ));
        };

        let id = match envelope.get("id") {
            None => None,
            Some(id @ (Value::String(_) | Value::Number(_))) => Some(id.clone()),
            Some(_) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    INVALID_REQUEST,
                    "Invalid request: id must be a string or a number",
                ));
            }
        };

        if let Some(version) = envelope.get("jsonrpc")
            && version.as_str() != Some(JSONRPC_VERSION)
        {
            return id.map(|id| {
                JsonRpcResponse::failure(
                    id,
                    INVALID_REQUEST,
                    "Invalid request: jsonrpc must be \"2.0\"",
                )
            });
        }

        let Some(method) = envelope.get("method").and_then(Value::as_str) else {
            return id.map(|id| {
                JsonRpcResponse::failure(id, INVALID_REQUEST, "Invalid request: missing method")
            });
        };

        let Some(id) = id else {
            debug!(method, "notification received");
            return None;
        };

        let params = envelope.get("params").cloned().unwrap_or(Value::Null);
        Some(self.route(id, method, params).await)
    }

    async fn route(&self, id: Value, method: &str, params: Value) -> JsonRpcResponse {
        match method {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, Value::Object(Map::new())),
            "tools.list" | "tools/list" => {
                let listing = ListToolsResult {
                    tools: self.dispatcher.list_tools(),
                };
                to_response(id, &listing)
            }
            "tools.call" | "tools/call" => self.call(id, params).await,
            other => {
                debug!(method = other, "method not found");
                JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}"))
            }
        }
    }

    async fn call(&self, id: Value, params: Value) -> JsonRpcResponse {
        let call = match serde_json::from_value::<CallParams>(params) {
            Ok(call) => call,
            Err(e) => {
                return JsonRpcResponse::failure(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: tools.call params must be {{name, arguments}}: {e}"),
                );
            }
        };

        match self.dispatcher.handle(&call.name, call.arguments).await {
            Ok(result) => to_response(id, &result),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call rejected");
                JsonRpcResponse::failure(id, e.code(), e.to_string())
            }
        }
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": self.info,
        })
    }
}

fn to_response(id: Value, payload: &impl Serialize) -> JsonRpcResponse {
    match serde_json::to_value(payload) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, format!("Internal error: {e}")),
    }
}
