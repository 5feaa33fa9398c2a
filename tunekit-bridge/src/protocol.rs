//! JSON-RPC 2.0 wire types spoken between tunekit and the Python worker.
//!
//! Every message is a single JSON object on its own line. The host sends
//! requests; the worker answers with responses and may interleave
//! notifications (log lines, trainer progress) before the response arrives.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version string carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// Error code the worker uses for Python exceptions raised by a library call.
pub const WORKER_EXCEPTION: i64 = -32000;

/// A JSON-RPC 2.0 request object. The host only ever issues integer ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: i64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: i64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    /// The worker puts `{"type": ..., "traceback": ...}` here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Python traceback attached by the worker, if any.
    pub fn traceback(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|d| d.get("traceback"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// A JSON-RPC 2.0 response. Exactly one of `result` or `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: i64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: i64, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A notification sent by the worker (no `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Anything the worker can write on its protocol channel.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

impl WorkerMessage {
    /// Classify a raw line. Responses carry an `id`; notifications carry a
    /// `method` and no `id`.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        if value.get("id").is_some_and(|id| !id.is_null()) {
            Ok(WorkerMessage::Response(serde_json::from_value(value)?))
        } else {
            Ok(WorkerMessage::Notification(serde_json::from_value(value)?))
        }
    }
}
