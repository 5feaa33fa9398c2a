//! Worker client: request/response matching over a [`Transport`].
//!
//! One request is in flight at a time. While waiting for a response the
//! client drains worker notifications into `tracing` and ignores stray output.
//! A malformed JSON-RPC line fails the pending call.

use crate::error::BridgeError;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, WorkerMessage};
use crate::transport::Transport;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

/// JSON-RPC client bound to one worker.
pub struct BridgeClient<T: Transport> {
    transport: T,
    next_id: i64,
}

impl<T: Transport> BridgeClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: 1,
        }
    }

    /// Call `method` and deserialize its result into `R`.
    pub async fn call<P, R>(&mut self, method: &str, params: P) -> Result<R, BridgeError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let result = self.call_value(method, serde_json::to_value(params)?).await?;
        serde_json::from_value(result).map_err(|e| BridgeError::Parse {
            message: format!("Unexpected result shape for '{method}': {e}"),
        })
    }

    /// Call `method` and return the raw JSON result (`null` if absent).
    pub async fn call_value(&mut self, method: &str, params: Value) -> Result<Value, BridgeError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = JsonRpcRequest::new(id, method, params);
        self.transport
            .write_message(&serde_json::to_string(&request)?)
            .await?;
        debug!(id, method, "Sent worker request");

        loop {
            let raw = self
                .transport
                .read_message()
                .await?
                .ok_or_else(|| BridgeError::Closed {
                    method: method.to_string(),
                })?;
            if raw.is_empty() {
                continue;
            }

            let message = match WorkerMessage::parse(&raw) {
                Ok(message) => message,
                // A broken protocol line may be our response; waiting on would never end.
                Err(e) if looks_like_protocol(&raw) => {
                    return Err(BridgeError::Parse {
                        message: format!("Malformed worker message while waiting for '{method}': {e}"),
                    });
                }
                Err(e) => {
                    debug!(line = %raw, error = %e, "Skipping non-protocol worker output");
                    continue;
                }
            };

            let response = match message {
                WorkerMessage::Notification(note) => {
                    dispatch_notification(&note);
                    continue;
                }
                WorkerMessage::Response(response) => response,
            };

            if response.id != id {
                warn!(
                    expected_id = id,
                    received_id = response.id,
                    "Received response with unexpected id, skipping"
                );
                continue;
            }

            if let Some(error) = response.error {
                let traceback = error.traceback();
                return Err(BridgeError::Remote {
                    method: method.to_string(),
                    code: error.code,
                    message: error.message,
                    traceback,
                });
            }

            return Ok(response.result.unwrap_or(Value::Null));
        }
    }

    /// Close the write side of the transport.
    pub async fn close(&mut self) -> Result<(), BridgeError> {
        self.transport.close().await
    }
}

fn looks_like_protocol(raw: &str) -> bool {
    raw.trim_start().starts_with('{') && raw.contains("\"jsonrpc\"")
}

/// Route a worker notification into the host's log.
fn dispatch_notification(note: &JsonRpcNotification) {
    match note.method.as_str() {
        "log" => {
            let level = note.params["level"].as_str().unwrap_or("info");
            let message = note.params["message"].as_str().unwrap_or_default();
            match level {
                "error" | "warning" | "warn" => warn!(target: "tunekit::worker", "{message}"),
                "debug" => debug!(target: "tunekit::worker", "{message}"),
                _ => info!(target: "tunekit::worker", "{message}"),
            }
        }
        "trainer/log" => {
            let p = &note.params;
            info!(
                target: "tunekit::trainer",
                step = p["step"].as_u64(),
                epoch = p["epoch"].as_f64(),
                loss = p["loss"].as_f64(),
                eval_loss = p["eval_loss"].as_f64(),
                learning_rate = p["learning_rate"].as_f64(),
                "Trainer progress"
            );
        }
        other => debug!(method = other, params = %note.params, "Unhandled worker notification"),
    }
}
