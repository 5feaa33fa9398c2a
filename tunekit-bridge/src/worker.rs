//! A running Python worker: client plus process handle.

use crate::client::BridgeClient;
use crate::error::BridgeError;
use crate::runtime::PythonRuntime;
use crate::transport::ProcessTransport;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::process::ExitStatus;
use tokio::process::Child;
use tracing::{debug, info, warn};

/// Owns the worker process for the lifetime of one driver run.
pub struct Worker {
    client: BridgeClient<ProcessTransport>,
    child: Child,
}

impl Worker {
    /// Spawn the worker and wait for its `runtime.ping` answer.
    pub async fn start(runtime: &PythonRuntime) -> Result<Self, BridgeError> {
        let (transport, child) = runtime.spawn_worker()?;
        let mut worker = Self {
            client: BridgeClient::new(transport),
            child,
        };
        let pong = worker.client.call_value("runtime.ping", Value::Null).await?;
        info!(
            pid = worker.child.id(),
            python = pong["python"].as_str().unwrap_or("unknown"),
            "Python worker ready"
        );
        Ok(worker)
    }

    pub async fn call<P, R>(&mut self, method: &str, params: P) -> Result<R, BridgeError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        self.client.call(method, params).await
    }

    pub async fn call_value(&mut self, method: &str, params: Value) -> Result<Value, BridgeError> {
        self.client.call_value(method, params).await
    }

    /// Ask the worker to exit and reap it.
    pub async fn shutdown(mut self) -> Result<ExitStatus, BridgeError> {
        if let Err(e) = self.client.call_value("shutdown", Value::Null).await {
            warn!(error = %e, "Worker did not acknowledge shutdown");
        }
        self.client.close().await?;
        let status = self.child.wait().await?;
        debug!(%status, "Python worker exited");
        Ok(status)
    }
}
