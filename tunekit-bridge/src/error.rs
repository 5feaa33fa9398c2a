//! Bridge-specific error types.

/// Errors that can occur while talking to the Python worker.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to start worker: {message}")]
    Spawn { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("JSON-RPC parse error: {message}")]
    Parse { message: String },

    #[error("Worker call '{method}' failed: {message} (code {code})")]
    Remote {
        method: String,
        code: i64,
        message: String,
        /// Python traceback captured by the worker, when available.
        traceback: Option<String>,
    },

    #[error("Worker closed the connection while waiting for '{method}'")]
    Closed { method: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// The Python traceback, if this error came from the worker.
    pub fn traceback(&self) -> Option<&str> {
        match self {
            BridgeError::Remote { traceback, .. } => traceback.as_deref(),
            _ => None,
        }
    }
}
