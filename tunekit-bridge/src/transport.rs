//! Transport layer for the worker bridge.
//!
//! - [`ProcessTransport`]: newline-delimited JSON over a child's stdin/stdout
//! - [`ChannelTransport`]: in-process tokio mpsc channels (for testing)

use async_trait::async_trait;
use std::ffi::OsStr;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;

use crate::error::BridgeError;

/// Reads and writes single-line JSON-RPC messages.
#[async_trait]
pub trait Transport: Send {
    /// Read the next message. `Ok(None)` means the other side hung up.
    async fn read_message(&mut self) -> Result<Option<String>, BridgeError>;

    /// Write one message; the implementation handles framing and flushing.
    async fn write_message(&mut self, message: &str) -> Result<(), BridgeError>;

    /// Flush and stop writing.
    async fn close(&mut self) -> Result<(), BridgeError>;
}

// ---------------------------------------------------------------------------
// ProcessTransport
// ---------------------------------------------------------------------------

/// Transport over the pipes of a spawned worker process.
///
/// Only stdin and stdout are captured. The child's stderr is inherited so
/// library progress bars and tracebacks land on the user's terminal.
pub struct ProcessTransport {
    child_stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
}

impl std::fmt::Debug for ProcessTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessTransport").finish()
    }
}

impl ProcessTransport {
    /// Spawn `program` with `args` and attach to its stdio.
    ///
    /// The child is killed if its handle is dropped, so a failing host never
    /// leaves a worker holding GPU memory behind.
    pub fn spawn<S, I, A>(program: S, args: I) -> Result<(Self, Child), BridgeError>
    where
        S: AsRef<OsStr>,
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let program = program.as_ref();
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BridgeError::Spawn {
                message: format!("Failed to spawn {}: {e}", program.to_string_lossy()),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| BridgeError::Spawn {
            message: "Failed to capture child stdin".into(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| BridgeError::Spawn {
            message: "Failed to capture child stdout".into(),
        })?;

        Ok((
            Self {
                child_stdin: stdin,
                reader: BufReader::new(stdout),
            },
            child,
        ))
    }
}

#[async_trait]
impl Transport for ProcessTransport {
    async fn read_message(&mut self) -> Result<Option<String>, BridgeError> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end().to_string()))
    }

    async fn write_message(&mut self, message: &str) -> Result<(), BridgeError> {
        self.child_stdin.write_all(message.as_bytes()).await?;
        self.child_stdin.write_all(b"\n").await?;
        self.child_stdin.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.child_stdin.flush().await?;
        self.child_stdin.shutdown().await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ChannelTransport
// ---------------------------------------------------------------------------

/// In-process transport backed by tokio mpsc channels.
///
/// Lets tests play the worker side without spawning Python.
pub struct ChannelTransport {
    receiver: mpsc::Receiver<String>,
    sender: mpsc::Sender<String>,
}

impl ChannelTransport {
    pub fn new(receiver: mpsc::Receiver<String>, sender: mpsc::Sender<String>) -> Self {
        Self { receiver, sender }
    }

    /// Create a linked pair: what one side writes, the other reads.
    pub fn pair(buffer: usize) -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::channel(buffer);
        let (tx_b, rx_b) = mpsc::channel(buffer);
        (
            ChannelTransport::new(rx_a, tx_b),
            ChannelTransport::new(rx_b, tx_a),
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn read_message(&mut self) -> Result<Option<String>, BridgeError> {
        Ok(self.receiver.recv().await)
    }

    async fn write_message(&mut self, message: &str) -> Result<(), BridgeError> {
        self.sender
            .send(message.to_string())
            .await
            .map_err(|e| BridgeError::Transport {
                message: format!("channel send failed: {e}"),
            })
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.receiver.close();
        Ok(())
    }
}
