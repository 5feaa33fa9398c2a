//! # tunekit-bridge
//!
//! JSON-RPC 2.0 bridge to the Python worker that hosts transformers, peft,
//! trl and datasets. Messages are newline-delimited JSON over the worker's
//! stdin/stdout; the worker's stderr is passed through untouched.
//!
//! ## Layout
//!
//! - [`protocol`]: wire types
//! - [`transport`]: process and in-memory transports
//! - [`client`]: request/response matching and notification routing
//! - [`runtime`]: interpreter selection, package checks, worker launch
//! - [`worker`]: a running worker session

pub mod client;
pub mod error;
pub mod protocol;
pub mod runtime;
pub mod transport;
pub mod worker;

pub use client::BridgeClient;
pub use error::BridgeError;
pub use runtime::{PythonRuntime, REQUIRED_PACKAGES, WORKER_SOURCE};
pub use transport::{ChannelTransport, ProcessTransport, Transport};
pub use worker::Worker;
