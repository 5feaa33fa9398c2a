//! Python runtime selection and worker launch.
//!
//! The worker script ships inside this crate and is passed to the interpreter
//! with `-c`, so nothing is written to disk to start it.

use crate::error::BridgeError;
use crate::transport::ProcessTransport;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::{Child, Command};
use tracing::debug;

/// Source of the Python worker that hosts the ML libraries.
pub const WORKER_SOURCE: &str = include_str!("../python/tunekit_worker.py");

/// Packages every worker session needs.
pub const REQUIRED_PACKAGES: &[&str] = &["torch", "transformers", "peft", "trl", "datasets"];

/// Interpreter used to run the worker.
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    python_path: PathBuf,
    venv_path: Option<PathBuf>,
}

impl Default for PythonRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl PythonRuntime {
    /// Use `python3` from `PATH`.
    pub fn new() -> Self {
        Self {
            python_path: PathBuf::from("python3"),
            venv_path: None,
        }
    }

    /// Create with explicit paths. A venv, when given, wins over `python_path`.
    pub fn with_config(python_path: Option<PathBuf>, venv_path: Option<PathBuf>) -> Self {
        Self {
            python_path: python_path.unwrap_or_else(|| PathBuf::from("python3")),
            venv_path,
        }
    }

    /// The interpreter that will actually be executed.
    pub fn python_cmd(&self) -> PathBuf {
        match &self.venv_path {
            Some(venv) => venv_python(venv),
            None => self.python_path.clone(),
        }
    }

    /// Check which of `packages` are importable, without importing them.
    pub async fn check_packages(
        &self,
        packages: &[&str],
    ) -> Result<BTreeMap<String, bool>, BridgeError> {
        let script = format!(
            "import importlib.util, json, sys\n\
             names = {names}\n\
             print(json.dumps({{n: importlib.util.find_spec(n) is not None for n in names}}))",
            names = serde_json::to_string(packages)?,
        );
        let output = Command::new(self.python_cmd())
            .args(["-c", &script])
            .output()
            .await
            .map_err(|e| BridgeError::Spawn {
                message: format!("Failed to run {}: {e}", self.python_cmd().display()),
            })?;

        if !output.status.success() {
            return Err(BridgeError::Spawn {
                message: format!(
                    "Package check failed (exit {}): {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(stdout.trim()).map_err(|e| BridgeError::Parse {
            message: format!("Invalid package check output: {e}"),
        })
    }

    /// Fail with the list of missing packages, if any.
    pub async fn ensure_packages(&self, packages: &[&str]) -> Result<(), BridgeError> {
        let found = self.check_packages(packages).await?;
        let missing: Vec<&str> = found
            .iter()
            .filter(|(_, available)| !**available)
            .map(|(name, _)| name.as_str())
            .collect();
        if missing.is_empty() {
            debug!(?packages, "Python packages available");
            return Ok(());
        }
        Err(BridgeError::Spawn {
            message: format!(
                "Missing Python packages for {}: {} (pip install {})",
                self.python_cmd().display(),
                missing.join(", "),
                missing.join(" ")
            ),
        })
    }

    /// Start the worker and return its transport and process handle.
    pub fn spawn_worker(&self) -> Result<(ProcessTransport, Child), BridgeError> {
        let python = self.python_cmd();
        debug!(python = %python.display(), "Starting Python worker");
        ProcessTransport::spawn(&python, ["-u", "-c", WORKER_SOURCE])
    }
}

fn venv_python(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}
