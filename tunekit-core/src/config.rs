//! Runtime configuration.
//!
//! Uses `figment` for layering: built-in defaults -> optional TOML file given
//! with `--config` -> explicit CLI overrides. Environment variables are not
//! consulted. Hyperparameters are not configured here; they are CLI flags.

use crate::error::TuneError;
use crate::sft::{EvalStrategyField, SequenceField, TokenizerKeyword};
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level tunekit configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TunekitConfig {
    /// Python interpreter hosting the worker.
    #[serde(default)]
    pub python: PythonConfig,
    /// Pins for trainer API field names. Unset fields are resolved from the
    /// installed library versions.
    #[serde(default)]
    pub trainer_api: TrainerApiConfig,
}

/// Python runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PythonConfig {
    /// Path to the Python executable (`python3` when unset).
    #[serde(default)]
    pub python_path: Option<PathBuf>,
    /// Virtual environment to run the worker from; takes precedence.
    #[serde(default)]
    pub venv_path: Option<PathBuf>,
    /// Verify required packages are importable before starting the worker.
    #[serde(default = "default_true")]
    pub check_packages: bool,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            python_path: None,
            venv_path: None,
            check_packages: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Explicit trainer API field choices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainerApiConfig {
    #[serde(default)]
    pub sequence_field: Option<SequenceField>,
    #[serde(default)]
    pub eval_strategy_field: Option<EvalStrategyField>,
    #[serde(default)]
    pub tokenizer_keyword: Option<TokenizerKeyword>,
}

/// Load configuration from defaults and an optional TOML file.
///
/// An explicitly named file that does not exist is an error rather than
/// silently falling back to defaults.
pub fn load_config(file: Option<&Path>) -> Result<TunekitConfig, TuneError> {
    let mut figment = Figment::from(Serialized::defaults(TunekitConfig::default()));

    if let Some(path) = file {
        if !path.is_file() {
            return Err(TuneError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment.extract().map_err(|e| TuneError::Figment(Box::new(e)))
}

impl TunekitConfig {
    /// Apply the `--python` CLI override.
    pub fn with_python_override(mut self, python: Option<PathBuf>) -> Self {
        if let Some(path) = python {
            self.python.python_path = Some(path);
            self.python.venv_path = None;
        }
        self
    }
}
