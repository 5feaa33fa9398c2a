//! Low-rank adapter configuration and adapter checkpoint manifest.

use crate::error::TuneError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Linear projections adapted in every transformer layer.
pub const TARGET_MODULES: [&str; 7] = [
    "q_proj",
    "k_proj",
    "v_proj",
    "o_proj",
    "up_proj",
    "down_proj",
    "gate_proj",
];

/// File peft writes next to the adapter weights.
pub const ADAPTER_CONFIG_FILE: &str = "adapter_config.json";

/// Keyword arguments for peft's `LoraConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraConfig {
    pub r: u32,
    pub lora_alpha: u32,
    pub lora_dropout: f64,
    pub bias: String,
    pub task_type: String,
    pub target_modules: Vec<String>,
}

impl LoraConfig {
    /// Causal-LM adapter over [`TARGET_MODULES`], no bias training.
    pub fn causal_lm(r: u32, lora_alpha: u32, lora_dropout: f64) -> Self {
        Self {
            r,
            lora_alpha,
            lora_dropout,
            bias: "none".into(),
            task_type: "CAUSAL_LM".into(),
            target_modules: TARGET_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Effective scale applied to the low-rank update (`alpha / r`).
    pub fn scaling(&self) -> f64 {
        f64::from(self.lora_alpha) / f64::from(self.r.max(1))
    }
}

impl Default for LoraConfig {
    fn default() -> Self {
        Self::causal_lm(16, 32, 0.05)
    }
}

/// The parts of `adapter_config.json` tunekit looks at.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdapterManifest {
    #[serde(default)]
    pub base_model_name_or_path: Option<String>,
    #[serde(default)]
    pub peft_type: Option<String>,
    #[serde(default)]
    pub r: Option<u32>,
    #[serde(default)]
    pub lora_alpha: Option<f64>,
    /// A list of names, or a single regex string.
    #[serde(default)]
    pub target_modules: Option<serde_json::Value>,
}

impl AdapterManifest {
    /// Read `adapter_config.json` from an adapter directory.
    pub fn read(adapter_dir: &Path) -> Result<Self, TuneError> {
        let path = adapter_dir.join(ADAPTER_CONFIG_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            TuneError::adapter(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| TuneError::adapter(format!("invalid {}: {e}", path.display())))
    }

    /// Number of adapted modules, when listed explicitly.
    pub fn target_module_count(&self) -> Option<usize> {
        self.target_modules
            .as_ref()
            .and_then(|v| v.as_array())
            .map(Vec::len)
    }

    /// Whether the adapter was trained against a different base model.
    pub fn base_model_differs(&self, base_model: &str) -> bool {
        self.base_model_name_or_path
            .as_deref()
            .is_some_and(|recorded| recorded.trim_end_matches('/') != base_model.trim_end_matches('/'))
    }
}
