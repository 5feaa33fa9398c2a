//! The seam between the drivers and the ML libraries.
//!
//! Drivers only ever talk to a [`Backend`]. Objects (datasets, tokenizers,
//! models, trainers) live on the backend side and are referred to by
//! [`Handle`]. [`PythonBackend`] forwards every call to the Python worker.

mod python;

pub use python::{PythonBackend, QUANTIZATION_PACKAGE};

use crate::error::TuneError;
use crate::lora::LoraConfig;
use crate::model::{ModelLoadOptions, SaveFormat};
use crate::precision::ComputeCapability;
use crate::sft::{ReportedVersions, SftConfig, TokenizerKeyword};
use crate::tokenizer::TokenizerHandle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Opaque id of an object held by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(pub u64);

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A loaded dataset split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetHandle {
    pub handle: Handle,
    pub num_rows: usize,
}

/// A loaded (possibly adapter-wrapped or merged) model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelHandle {
    pub handle: Handle,
}

/// A constructed SFT trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerHandle {
    pub handle: Handle,
}

/// Everything the SFT trainer is constructed from.
#[derive(Debug, Clone, Copy)]
pub struct TrainerSpec<'a> {
    pub model: &'a ModelHandle,
    pub tokenizer: &'a TokenizerHandle,
    pub train_dataset: &'a DatasetHandle,
    pub eval_dataset: &'a DatasetHandle,
    pub args: &'a SftConfig,
    pub peft: &'a LoraConfig,
    pub tokenizer_keyword: TokenizerKeyword,
}

/// Summary returned by the trainer's `train()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub global_step: u64,
    /// `None` when the trainer reported a non-finite loss.
    #[serde(default)]
    pub training_loss: Option<f64>,
    #[serde(default)]
    pub metrics: serde_json::Map<String, serde_json::Value>,
}

/// Operations the training and merge drivers need from the ML stack.
///
/// Every call blocks until the library call returns or fails; there are no
/// retries and no timeouts at this layer.
#[async_trait]
pub trait Backend: Send {
    /// Installed library versions.
    async fn library_versions(&mut self) -> Result<ReportedVersions, TuneError>;

    /// Compute capability of the first CUDA device, `None` without one.
    async fn device_capability(&mut self) -> Result<Option<ComputeCapability>, TuneError>;

    /// Load a JSON-lines file as a single split.
    async fn load_dataset(&mut self, path: &Path) -> Result<DatasetHandle, TuneError>;

    /// Load the (fast) tokenizer of `model`.
    async fn load_tokenizer(&mut self, model: &str) -> Result<TokenizerHandle, TuneError>;

    /// Set the padding token; `tokenizer` is updated with the new state.
    async fn set_pad_token(
        &mut self,
        tokenizer: &mut TokenizerHandle,
        token: &str,
    ) -> Result<(), TuneError>;

    async fn load_model(
        &mut self,
        model: &str,
        options: &ModelLoadOptions,
    ) -> Result<ModelHandle, TuneError>;

    async fn create_trainer(&mut self, spec: TrainerSpec<'_>) -> Result<TrainerHandle, TuneError>;

    /// Run the full training loop.
    async fn train(&mut self, trainer: &TrainerHandle) -> Result<TrainOutcome, TuneError>;

    /// Save the trained adapter.
    async fn save_trainer_model(
        &mut self,
        trainer: &TrainerHandle,
        dir: &Path,
    ) -> Result<(), TuneError>;

    async fn save_tokenizer(
        &mut self,
        tokenizer: &TokenizerHandle,
        dir: &Path,
    ) -> Result<(), TuneError>;

    /// Wrap `model` with the adapter stored in `adapter_dir`.
    async fn load_adapter(
        &mut self,
        model: &ModelHandle,
        adapter_dir: &Path,
    ) -> Result<ModelHandle, TuneError>;

    /// Fold adapter weights into the base weights and drop the wrapper.
    async fn merge_and_unload(&mut self, model: &ModelHandle) -> Result<ModelHandle, TuneError>;

    async fn save_model(
        &mut self,
        model: &ModelHandle,
        dir: &Path,
        format: SaveFormat,
    ) -> Result<(), TuneError>;
}
