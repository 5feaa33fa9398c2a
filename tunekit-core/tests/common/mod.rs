//! Shared fixtures for driver integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tunekit_core::TuneError;
use tunekit_core::backend::{
    Backend, DatasetHandle, Handle, ModelHandle, TrainOutcome, TrainerHandle, TrainerSpec,
};
use tunekit_core::model::{ModelLoadOptions, SaveFormat};
use tunekit_core::precision::ComputeCapability;
use tunekit_core::sft::{ReportedVersions, TokenizerKeyword};
use tunekit_core::tokenizer::TokenizerHandle;

/// One backend operation, as observed by [`MockBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    LibraryVersions,
    DeviceCapability,
    LoadDataset(PathBuf),
    LoadTokenizer(String),
    SetPadToken(String),
    LoadModel {
        model: String,
        options: ModelLoadOptions,
    },
    CreateTrainer {
        args: Value,
        peft: Value,
        tokenizer_keyword: TokenizerKeyword,
    },
    Train,
    SaveTrainerModel(PathBuf),
    SaveTokenizer(PathBuf),
    LoadAdapter(PathBuf),
    MergeAndUnload,
    SaveModel {
        dir: PathBuf,
        format: SaveFormat,
    },
}

/// In-memory backend that records every call.
pub struct MockBackend {
    pub calls: Vec<Call>,
    pub transformers: String,
    pub trl: String,
    pub capability: Option<ComputeCapability>,
    pub pad_token: Option<String>,
    pub eos_token: Option<String>,
    /// Row counts returned by successive `load_dataset` calls.
    pub dataset_rows: Vec<usize>,
    /// Make `train` fail with a remote-style error.
    pub fail_train: bool,
    pub next_handle: u64,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            transformers: "4.46.3".into(),
            trl: "0.12.2".into(),
            capability: Some(ComputeCapability::new(8, 0)),
            pad_token: Some("<|endoftext|>".into()),
            eos_token: Some("<|im_end|>".into()),
            dataset_rows: Vec::new(),
            fail_train: false,
            next_handle: 0,
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Handle {
        self.next_handle += 1;
        Handle(self.next_handle)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }

    /// Trainer arguments passed to the single `create_trainer` call.
    pub fn trainer_args(&self) -> Option<&Value> {
        self.calls.iter().find_map(|c| match c {
            Call::CreateTrainer { args, .. } => Some(args),
            _ => None,
        })
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn library_versions(&mut self) -> Result<ReportedVersions, TuneError> {
        self.calls.push(Call::LibraryVersions);
        Ok(ReportedVersions {
            python: Some("3.11.9".into()),
            transformers: Some(self.transformers.clone()),
            trl: Some(self.trl.clone()),
            ..Default::default()
        })
    }

    async fn device_capability(&mut self) -> Result<Option<ComputeCapability>, TuneError> {
        self.calls.push(Call::DeviceCapability);
        Ok(self.capability)
    }

    async fn load_dataset(&mut self, path: &Path) -> Result<DatasetHandle, TuneError> {
        self.calls.push(Call::LoadDataset(path.to_path_buf()));
        let loaded = self.count(|c| matches!(c, Call::LoadDataset(_))) - 1;
        let num_rows = self.dataset_rows.get(loaded).copied().unwrap_or(0);
        Ok(DatasetHandle {
            handle: self.handle(),
            num_rows,
        })
    }

    async fn load_tokenizer(&mut self, model: &str) -> Result<TokenizerHandle, TuneError> {
        self.calls.push(Call::LoadTokenizer(model.to_string()));
        Ok(TokenizerHandle {
            handle: self.handle(),
            pad_token: self.pad_token.clone(),
            eos_token: self.eos_token.clone(),
        })
    }

    async fn set_pad_token(
        &mut self,
        tokenizer: &mut TokenizerHandle,
        token: &str,
    ) -> Result<(), TuneError> {
        self.calls.push(Call::SetPadToken(token.to_string()));
        tokenizer.pad_token = Some(token.to_string());
        Ok(())
    }

    async fn load_model(
        &mut self,
        model: &str,
        options: &ModelLoadOptions,
    ) -> Result<ModelHandle, TuneError> {
        self.calls.push(Call::LoadModel {
            model: model.to_string(),
            options: options.clone(),
        });
        Ok(ModelHandle {
            handle: self.handle(),
        })
    }

    async fn create_trainer(&mut self, spec: TrainerSpec<'_>) -> Result<TrainerHandle, TuneError> {
        self.calls.push(Call::CreateTrainer {
            args: serde_json::to_value(spec.args)?,
            peft: serde_json::to_value(spec.peft)?,
            tokenizer_keyword: spec.tokenizer_keyword,
        });
        Ok(TrainerHandle {
            handle: self.handle(),
        })
    }

    async fn train(&mut self, _trainer: &TrainerHandle) -> Result<TrainOutcome, TuneError> {
        self.calls.push(Call::Train);
        if self.fail_train {
            return Err(TuneError::Bridge(tunekit_bridge::BridgeError::Remote {
                method: "trainer.train".into(),
                code: -32000,
                message: "CUDA out of memory".into(),
                traceback: Some("Traceback (most recent call last):\n  ...".into()),
            }));
        }
        Ok(TrainOutcome {
            global_step: 100,
            training_loss: Some(1.25),
            metrics: Default::default(),
        })
    }

    async fn save_trainer_model(
        &mut self,
        _trainer: &TrainerHandle,
        dir: &Path,
    ) -> Result<(), TuneError> {
        self.calls.push(Call::SaveTrainerModel(dir.to_path_buf()));
        Ok(())
    }

    async fn save_tokenizer(
        &mut self,
        _tokenizer: &TokenizerHandle,
        dir: &Path,
    ) -> Result<(), TuneError> {
        self.calls.push(Call::SaveTokenizer(dir.to_path_buf()));
        Ok(())
    }

    async fn load_adapter(
        &mut self,
        _model: &ModelHandle,
        adapter_dir: &Path,
    ) -> Result<ModelHandle, TuneError> {
        self.calls.push(Call::LoadAdapter(adapter_dir.to_path_buf()));
        Ok(ModelHandle {
            handle: self.handle(),
        })
    }

    async fn merge_and_unload(&mut self, _model: &ModelHandle) -> Result<ModelHandle, TuneError> {
        self.calls.push(Call::MergeAndUnload);
        Ok(ModelHandle {
            handle: self.handle(),
        })
    }

    async fn save_model(
        &mut self,
        _model: &ModelHandle,
        dir: &Path,
        format: SaveFormat,
    ) -> Result<(), TuneError> {
        self.calls.push(Call::SaveModel {
            dir: dir.to_path_buf(),
            format,
        });
        Ok(())
    }
}

/// Write `records` JSON objects (one per line) to `path`.
pub fn write_jsonl(path: &Path, records: usize) {
    let mut content = String::new();
    for i in 0..records {
        content.push_str(&format!(
            "{{\"messages\":[{{\"role\":\"user\",\"content\":\"q{i}\"}},{{\"role\":\"assistant\",\"content\":\"a{i}\"}}]}}\n"
        ));
    }
    std::fs::write(path, content).unwrap();
}
