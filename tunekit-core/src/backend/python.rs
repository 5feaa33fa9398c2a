//! [`Backend`] implementation over the Python worker.

use super::{
    Backend, DatasetHandle, Handle, ModelHandle, TrainOutcome, TrainerHandle, TrainerSpec,
};
use crate::config::PythonConfig;
use crate::error::TuneError;
use crate::lora::LoraConfig;
use crate::model::{ModelLoadOptions, SaveFormat};
use crate::precision::{ComputeCapability, DeviceReport};
use crate::sft::{ReportedVersions, SftConfig, TokenizerKeyword};
use crate::tokenizer::TokenizerHandle;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::path::Path;
use tunekit_bridge::{PythonRuntime, REQUIRED_PACKAGES, Worker};

/// Extra package needed for 4-bit loading.
pub const QUANTIZATION_PACKAGE: &str = "bitsandbytes";

/// Backend that forwards every operation to a worker process.
pub struct PythonBackend {
    worker: Worker,
}

#[derive(Serialize)]
struct TrainerCreateParams<'a> {
    model: Handle,
    tokenizer: Handle,
    train_dataset: Handle,
    eval_dataset: Handle,
    args: &'a SftConfig,
    peft: &'a LoraConfig,
    tokenizer_keyword: TokenizerKeyword,
}

#[derive(Serialize)]
struct ModelLoadParams<'a> {
    model: &'a str,
    #[serde(flatten)]
    options: &'a ModelLoadOptions,
}

impl PythonBackend {
    /// Check packages (unless disabled) and start the worker.
    pub async fn launch(config: &PythonConfig, extra_packages: &[&str]) -> Result<Self, TuneError> {
        let runtime = PythonRuntime::with_config(config.python_path.clone(), config.venv_path.clone());
        if config.check_packages {
            let packages: Vec<&str> = REQUIRED_PACKAGES
                .iter()
                .chain(extra_packages)
                .copied()
                .collect();
            runtime.ensure_packages(&packages).await?;
        }
        let worker = Worker::start(&runtime).await?;
        Ok(Self { worker })
    }

    /// Stop the worker process.
    pub async fn shutdown(self) -> Result<(), TuneError> {
        self.worker.shutdown().await?;
        Ok(())
    }

    async fn call_unit(&mut self, method: &str, params: Value) -> Result<(), TuneError> {
        self.worker.call_value(method, params).await?;
        Ok(())
    }
}

/// Paths cross the bridge as JSON strings.
fn utf8(path: &Path) -> Result<&str, TuneError> {
    path.to_str()
        .ok_or_else(|| TuneError::config(format!("path is not valid UTF-8: {}", path.display())))
}

#[async_trait]
impl Backend for PythonBackend {
    async fn library_versions(&mut self) -> Result<ReportedVersions, TuneError> {
        Ok(self.worker.call("runtime.versions", Value::Null).await?)
    }

    async fn device_capability(&mut self) -> Result<Option<ComputeCapability>, TuneError> {
        let report: DeviceReport = self.worker.call("runtime.device", Value::Null).await?;
        if let Some(name) = &report.name {
            tracing::info!(device = %name, "CUDA device detected");
        }
        Ok(report.capability())
    }

    async fn load_dataset(&mut self, path: &Path) -> Result<DatasetHandle, TuneError> {
        Ok(self
            .worker
            .call("dataset.load_json", json!({ "path": utf8(path)? }))
            .await?)
    }

    async fn load_tokenizer(&mut self, model: &str) -> Result<TokenizerHandle, TuneError> {
        Ok(self
            .worker
            .call("tokenizer.load", json!({ "model": model, "use_fast": true }))
            .await?)
    }

    async fn set_pad_token(
        &mut self,
        tokenizer: &mut TokenizerHandle,
        token: &str,
    ) -> Result<(), TuneError> {
        *tokenizer = self
            .worker
            .call(
                "tokenizer.set_pad_token",
                json!({ "handle": tokenizer.handle, "token": token }),
            )
            .await?;
        Ok(())
    }

    async fn load_model(
        &mut self,
        model: &str,
        options: &ModelLoadOptions,
    ) -> Result<ModelHandle, TuneError> {
        Ok(self
            .worker
            .call("model.load", ModelLoadParams { model, options })
            .await?)
    }

    async fn create_trainer(&mut self, spec: TrainerSpec<'_>) -> Result<TrainerHandle, TuneError> {
        let params = TrainerCreateParams {
            model: spec.model.handle,
            tokenizer: spec.tokenizer.handle,
            train_dataset: spec.train_dataset.handle,
            eval_dataset: spec.eval_dataset.handle,
            args: spec.args,
            peft: spec.peft,
            tokenizer_keyword: spec.tokenizer_keyword,
        };
        Ok(self.worker.call("trainer.create", params).await?)
    }

    async fn train(&mut self, trainer: &TrainerHandle) -> Result<TrainOutcome, TuneError> {
        Ok(self
            .worker
            .call("trainer.train", json!({ "handle": trainer.handle }))
            .await?)
    }

    async fn save_trainer_model(
        &mut self,
        trainer: &TrainerHandle,
        dir: &Path,
    ) -> Result<(), TuneError> {
        self.call_unit(
            "trainer.save_model",
            json!({ "handle": trainer.handle, "dir": utf8(dir)? }),
        )
        .await
    }

    async fn save_tokenizer(
        &mut self,
        tokenizer: &TokenizerHandle,
        dir: &Path,
    ) -> Result<(), TuneError> {
        self.call_unit(
            "tokenizer.save",
            json!({ "handle": tokenizer.handle, "dir": utf8(dir)? }),
        )
        .await
    }

    async fn load_adapter(
        &mut self,
        model: &ModelHandle,
        adapter_dir: &Path,
    ) -> Result<ModelHandle, TuneError> {
        Ok(self
            .worker
            .call(
                "adapter.load",
                json!({ "handle": model.handle, "adapter_dir": utf8(adapter_dir)? }),
            )
            .await?)
    }

    async fn merge_and_unload(&mut self, model: &ModelHandle) -> Result<ModelHandle, TuneError> {
        Ok(self
            .worker
            .call("adapter.merge_and_unload", json!({ "handle": model.handle }))
            .await?)
    }

    async fn save_model(
        &mut self,
        model: &ModelHandle,
        dir: &Path,
        format: SaveFormat,
    ) -> Result<(), TuneError> {
        self.call_unit(
            "model.save",
            json!({
                "handle": model.handle,
                "dir": utf8(dir)?,
                "safe_serialization": format.safe_serialization(),
            }),
        )
        .await
    }
}
