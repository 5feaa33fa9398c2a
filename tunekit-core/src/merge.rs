//! Fold a trained LoRA adapter into its base model.

use crate::backend::Backend;
use crate::error::TuneError;
use crate::lora::AdapterManifest;
use crate::model::{ModelLoadOptions, SaveFormat};
use crate::record::CompletionRecord;
use std::path::PathBuf;
use tracing::{info, warn};

/// Inputs of one merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub base_model: String,
    pub adapter_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Load the base model unquantized, apply the adapter, merge and save
/// a standalone checkpoint plus tokenizer into `request.output_dir`.
pub async fn run_merge<B>(
    backend: &mut B,
    request: &MergeRequest,
) -> Result<CompletionRecord, TuneError>
where
    B: Backend + ?Sized,
{
    std::fs::create_dir_all(&request.output_dir)?;

    let manifest = AdapterManifest::read(&request.adapter_dir)?;
    if manifest.base_model_differs(&request.base_model) {
        warn!(
            recorded = manifest.base_model_name_or_path.as_deref().unwrap_or_default(),
            requested = %request.base_model,
            "Adapter was trained against a different base model"
        );
    }
    info!(
        adapter_dir = %request.adapter_dir.display(),
        r = manifest.r,
        target_modules = manifest.target_module_count(),
        "Adapter config read"
    );

    let tokenizer = backend.load_tokenizer(&request.base_model).await?;
    let base = backend
        .load_model(&request.base_model, &ModelLoadOptions::for_merge())
        .await?;
    info!(base_model = %request.base_model, "Base model loaded");

    let wrapped = backend.load_adapter(&base, &request.adapter_dir).await?;
    let merged = backend.merge_and_unload(&wrapped).await?;
    info!("Adapter merged into base weights");

    backend
        .save_model(&merged, &request.output_dir, SaveFormat::SafeTensors)
        .await?;
    backend
        .save_tokenizer(&tokenizer, &request.output_dir)
        .await?;
    info!(output_dir = %request.output_dir.display(), "Merged model saved");

    Ok(CompletionRecord::MergeComplete {
        base_model: request.base_model.clone(),
        adapter_dir: request.adapter_dir.clone(),
        output_dir: request.output_dir.clone(),
    })
}
