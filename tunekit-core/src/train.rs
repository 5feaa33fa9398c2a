//! Supervised LoRA fine-tuning driver.

use crate::backend::{Backend, TrainerSpec};
use crate::config::TrainerApiConfig;
use crate::dataset::scan_jsonl;
use crate::error::TuneError;
use crate::lora::LoraConfig;
use crate::model::ModelLoadOptions;
use crate::precision::MixedPrecision;
use crate::record::CompletionRecord;
use crate::sft::{Hyperparameters, LibraryVersions, SftConfig, TrainerApi};
use crate::tokenizer::PadTokenPlan;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Inputs of one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainRequest {
    pub base_model: String,
    pub train_file: PathBuf,
    pub val_file: PathBuf,
    pub output_dir: PathBuf,
    pub hyperparameters: Hyperparameters,
    pub use_4bit: bool,
    pub lora: LoraConfig,
}

/// Fine-tune `request.base_model` and write adapter + tokenizer to the output dir.
///
/// Steps run strictly in order and the first failure aborts the run; nothing
/// written before the failure is cleaned up.
pub async fn run_training<B>(
    backend: &mut B,
    request: &TrainRequest,
    pins: &TrainerApiConfig,
) -> Result<CompletionRecord, TuneError>
where
    B: Backend + ?Sized,
{
    let started = Instant::now();
    std::fs::create_dir_all(&request.output_dir)?;

    let train_summary = scan_jsonl(&request.train_file)?;
    let val_summary = scan_jsonl(&request.val_file)?;
    let train_ds = backend.load_dataset(&request.train_file).await?;
    let val_ds = backend.load_dataset(&request.val_file).await?;
    for (summary, loaded) in [(&train_summary, &train_ds), (&val_summary, &val_ds)] {
        if summary.blank_lines > 0 {
            debug!(
                path = %summary.path.display(),
                blank_lines = summary.blank_lines,
                "Blank lines skipped in JSONL"
            );
        }
        if summary.records != loaded.num_rows {
            warn!(
                path = %summary.path.display(),
                lines = summary.records,
                rows = loaded.num_rows,
                "Dataset library row count differs from JSONL record count"
            );
        }
    }
    info!(
        train_examples = train_ds.num_rows,
        val_examples = val_ds.num_rows,
        "Datasets loaded"
    );

    let mut tokenizer = backend.load_tokenizer(&request.base_model).await?;
    match tokenizer.pad_token_plan() {
        PadTokenPlan::Keep => {}
        PadTokenPlan::AliasToEos(eos) => {
            info!(token = %eos, "Tokenizer has no pad token, aliasing to EOS");
            backend.set_pad_token(&mut tokenizer, &eos).await?;
        }
        PadTokenPlan::Unavailable => {
            warn!("Tokenizer defines neither a pad nor an EOS token");
        }
    }

    let reported = backend.library_versions().await?;
    let versions = LibraryVersions::from_reported(&reported)?;
    let api = TrainerApi::resolve(&versions)?.with_overrides(pins);
    info!(
        transformers = %versions.transformers,
        trl = %versions.trl,
        sequence_field = ?api.sequence_field,
        eval_strategy_field = ?api.eval_strategy_field,
        tokenizer_keyword = ?api.tokenizer_keyword,
        "Trainer API resolved"
    );

    let capability = backend.device_capability().await?;
    let precision = MixedPrecision::select(capability);
    info!(
        capability = ?capability,
        precision = precision.label(),
        "Mixed precision selected"
    );

    let load_options = ModelLoadOptions::for_training(request.use_4bit);
    let model = backend
        .load_model(&request.base_model, &load_options)
        .await?;
    info!(
        base_model = %request.base_model,
        quantized = load_options.is_quantized(),
        "Base model loaded"
    );

    let args = SftConfig::build(
        request.output_dir.clone(),
        &request.hyperparameters,
        api,
        precision,
    );
    let trainer = backend
        .create_trainer(TrainerSpec {
            model: &model,
            tokenizer: &tokenizer,
            train_dataset: &train_ds,
            eval_dataset: &val_ds,
            args: &args,
            peft: &request.lora,
            tokenizer_keyword: api.tokenizer_keyword,
        })
        .await?;

    info!(
        epochs = request.hyperparameters.epochs,
        lora_r = request.lora.r,
        lora_alpha = request.lora.lora_alpha,
        lora_scaling = request.lora.scaling(),
        "Training started"
    );
    let outcome = backend.train(&trainer).await?;
    info!(
        global_step = outcome.global_step,
        training_loss = ?outcome.training_loss,
        elapsed_secs = started.elapsed().as_secs(),
        "Training finished"
    );

    backend
        .save_trainer_model(&trainer, &request.output_dir)
        .await?;
    backend
        .save_tokenizer(&tokenizer, &request.output_dir)
        .await?;
    info!(output_dir = %request.output_dir.display(), "Adapter and tokenizer saved");

    Ok(CompletionRecord::TrainingComplete {
        base_model: request.base_model.clone(),
        output_dir: request.output_dir.clone(),
        train_examples: train_ds.num_rows,
        val_examples: val_ds.num_rows,
        use_4bit: request.use_4bit,
    })
}
