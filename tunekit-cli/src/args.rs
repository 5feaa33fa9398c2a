//! Command-line arguments for both drivers.

use clap::{ArgAction, Args, Parser};
use std::path::PathBuf;
use tunekit_core::{Hyperparameters, LoraConfig, MergeRequest, TrainRequest};

/// Flags shared by `tunekit-train` and `tunekit-merge`.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct CommonArgs {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Python interpreter hosting the worker
    #[arg(long)]
    pub python: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write JSON logs (daily rolling) into this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

/// Fine-tune a causal language model with a LoRA adapter.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "tunekit-train", version, about, long_about = None)]
pub struct TrainArgs {
    /// Hugging Face model id or local path of the base model
    #[arg(long)]
    pub base_model: String,

    /// Training split, one chat record per line
    #[arg(long)]
    pub train_file: PathBuf,

    /// Validation split, one chat record per line
    #[arg(long)]
    pub val_file: PathBuf,

    /// Where the adapter and tokenizer are written
    #[arg(long)]
    pub output_dir: PathBuf,

    #[arg(long, default_value_t = 8)]
    pub epochs: u32,

    #[arg(long, default_value_t = 2e-4)]
    pub learning_rate: f64,

    /// Per-device batch size (train and eval)
    #[arg(long, default_value_t = 2)]
    pub batch_size: u32,

    /// Gradient accumulation steps
    #[arg(long, default_value_t = 8)]
    pub grad_accum: u32,

    /// Maximum tokens per example
    #[arg(long, default_value_t = 1024)]
    pub max_seq_length: usize,

    #[arg(long, default_value_t = 25)]
    pub eval_steps: u32,

    #[arg(long, default_value_t = 25)]
    pub save_steps: u32,

    #[arg(long, default_value_t = 10)]
    pub logging_steps: u32,

    /// Load the base model 4-bit quantized (QLoRA)
    #[arg(long)]
    pub use_4bit: bool,

    /// LoRA rank
    #[arg(long, default_value_t = 16)]
    pub lora_r: u32,

    #[arg(long, default_value_t = 32)]
    pub lora_alpha: u32,

    #[arg(long, default_value_t = 0.05)]
    pub lora_dropout: f64,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl TrainArgs {
    pub fn to_request(&self) -> TrainRequest {
        TrainRequest {
            base_model: self.base_model.clone(),
            train_file: self.train_file.clone(),
            val_file: self.val_file.clone(),
            output_dir: self.output_dir.clone(),
            hyperparameters: Hyperparameters {
                epochs: self.epochs,
                learning_rate: self.learning_rate,
                batch_size: self.batch_size,
                grad_accum: self.grad_accum,
                max_seq_length: self.max_seq_length,
                eval_steps: self.eval_steps,
                save_steps: self.save_steps,
                logging_steps: self.logging_steps,
            },
            use_4bit: self.use_4bit,
            lora: LoraConfig::causal_lm(self.lora_r, self.lora_alpha, self.lora_dropout),
        }
    }
}

/// Merge a trained LoRA adapter into its base model.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "tunekit-merge", version, about, long_about = None)]
pub struct MergeArgs {
    /// Hugging Face model id or local path of the base model
    #[arg(long)]
    pub base_model: String,

    /// Directory holding adapter_config.json and the adapter weights
    #[arg(long)]
    pub adapter_dir: PathBuf,

    /// Where the merged checkpoint and tokenizer are written
    #[arg(long)]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl MergeArgs {
    pub fn to_request(&self) -> MergeRequest {
        MergeRequest {
            base_model: self.base_model.clone(),
            adapter_dir: self.adapter_dir.clone(),
            output_dir: self.output_dir.clone(),
        }
    }
}
