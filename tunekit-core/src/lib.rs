//! # tunekit-core: LoRA/QLoRA fine-tuning and adapter merging
//!
//! Two drivers sit on top of a [`Backend`]:
//! - [`run_training`] fine-tunes a causal LM with a LoRA adapter (optionally
//!   over a 4-bit quantized base) and saves adapter + tokenizer.
//! - [`run_merge`] folds a trained adapter back into an unquantized base and
//!   saves a standalone checkpoint.
//!
//! Trainer API differences across library releases are resolved up front from
//! installed versions (see [`sft::TrainerApi`]) instead of probing signatures.

// Foundation
pub mod config;
pub mod error;

// Backend seam
pub mod backend;

// Building blocks
pub mod dataset;
pub mod lora;
pub mod model;
pub mod precision;
pub mod sft;
pub mod tokenizer;

// Drivers
pub mod merge;
pub mod record;
pub mod train;

// Re-exports
pub use backend::{Backend, PythonBackend};
pub use config::{TunekitConfig, load_config};
pub use error::TuneError;
pub use lora::LoraConfig;
pub use merge::{MergeRequest, run_merge};
pub use record::CompletionRecord;
pub use sft::Hyperparameters;
pub use train::{TrainRequest, run_training};
