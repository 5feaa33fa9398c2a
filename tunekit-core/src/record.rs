//! The single machine-readable line each tool prints on success.

use crate::error::TuneError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

/// Completion record, tagged by `event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CompletionRecord {
    TrainingComplete {
        base_model: String,
        output_dir: PathBuf,
        train_examples: usize,
        val_examples: usize,
        use_4bit: bool,
    },
    MergeComplete {
        base_model: String,
        adapter_dir: PathBuf,
        output_dir: PathBuf,
    },
}

impl CompletionRecord {
    /// Write the record as one JSON line and flush.
    pub fn emit<W: Write>(&self, out: &mut W) -> Result<(), TuneError> {
        serde_json::to_writer(&mut *out, self)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}
