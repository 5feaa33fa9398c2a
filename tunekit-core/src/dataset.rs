//! Chat-format JSON-lines datasets.
//!
//! tunekit only checks that a file exists and that every non-blank line is a
//! JSON value. Record structure is left to the dataset library, which loads
//! the file for real afterwards.

use crate::error::TuneError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Result of a syntactic pass over a `.jsonl` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub path: PathBuf,
    /// Non-blank lines, each a parsed JSON value.
    pub records: usize,
    pub blank_lines: usize,
}

/// Stream through `path` and fail on the first line that is not JSON.
pub fn scan_jsonl(path: &Path) -> Result<DatasetSummary, TuneError> {
    let file = File::open(path)
        .map_err(|e| TuneError::dataset(format!("cannot open {}: {e}", path.display())))?;

    let mut records = 0;
    let mut blank_lines = 0;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            TuneError::dataset(format!("{}:{}: {e}", path.display(), index + 1))
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            blank_lines += 1;
            continue;
        }
        serde_json::from_str::<serde::de::IgnoredAny>(trimmed).map_err(|e| {
            TuneError::dataset(format!(
                "invalid JSONL at {}:{} ({e})",
                path.display(),
                index + 1
            ))
        })?;
        records += 1;
    }

    Ok(DatasetSummary {
        path: path.to_path_buf(),
        records,
        blank_lines,
    })
}
