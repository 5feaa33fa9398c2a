//! Supervised fine-tuning configuration and trainer API variants.
//!
//! trl and transformers renamed several configuration fields across
//! releases. Instead of probing signatures at runtime, each rename is an
//! explicit variant, resolved once from the installed library versions and
//! serialized under exactly one field name.

use crate::config::TrainerApiConfig;
use crate::error::TuneError;
use crate::precision::MixedPrecision;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Checkpoints kept on disk by the trainer.
pub const SAVE_TOTAL_LIMIT: u32 = 2;

/// Oldest trl that ships `SFTConfig`.
pub const MIN_TRL: Version = Version::new(0, 9, 0);
/// First trl without `max_seq_length`.
const TRL_MAX_LENGTH: Version = Version::new(0, 20, 0);
/// First trl whose `SFTTrainer` takes `processing_class`.
const TRL_PROCESSING_CLASS: Version = Version::new(0, 12, 0);
/// First transformers with `eval_strategy`.
const TRANSFORMERS_EVAL_STRATEGY: Version = Version::new(4, 41, 0);

// ---------------------------------------------------------------------------
// Library versions
// ---------------------------------------------------------------------------

/// Raw version strings reported by the worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportedVersions {
    pub python: Option<String>,
    pub torch: Option<String>,
    pub transformers: Option<String>,
    pub trl: Option<String>,
    pub peft: Option<String>,
    pub datasets: Option<String>,
    pub bitsandbytes: Option<String>,
}

/// The versions that decide the trainer API shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryVersions {
    pub transformers: Version,
    pub trl: Version,
}

impl LibraryVersions {
    pub fn new(transformers: Version, trl: Version) -> Self {
        Self { transformers, trl }
    }

    /// Parse the worker report. transformers and trl must be installed.
    pub fn from_reported(reported: &ReportedVersions) -> Result<Self, TuneError> {
        let require = |library: &'static str, value: &Option<String>| {
            let value = value.as_deref().ok_or_else(|| TuneError::Version {
                library,
                value: "not installed".into(),
            })?;
            parse_lenient(library, value)
        };
        Ok(Self {
            transformers: require("transformers", &reported.transformers)?,
            trl: require("trl", &reported.trl)?,
        })
    }
}

/// Parse a Python package version into semver, ignoring PEP 440 suffixes.
///
/// `4.46.0.dev0` -> 4.46.0, `2.5.1+cu121` -> 2.5.1, `0.12` -> 0.12.0.
pub fn parse_lenient(library: &'static str, value: &str) -> Result<Version, TuneError> {
    let invalid = || TuneError::Version {
        library,
        value: value.to_string(),
    };

    let mut parts = [0u64; 3];
    let mut seen = 0;
    for (slot, piece) in parts.iter_mut().zip(value.trim().split('.')) {
        let digits: String = piece.chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() {
            break;
        }
        *slot = digits.parse().map_err(|_| invalid())?;
        seen += 1;
        if digits.len() != piece.len() {
            break;
        }
    }
    if seen == 0 {
        return Err(invalid());
    }
    Ok(Version::new(parts[0], parts[1], parts[2]))
}

// ---------------------------------------------------------------------------
// Field variants
// ---------------------------------------------------------------------------

/// Which name the sequence-length limit goes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceField {
    MaxSeqLength,
    MaxLength,
}

/// Which name the evaluation strategy goes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalStrategyField {
    EvalStrategy,
    EvaluationStrategy,
}

/// Keyword `SFTTrainer` takes the tokenizer under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKeyword {
    ProcessingClass,
    Tokenizer,
}

/// The resolved shape of the installed trainer API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainerApi {
    pub sequence_field: SequenceField,
    pub eval_strategy_field: EvalStrategyField,
    pub tokenizer_keyword: TokenizerKeyword,
}

impl TrainerApi {
    /// Pick field names for the given library versions.
    pub fn resolve(versions: &LibraryVersions) -> Result<Self, TuneError> {
        if versions.trl < MIN_TRL {
            return Err(TuneError::UnsupportedLibrary {
                library: "trl",
                found: versions.trl.clone(),
                minimum: MIN_TRL,
            });
        }

        let sequence_field = if versions.trl < TRL_MAX_LENGTH {
            SequenceField::MaxSeqLength
        } else {
            SequenceField::MaxLength
        };
        let eval_strategy_field = if versions.transformers >= TRANSFORMERS_EVAL_STRATEGY {
            EvalStrategyField::EvalStrategy
        } else {
            EvalStrategyField::EvaluationStrategy
        };
        let tokenizer_keyword = if versions.trl >= TRL_PROCESSING_CLASS {
            TokenizerKeyword::ProcessingClass
        } else {
            TokenizerKeyword::Tokenizer
        };

        Ok(Self {
            sequence_field,
            eval_strategy_field,
            tokenizer_keyword,
        })
    }

    /// Replace resolved choices with explicitly configured ones.
    pub fn with_overrides(self, pins: &TrainerApiConfig) -> Self {
        Self {
            sequence_field: pins.sequence_field.unwrap_or(self.sequence_field),
            eval_strategy_field: pins.eval_strategy_field.unwrap_or(self.eval_strategy_field),
            tokenizer_keyword: pins.tokenizer_keyword.unwrap_or(self.tokenizer_keyword),
        }
    }
}

/// Sequence-length limit, serialized under the variant's field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SequenceLimit {
    #[serde(rename = "max_seq_length")]
    MaxSeqLength(usize),
    #[serde(rename = "max_length")]
    MaxLength(usize),
}

impl SequenceLimit {
    pub fn new(field: SequenceField, tokens: usize) -> Self {
        match field {
            SequenceField::MaxSeqLength => Self::MaxSeqLength(tokens),
            SequenceField::MaxLength => Self::MaxLength(tokens),
        }
    }
}

/// When evaluation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalStrategy {
    Steps,
}

/// Evaluation strategy, serialized under the variant's field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EvalStrategy {
    #[serde(rename = "eval_strategy")]
    EvalStrategy(IntervalStrategy),
    #[serde(rename = "evaluation_strategy")]
    EvaluationStrategy(IntervalStrategy),
}

impl EvalStrategy {
    pub fn new(field: EvalStrategyField, strategy: IntervalStrategy) -> Self {
        match field {
            EvalStrategyField::EvalStrategy => Self::EvalStrategy(strategy),
            EvalStrategyField::EvaluationStrategy => Self::EvaluationStrategy(strategy),
        }
    }
}

// ---------------------------------------------------------------------------
// SFT configuration
// ---------------------------------------------------------------------------

/// Hyperparameters that feed the SFT configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub epochs: u32,
    pub learning_rate: f64,
    pub batch_size: u32,
    pub grad_accum: u32,
    pub max_seq_length: usize,
    pub eval_steps: u32,
    pub save_steps: u32,
    pub logging_steps: u32,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            epochs: 8,
            learning_rate: 2e-4,
            batch_size: 2,
            grad_accum: 8,
            max_seq_length: 1024,
            eval_steps: 25,
            save_steps: 25,
            logging_steps: 10,
        }
    }
}

/// Keyword arguments for trl's `SFTConfig`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SftConfig {
    pub output_dir: PathBuf,
    pub num_train_epochs: u32,
    pub learning_rate: f64,
    pub per_device_train_batch_size: u32,
    pub per_device_eval_batch_size: u32,
    pub gradient_accumulation_steps: u32,
    pub eval_steps: u32,
    pub save_steps: u32,
    pub save_total_limit: u32,
    pub logging_steps: u32,
    pub bf16: bool,
    pub fp16: bool,
    pub packing: bool,
    pub report_to: String,
    #[serde(flatten)]
    pub sequence_limit: SequenceLimit,
    #[serde(flatten)]
    pub eval_strategy: EvalStrategy,
}

impl SftConfig {
    pub fn build(
        output_dir: PathBuf,
        hp: &Hyperparameters,
        api: TrainerApi,
        precision: MixedPrecision,
    ) -> Self {
        Self {
            output_dir,
            num_train_epochs: hp.epochs,
            learning_rate: hp.learning_rate,
            per_device_train_batch_size: hp.batch_size,
            per_device_eval_batch_size: hp.batch_size,
            gradient_accumulation_steps: hp.grad_accum,
            eval_steps: hp.eval_steps,
            save_steps: hp.save_steps,
            save_total_limit: SAVE_TOTAL_LIMIT,
            logging_steps: hp.logging_steps,
            bf16: precision.bf16,
            fp16: precision.fp16,
            packing: false,
            report_to: "none".into(),
            sequence_limit: SequenceLimit::new(api.sequence_field, hp.max_seq_length),
            eval_strategy: EvalStrategy::new(api.eval_strategy_field, IntervalStrategy::Steps),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_lenient_versions() {
        assert_eq!(parse_lenient("transformers", "4.46.0.dev0").unwrap(), v("4.46.0"));
        assert_eq!(parse_lenient("torch", "2.5.1+cu121").unwrap(), v("2.5.1"));
        assert_eq!(parse_lenient("trl", "0.12").unwrap(), v("0.12.0"));
        assert_eq!(parse_lenient("trl", "0.13.0rc1").unwrap(), v("0.13.0"));
        assert_eq!(parse_lenient("peft", " 0.14.0 ").unwrap(), v("0.14.0"));
        assert!(parse_lenient("trl", "unknown").is_err());
        assert!(parse_lenient("trl", "").is_err());
    }

    #[test]
    fn test_versions_require_trl_and_transformers() {
        let reported = ReportedVersions {
            transformers: Some("4.45.2".into()),
            trl: None,
            ..Default::default()
        };
        let err = LibraryVersions::from_reported(&reported).unwrap_err();
        assert!(matches!(err, TuneError::Version { library: "trl", .. }));
    }

    #[test]
    fn test_resolve_legacy_stack() {
        let api = TrainerApi::resolve(&LibraryVersions::new(v("4.38.2"), v("0.9.6"))).unwrap();
        assert_eq!(api.sequence_field, SequenceField::MaxSeqLength);
        assert_eq!(api.eval_strategy_field, EvalStrategyField::EvaluationStrategy);
        assert_eq!(api.tokenizer_keyword, TokenizerKeyword::Tokenizer);
    }

    #[test]
    fn test_resolve_current_stack() {
        let api = TrainerApi::resolve(&LibraryVersions::new(v("4.52.4"), v("0.21.0"))).unwrap();
        assert_eq!(api.sequence_field, SequenceField::MaxLength);
        assert_eq!(api.eval_strategy_field, EvalStrategyField::EvalStrategy);
        assert_eq!(api.tokenizer_keyword, TokenizerKeyword::ProcessingClass);
    }

    #[test]
    fn test_resolve_boundaries() {
        let api = TrainerApi::resolve(&LibraryVersions::new(v("4.41.0"), v("0.12.0"))).unwrap();
        assert_eq!(api.sequence_field, SequenceField::MaxSeqLength);
        assert_eq!(api.eval_strategy_field, EvalStrategyField::EvalStrategy);
        assert_eq!(api.tokenizer_keyword, TokenizerKeyword::ProcessingClass);

        let api = TrainerApi::resolve(&LibraryVersions::new(v("4.40.2"), v("0.20.0"))).unwrap();
        assert_eq!(api.sequence_field, SequenceField::MaxLength);
        assert_eq!(api.eval_strategy_field, EvalStrategyField::EvaluationStrategy);
    }

    #[test]
    fn test_resolve_rejects_old_trl() {
        let err = TrainerApi::resolve(&LibraryVersions::new(v("4.40.0"), v("0.8.6"))).unwrap_err();
        assert!(matches!(err, TuneError::UnsupportedLibrary { library: "trl", .. }));
    }

    #[test]
    fn test_overrides_win() {
        let api = TrainerApi::resolve(&LibraryVersions::new(v("4.52.4"), v("0.21.0"))).unwrap();
        let pinned = api.with_overrides(&TrainerApiConfig {
            sequence_field: Some(SequenceField::MaxSeqLength),
            eval_strategy_field: None,
            tokenizer_keyword: Some(TokenizerKeyword::Tokenizer),
        });
        assert_eq!(pinned.sequence_field, SequenceField::MaxSeqLength);
        assert_eq!(pinned.eval_strategy_field, EvalStrategyField::EvalStrategy);
        assert_eq!(pinned.tokenizer_keyword, TokenizerKeyword::Tokenizer);
    }

    #[test]
    fn test_sft_config_serializes_resolved_fields() {
        let api = TrainerApi {
            sequence_field: SequenceField::MaxLength,
            eval_strategy_field: EvalStrategyField::EvalStrategy,
            tokenizer_keyword: TokenizerKeyword::ProcessingClass,
        };
        let precision = MixedPrecision {
            bf16: true,
            fp16: false,
        };
        let config = SftConfig::build(
            PathBuf::from("/out/adapter"),
            &Hyperparameters::default(),
            api,
            precision,
        );

        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "output_dir": "/out/adapter",
                "num_train_epochs": 8,
                "learning_rate": 2e-4,
                "per_device_train_batch_size": 2,
                "per_device_eval_batch_size": 2,
                "gradient_accumulation_steps": 8,
                "eval_steps": 25,
                "save_steps": 25,
                "save_total_limit": 2,
                "logging_steps": 10,
                "bf16": true,
                "fp16": false,
                "packing": false,
                "report_to": "none",
                "max_length": 1024,
                "eval_strategy": "steps",
            })
        );
    }
}
