//! Tokenizer state mirrored from the worker.

use crate::backend::Handle;
use serde::{Deserialize, Serialize};

/// A tokenizer living in the worker, with the special tokens tunekit cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerHandle {
    pub handle: Handle,
    pub pad_token: Option<String>,
    pub eos_token: Option<String>,
}

/// What to do about a tokenizer's padding token before training.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PadTokenPlan {
    /// A pad token is already defined.
    Keep,
    /// Alias padding to this (end-of-sequence) token.
    AliasToEos(String),
    /// Neither pad nor EOS is defined; nothing to alias to.
    Unavailable,
}

impl TokenizerHandle {
    /// Causal-LM tokenizers often ship without a pad token; reuse EOS then.
    pub fn pad_token_plan(&self) -> PadTokenPlan {
        if self.pad_token.is_some() {
            return PadTokenPlan::Keep;
        }
        match &self.eos_token {
            Some(eos) => PadTokenPlan::AliasToEos(eos.clone()),
            None => PadTokenPlan::Unavailable,
        }
    }
}
