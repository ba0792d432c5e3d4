use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::Difficulty;

/// The mode-specific constraint the next word has to satisfy, shipped to
/// the oracle alongside the candidate word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RuleContext {
    Theme { theme: String },
    Longest,
    Chain { last_word: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WordVerdict {
    pub is_valid: bool,
    pub reason: Option<String>,
}

impl WordVerdict {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ValidationRequest {
    pub word: String,
    pub used_words: Vec<String>,
    pub language: String,
    pub context: RuleContext,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SuggestionRequest {
    pub used_words: Vec<String>,
    pub language: String,
    pub difficulty: Difficulty,
    pub context: RuleContext,
}
