use serde::{Deserialize, Serialize};
use subtitle_qa_types::{DetectionId, SpellingCandidate};

use crate::lenient;

pub const SPELLCHECK_RULE_ID: &str = "API_NINJAS_SPELLCHECK";

/// One correction returned by the spell-check provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpellCorrection {
    #[serde(default, deserialize_with = "lenient::string")]
    pub word: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub correction: Option<String>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub candidates: Vec<String>,
}

impl SpellCorrection {
    /// `correction`, else the first candidate, else the word itself.
    pub fn suggestion(&self) -> Option<&str> {
        self.correction
            .as_deref()
            .or_else(|| self.candidates.first().map(String::as_str))
            .or(self.word.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpellcheckResponse {
    #[serde(default, deserialize_with = "lenient::vec")]
    pub corrections: Vec<SpellCorrection>,
}

impl SpellcheckResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }
}

/// Where the checked text came from.
#[derive(Debug, Clone, Copy)]
pub struct SpellcheckContext<'a> {
    pub text: &'a str,
    pub timestamp: f64,
    pub detection_id: Option<&'a DetectionId>,
}

/// Strips everything but word characters and whitespace, trims, case-folds.
pub fn normalize_spell_token(value: &str) -> String {
    value
        .chars()
        .filter(|ch| ch.is_alphanumeric() || *ch == '_' || ch.is_whitespace())
        .collect::<String>()
        .trim()
        .to_lowercase()
}

/// Text sent to the provider: curly apostrophes straightened, symbols
/// blanked, whitespace collapsed.
pub fn prepare_spellcheck_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|ch| match ch {
            '\u{2019}' | '\'' => '\'',
            ch if ch.is_alphanumeric() || ch == '_' || ch.is_whitespace() => ch,
            _ => ' ',
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turns a provider response into raw spelling candidates, one per
/// correction carrying a word.
pub fn candidates_from_response(
    response: &SpellcheckResponse,
    context: SpellcheckContext<'_>,
) -> Vec<SpellingCandidate> {
    response
        .corrections
        .iter()
        .filter_map(|correction| {
            let word = correction.word.as_deref()?;
            let suggested = correction.suggestion().unwrap_or(word);
            let original_norm = normalize_spell_token(word);
            let suggested_norm = normalize_spell_token(suggested);
            let has_replacement = !original_norm.is_empty()
                && !suggested_norm.is_empty()
                && original_norm != suggested_norm;
            Some(SpellingCandidate {
                original_text: word.to_string(),
                suggested_text: suggested.to_string(),
                context: context.text.to_string(),
                timestamp: context.timestamp,
                detection_id: context.detection_id.cloned(),
                rule_id: SPELLCHECK_RULE_ID.to_string(),
                has_replacement,
            })
        })
        .collect()
}
