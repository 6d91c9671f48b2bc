use std::collections::HashMap;

use crate::error::ProviderError;
use crate::response::SpellcheckResponse;

/// Common interface for spell-check providers.
pub trait SpellChecker: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, text: &str) -> Result<SpellcheckResponse, ProviderError>;
}

/// Checker that never reports corrections, used when no provider is wired.
#[derive(Debug, Default)]
pub struct NoopSpellChecker;

impl SpellChecker for NoopSpellChecker {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn check(&self, _: &str) -> Result<SpellcheckResponse, ProviderError> {
        Ok(SpellcheckResponse::empty())
    }
}

/// Replays provider responses captured ahead of time, keyed by the exact
/// request text.
#[derive(Debug, Default, Clone)]
pub struct RecordedSpellChecker {
    responses: HashMap<String, SpellcheckResponse>,
}

impl RecordedSpellChecker {
    pub fn new(responses: HashMap<String, SpellcheckResponse>) -> Self {
        Self { responses }
    }

    /// Decodes a JSON object mapping request text to provider response.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProviderError> {
        let responses = serde_json::from_slice(bytes)
            .map_err(|err| ProviderError::decode("spell-check recording", err))?;
        Ok(Self::new(responses))
    }

    pub fn insert(&mut self, text: impl Into<String>, response: SpellcheckResponse) {
        self.responses.insert(text.into(), response);
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl SpellChecker for RecordedSpellChecker {
    fn name(&self) -> &'static str {
        "recorded"
    }

    fn check(&self, text: &str) -> Result<SpellcheckResponse, ProviderError> {
        Ok(self.responses.get(text).cloned().unwrap_or_default())
    }
}
