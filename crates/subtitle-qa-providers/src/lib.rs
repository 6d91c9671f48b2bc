mod detection;
mod engine;
mod error;
mod lenient;
mod response;
mod time;
mod transcription;

pub use detection::{DetectionBatch, NormalizeStats, normalize_detections, parse_detection_payload};
pub use engine::{NoopSpellChecker, RecordedSpellChecker, SpellChecker};
pub use error::ProviderError;
pub use response::{
    SPELLCHECK_RULE_ID, SpellCorrection, SpellcheckContext, SpellcheckResponse,
    candidates_from_response, normalize_spell_token, prepare_spellcheck_text,
};
pub use time::TimeValue;
pub use transcription::{
    TranscriptionBatch, TranscriptionStats, normalize_transcription, parse_transcription_payload,
};
