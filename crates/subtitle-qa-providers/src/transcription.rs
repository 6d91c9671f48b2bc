use serde::Deserialize;
use serde_json::Value;
use subtitle_qa_types::TranscriptionSegment;
use tracing::warn;

use crate::error::ProviderError;
use crate::lenient;
use crate::time::TimeValue;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptionStats {
    pub rows: usize,
    pub missing_text: usize,
    pub unparseable_times: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TranscriptionBatch {
    pub segments: Vec<TranscriptionSegment>,
    pub stats: TranscriptionStats,
}

#[derive(Debug, Default, Deserialize)]
struct RawTranscriptionRow {
    #[serde(default, deserialize_with = "lenient::string")]
    text: Option<String>,
    #[serde(default)]
    start_time: Option<TimeValue>,
    #[serde(default)]
    end_time: Option<TimeValue>,
    #[serde(default, deserialize_with = "lenient::string")]
    speaker: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    confidence: Option<f64>,
}

pub fn parse_transcription_payload(bytes: &[u8]) -> Result<Value, ProviderError> {
    serde_json::from_slice(bytes).map_err(|err| ProviderError::decode("transcription", err))
}

/// Sanitizes transcription rows and returns them sorted by `(start, end)`.
///
/// Accepts a bare array or an object carrying a `segments` array. Rows
/// without text or without any readable timestamp are dropped.
pub fn normalize_transcription(payload: &Value) -> TranscriptionBatch {
    let rows = match payload {
        Value::Array(rows) => rows.as_slice(),
        Value::Object(map) => match map.get("segments") {
            Some(Value::Array(rows)) => rows.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    let mut batch = TranscriptionBatch::default();
    for row in rows {
        batch.stats.rows += 1;
        let Ok(raw) = serde_json::from_value::<RawTranscriptionRow>(row.clone()) else {
            batch.stats.missing_text += 1;
            continue;
        };
        let Some(text) = raw
            .text
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
        else {
            batch.stats.missing_text += 1;
            continue;
        };

        let start = raw.start_time.as_ref().and_then(TimeValue::seconds);
        let end = raw.end_time.as_ref().and_then(TimeValue::seconds);
        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            (Some(only), None) | (None, Some(only)) => (only, only),
            (None, None) => {
                batch.stats.unparseable_times += 1;
                continue;
            }
        };
        let (start, end) = (start.max(0.0), end.max(0.0));
        let (start, end) = if end < start { (end, start) } else { (start, end) };

        let mut segment = TranscriptionSegment::new(text, start, end);
        segment.speaker = raw.speaker;
        segment.confidence = raw.confidence.map(|value| value as f32);
        batch.segments.push(segment);
    }

    batch.segments.sort_by(|a, b| {
        a.start_time
            .total_cmp(&b.start_time)
            .then(a.end_time.total_cmp(&b.end_time))
    });

    if batch.stats.unparseable_times > 0 {
        warn!(
            skipped = batch.stats.unparseable_times,
            "dropped transcription rows without a readable timestamp"
        );
    }
    batch
}
