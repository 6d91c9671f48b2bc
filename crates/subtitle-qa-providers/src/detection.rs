use serde::Deserialize;
use serde_json::Value;
use subtitle_qa_types::{BoundingBox, Detection};
use tracing::warn;

use crate::error::ProviderError;
use crate::lenient;
use crate::time::TimeValue;

/// Counters describing how a raw optical payload was flattened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub annotations: usize,
    pub segments: usize,
    pub unparseable_segments: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DetectionBatch {
    pub detections: Vec<Detection>,
    pub stats: NormalizeStats,
}

#[derive(Debug, Default, Deserialize)]
struct RawOcrPayload {
    #[serde(default, deserialize_with = "lenient::vec")]
    annotation_results: Vec<RawAnnotationResult>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAnnotationResult {
    #[serde(default, deserialize_with = "lenient::vec")]
    text_annotations: Vec<RawTextAnnotation>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTextAnnotation {
    #[serde(default, deserialize_with = "lenient::string")]
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient::vec")]
    segments: Vec<RawTextSegment>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTextSegment {
    #[serde(default, deserialize_with = "lenient::object")]
    segment: RawSegmentRange,
    #[serde(default, deserialize_with = "lenient::number")]
    confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient::vec")]
    frames: Vec<RawFrame>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSegmentRange {
    #[serde(default)]
    start_time_offset: Option<TimeValue>,
    #[serde(default)]
    end_time_offset: Option<TimeValue>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFrame {
    #[serde(default, deserialize_with = "lenient::object")]
    rotated_bounding_box: RawRotatedBox,
}

#[derive(Debug, Default, Deserialize)]
struct RawRotatedBox {
    #[serde(default, deserialize_with = "lenient::vec")]
    vertices: Vec<RawVertex>,
}

#[derive(Debug, Default, Deserialize)]
struct RawVertex {
    #[serde(default, deserialize_with = "lenient::number")]
    x: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    y: Option<f64>,
}

/// Parses the bytes of a stored optical payload. Only JSON syntax errors are
/// fatal; structural problems are handled by [`normalize_detections`].
pub fn parse_detection_payload(bytes: &[u8]) -> Result<Value, ProviderError> {
    serde_json::from_slice(bytes).map_err(|err| ProviderError::decode("text detection", err))
}

/// Flattens a text-detection payload into canonical detections, one per
/// time segment. A `{"raw_response": {...}}` wrapper is unwrapped first.
pub fn normalize_detections(payload: &Value) -> DetectionBatch {
    let source = match payload.get("raw_response") {
        Some(inner @ Value::Object(_)) => inner,
        _ => payload,
    };
    let raw: RawOcrPayload = serde_json::from_value(source.clone()).unwrap_or_default();

    let mut batch = DetectionBatch::default();
    for annotation in raw.annotation_results {
        for text_annotation in annotation.text_annotations {
            let Some(text) = text_annotation.text else {
                continue;
            };
            batch.stats.annotations += 1;
            for segment in text_annotation.segments {
                batch.stats.segments += 1;
                match segment_to_detection(&text, segment) {
                    Some(detection) => batch.detections.push(detection),
                    None => batch.stats.unparseable_segments += 1,
                }
            }
        }
    }

    if batch.stats.unparseable_segments > 0 {
        warn!(
            skipped = batch.stats.unparseable_segments,
            "skipped text detection segments with unparseable timestamps"
        );
    }
    batch
}

fn segment_to_detection(text: &str, segment: RawTextSegment) -> Option<Detection> {
    // protobuf JSON omits zero offsets, so an absent bound means 0s
    let start = read_offset(segment.segment.start_time_offset.as_ref())?;
    let end = read_offset(segment.segment.end_time_offset.as_ref())?;
    let (start, end) = if end < start { (end, start) } else { (start, end) };

    let bbox = segment
        .frames
        .first()
        .and_then(|frame| {
            BoundingBox::from_vertices(
                frame
                    .rotated_bounding_box
                    .vertices
                    .iter()
                    .map(|vertex| (vertex.x.unwrap_or(0.0), vertex.y.unwrap_or(0.0))),
            )
        })
        .unwrap_or(BoundingBox::FULL_FRAME);

    let confidence = segment.confidence.unwrap_or(0.0) as f32;
    Some(Detection::new(
        text,
        start.max(0.0),
        end.max(0.0),
        Some(confidence),
        bbox,
    ))
}

fn read_offset(value: Option<&TimeValue>) -> Option<f64> {
    match value {
        None => Some(0.0),
        Some(time) => time.seconds(),
    }
}
