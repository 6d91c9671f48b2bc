//! Shared domain records for the subtitle-qa workspace.
//!
//! Every stage of the analysis reads and writes these plain value types.
//! Keep this crate free of provider shapes and I/O so the normalizers, the
//! analysis stages and the CLI can all depend on it without pulling anything
//! heavy along.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Axis-aligned box in normalized `[0,1]` frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl BoundingBox {
    pub const FULL_FRAME: BoundingBox = BoundingBox {
        top: 0.0,
        left: 0.0,
        bottom: 1.0,
        right: 1.0,
    };

    /// Builds a box, reordering swapped edges so `right >= left` and
    /// `bottom >= top` always hold.
    pub fn new(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self {
            top: top.min(bottom),
            left: left.min(right),
            bottom: top.max(bottom),
            right: left.max(right),
        }
    }

    /// Smallest box enclosing every `(x, y)` vertex, or `None` for no vertices.
    pub fn from_vertices<I>(vertices: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = vertices.into_iter();
        let (x0, y0) = iter.next()?;
        let mut bbox = Self {
            top: y0,
            left: x0,
            bottom: y0,
            right: x0,
        };
        for (x, y) in iter {
            bbox.left = bbox.left.min(x);
            bbox.right = bbox.right.max(x);
            bbox.top = bbox.top.min(y);
            bbox.bottom = bbox.bottom.max(y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        (self.right - self.left).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.bottom - self.top).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn vertical_center(&self) -> f64 {
        (self.top + self.bottom) * 0.5
    }

    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let top = self.top.max(other.top);
        let left = self.left.max(other.left);
        let bottom = self.bottom.min(other.bottom);
        let right = self.right.min(other.right);
        if right <= left || bottom <= top {
            return None;
        }
        Some(BoundingBox {
            top,
            left,
            bottom,
            right,
        })
    }

    /// Intersection-over-union. Degenerate boxes yield `0.0`.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let area_a = self.area();
        let area_b = other.area();
        if area_a <= 0.0 || area_b <= 0.0 {
            return 0.0;
        }
        let Some(inter) = self.intersection(other) else {
            return 0.0;
        };
        let inter_area = inter.area();
        let union = area_a + area_b - inter_area;
        if union <= 0.0 {
            return 0.0;
        }
        (inter_area / union).clamp(0.0, 1.0)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::FULL_FRAME
    }
}

/// Stable join key assigned once detections are merged and classified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionId(String);

impl DetectionId {
    pub fn from_index(index: usize) -> Self {
        Self(format!("det_{index:04}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DetectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionReason {
    #[serde(rename = "subtitle_score_higher")]
    SubtitleScoreHigher,
    #[serde(rename = "fixed_score_higher")]
    FixedScoreHigher,
    #[serde(rename = "score_tie_unknown")]
    ScoreTie,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::SubtitleScoreHigher => "subtitle_score_higher",
            DecisionReason::FixedScoreHigher => "fixed_score_higher",
            DecisionReason::ScoreTie => "score_tie_unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticTag {
    ProperName,
    BrandName,
}

/// A candidate on-screen text event.
///
/// Created by the normalizer with only the provider fields filled in; the
/// derived fields are annotated in place by the merge, classification and
/// tagging stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub bbox: BoundingBox,
    #[serde(default)]
    pub is_partial_sequence: bool,
    #[serde(default)]
    pub partial_members: Vec<String>,
    #[serde(default)]
    pub is_subtitle: bool,
    #[serde(default)]
    pub is_fixed_text: bool,
    #[serde(default)]
    pub repeat_count: u32,
    #[serde(default)]
    pub score_subtitle: i32,
    #[serde(default)]
    pub score_fixed: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_reason: Option<DecisionReason>,
    #[serde(default)]
    pub semantic_tags: Vec<SemanticTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_id: Option<DetectionId>,
}

impl Detection {
    pub fn new(
        text: impl Into<String>,
        start_time: f64,
        end_time: f64,
        confidence: Option<f32>,
        bbox: BoundingBox,
    ) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time: end_time.max(start_time),
            confidence,
            bbox,
            is_partial_sequence: false,
            partial_members: Vec::new(),
            is_subtitle: false,
            is_fixed_text: false,
            repeat_count: 0,
            score_subtitle: 0,
            score_fixed: 0,
            decision_reason: None,
            semantic_tags: Vec::new(),
            detection_id: None,
        }
    }

    pub fn has_tag(&self, tag: SemanticTag) -> bool {
        self.semantic_tags.contains(&tag)
    }

    /// Coarse category used by the audit table.
    pub fn structural_classification(&self) -> &'static str {
        if self.is_partial_sequence {
            "sequential"
        } else if self.is_fixed_text {
            "fixed"
        } else if self.is_subtitle {
            "subtitle"
        } else {
            "unknown"
        }
    }
}

/// A unit of spoken-word text with timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl TranscriptionSegment {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
            speaker: None,
            confidence: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellingCandidate {
    pub original_text: String,
    pub suggested_text: String,
    pub context: String,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_id: Option<DetectionId>,
    pub rule_id: String,
    /// `false` when original and suggestion only differ by case or punctuation.
    pub has_replacement: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    MissingSubtitleWindow,
    TranscriptNotContainedInSubtitles,
    SubtitleMisaligned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    pub subtitle_text: String,
    pub transcription_text: String,
    pub start_time: f64,
    pub end_time: f64,
    pub severity: Severity,
    pub mismatch_type: MismatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Synced,
    LikelySynced,
    Misaligned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncDetail {
    pub subtitle_index: usize,
    pub status: SyncStatus,
    /// Word overlap ratio at zero offset.
    pub ratio: f64,
    /// Estimated drift in seconds; `0.0` unless shifting clearly helped.
    pub offset: f64,
    pub best_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_similarity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub total_subtitles: usize,
    pub synced: usize,
    pub likely_synced: usize,
    pub misaligned: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_drift: Option<f64>,
}

/// Subtitles whose time ranges intersect each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapGroup {
    pub subtitle_indices: Vec<usize>,
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub summary: SyncSummary,
    pub details: Vec<SyncDetail>,
    pub duplicates: Vec<OverlapGroup>,
}

impl SyncReport {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleFilterReason {
    ExcludedPartialSequence,
    ExcludedNotSubtitle,
    ExcludedLowConfidence,
    ExcludedMatchesFixedText,
    IncludedInFinalSubtitles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellingStatus {
    NotChecked,
    NoError,
    ErrorDetected,
    ErrorFilteredOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellingMatchSummary {
    pub original_text: String,
    pub suggested_text: String,
    pub rule_id: String,
    pub has_replacement: bool,
}

impl From<&SpellingCandidate> for SpellingMatchSummary {
    fn from(value: &SpellingCandidate) -> Self {
        Self {
            original_text: value.original_text.clone(),
            suggested_text: value.suggested_text.clone(),
            rule_id: value.rule_id.clone(),
            has_replacement: value.has_replacement,
        }
    }
}

/// Per-detection debugging row used to tune classifier thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    pub order: usize,
    pub detection_id: Option<DetectionId>,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    pub bbox_top: f64,
    pub bbox_left: f64,
    pub confidence: Option<f32>,
    pub repeat_count: u32,
    pub score_subtitle: i32,
    pub score_fixed: i32,
    pub decision_reason: Option<DecisionReason>,
    pub structural_classification: String,
    pub semantic_tags: Vec<SemanticTag>,
    pub included_in_final_subtitles: bool,
    pub checked_in_spelling: bool,
    pub subtitle_filter_reason: SubtitleFilterReason,
    pub spelling_status: SpellingStatus,
    pub spelling_raw_match_count: usize,
    pub spelling_kept_match_count: usize,
    pub spelling_raw_matches: Vec<SpellingMatchSummary>,
    pub spelling_kept_matches: Vec<SpellingMatchSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub raw: usize,
    pub merged: usize,
    pub subtitle: usize,
    pub fixed: usize,
    pub partial: usize,
    pub filtered_subtitles: usize,
    pub brand_name: usize,
    pub proper_name: usize,
    pub spelling_checked: usize,
    pub spelling_raw_matches: usize,
    pub spelling_kept_matches: usize,
    pub spelling_with_error: usize,
    pub spelling_filtered_out: usize,
    pub spelling_no_error: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(top: f64, left: f64, bottom: f64, right: f64) -> BoundingBox {
        BoundingBox::new(top, left, bottom, right)
    }

    #[test]
    fn iou_is_symmetric_and_bounded() {
        let boxes = [
            bbox(0.0, 0.0, 1.0, 1.0),
            bbox(0.1, 0.2, 0.3, 0.9),
            bbox(0.8, 0.1, 0.95, 0.9),
            bbox(0.5, 0.5, 0.5, 0.9),
            bbox(0.25, 0.3, 0.35, 0.7),
        ];
        for a in &boxes {
            for b in &boxes {
                let ab = a.iou(b);
                let ba = b.iou(a);
                assert!((ab - ba).abs() < 1e-12);
                assert!((0.0..=1.0).contains(&ab));
            }
        }
    }

    #[test]
    fn iou_of_identical_positive_box_is_one() {
        let a = bbox(0.8, 0.1, 0.9, 0.9);
        assert!((a.iou(&a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn iou_of_degenerate_box_is_zero() {
        let line = bbox(0.5, 0.1, 0.5, 0.9);
        assert_eq!(line.iou(&line), 0.0);
        assert_eq!(line.iou(&BoundingBox::FULL_FRAME), 0.0);
    }

    #[test]
    fn new_orders_swapped_edges() {
        let b = bbox(0.9, 0.7, 0.1, 0.2);
        assert_eq!(b, bbox(0.1, 0.2, 0.9, 0.7));
        assert!(b.right >= b.left && b.bottom >= b.top);
    }

    #[test]
    fn from_vertices_takes_extremes() {
        let b = BoundingBox::from_vertices([(0.2, 0.8), (0.6, 0.82), (0.61, 0.9), (0.19, 0.88)])
            .unwrap();
        assert_eq!(b, bbox(0.8, 0.19, 0.9, 0.61));
        assert!(BoundingBox::from_vertices(Vec::new()).is_none());
    }

    #[test]
    fn detection_id_is_zero_padded() {
        assert_eq!(DetectionId::from_index(7).as_str(), "det_0007");
        assert_eq!(DetectionId::from_index(12345).to_string(), "det_12345");
    }

    #[test]
    fn sync_status_serializes_screaming_case() {
        let json = serde_json::to_string(&SyncStatus::LikelySynced).unwrap();
        assert_eq!(json, "\"LIKELY_SYNCED\"");
        let reason = serde_json::to_string(&DecisionReason::ScoreTie).unwrap();
        assert_eq!(reason, "\"score_tie_unknown\"");
    }
}
