use std::collections::HashMap;

use subtitle_qa_types::{
    AuditRow, Detection, DetectionId, RunCounts, SemanticTag, SpellingCandidate,
    SpellingMatchSummary, SpellingStatus, SubtitleFilterReason,
};

use super::select::SubtitleSelector;
use super::spelling::SpellingRun;

fn group_by_detection(candidates: &[SpellingCandidate]) -> HashMap<&DetectionId, Vec<SpellingMatchSummary>> {
    let mut grouped: HashMap<&DetectionId, Vec<SpellingMatchSummary>> = HashMap::new();
    for candidate in candidates {
        if let Some(id) = candidate.detection_id.as_ref() {
            grouped.entry(id).or_default().push(candidate.into());
        }
    }
    grouped
}

/// One row per detection, in the order given (id order in the pipeline).
pub fn build_audit_rows(
    detections: &[Detection],
    selector: &SubtitleSelector,
    spelling: &SpellingRun,
    kept: &[SpellingCandidate],
) -> Vec<AuditRow> {
    let raw_by_id = group_by_detection(&spelling.raw);
    let kept_by_id = group_by_detection(kept);

    detections
        .iter()
        .enumerate()
        .map(|(index, detection)| {
            let id = detection.detection_id.as_ref();
            let raw_matches = id
                .and_then(|id| raw_by_id.get(id))
                .cloned()
                .unwrap_or_default();
            let kept_matches = id
                .and_then(|id| kept_by_id.get(id))
                .cloned()
                .unwrap_or_default();
            let checked = id.is_some_and(|id| spelling.checked.contains(id));
            let reason = selector.reason(detection);

            let spelling_status = if !checked {
                SpellingStatus::NotChecked
            } else if raw_matches.is_empty() {
                SpellingStatus::NoError
            } else if !kept_matches.is_empty() {
                SpellingStatus::ErrorDetected
            } else {
                SpellingStatus::ErrorFilteredOut
            };

            AuditRow {
                order: index + 1,
                detection_id: detection.detection_id.clone(),
                text: detection.text.clone(),
                start_time: detection.start_time,
                end_time: detection.end_time,
                bbox_top: detection.bbox.top,
                bbox_left: detection.bbox.left,
                confidence: detection.confidence,
                repeat_count: detection.repeat_count,
                score_subtitle: detection.score_subtitle,
                score_fixed: detection.score_fixed,
                decision_reason: detection.decision_reason,
                structural_classification: detection.structural_classification().to_string(),
                semantic_tags: detection.semantic_tags.clone(),
                included_in_final_subtitles: reason == SubtitleFilterReason::IncludedInFinalSubtitles,
                checked_in_spelling: checked,
                subtitle_filter_reason: reason,
                spelling_status,
                spelling_raw_match_count: raw_matches.len(),
                spelling_kept_match_count: kept_matches.len(),
                spelling_raw_matches: raw_matches,
                spelling_kept_matches: kept_matches,
            }
        })
        .collect()
}

/// Tallies for one run. `raw` is the detection count before merging.
pub fn run_counts(
    raw: usize,
    detections: &[Detection],
    rows: &[AuditRow],
    spelling: &SpellingRun,
    kept: &[SpellingCandidate],
) -> RunCounts {
    let mut counts = RunCounts {
        raw,
        merged: detections.len(),
        spelling_checked: spelling.checked.len(),
        spelling_raw_matches: spelling.raw.len(),
        spelling_kept_matches: kept.len(),
        ..RunCounts::default()
    };
    for detection in detections {
        if detection.is_subtitle {
            counts.subtitle = counts.subtitle.saturating_add(1);
        }
        if detection.is_fixed_text {
            counts.fixed = counts.fixed.saturating_add(1);
        }
        if detection.is_partial_sequence {
            counts.partial = counts.partial.saturating_add(1);
        }
        if detection.has_tag(SemanticTag::BrandName) {
            counts.brand_name = counts.brand_name.saturating_add(1);
        }
        if detection.has_tag(SemanticTag::ProperName) {
            counts.proper_name = counts.proper_name.saturating_add(1);
        }
    }
    for row in rows {
        if row.included_in_final_subtitles {
            counts.filtered_subtitles = counts.filtered_subtitles.saturating_add(1);
        }
        match row.spelling_status {
            SpellingStatus::ErrorDetected => {
                counts.spelling_with_error = counts.spelling_with_error.saturating_add(1)
            }
            SpellingStatus::ErrorFilteredOut => {
                counts.spelling_filtered_out = counts.spelling_filtered_out.saturating_add(1)
            }
            SpellingStatus::NoError => {
                counts.spelling_no_error = counts.spelling_no_error.saturating_add(1)
            }
            SpellingStatus::NotChecked => {}
        }
    }
    counts
}
