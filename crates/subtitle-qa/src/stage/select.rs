use std::collections::HashSet;

use subtitle_qa_types::{Detection, DetectionId, SubtitleFilterReason};

use crate::config::SelectionConfig;

fn fixed_key(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Sorts by `(start, end, lowercase text)` and numbers the detections
/// `det_0000`, `det_0001`, ...
pub fn assign_detection_ids(detections: &mut [Detection]) {
    detections.sort_by(|a, b| {
        a.start_time
            .total_cmp(&b.start_time)
            .then(a.end_time.total_cmp(&b.end_time))
            .then_with(|| a.text.to_lowercase().cmp(&b.text.to_lowercase()))
    });
    for (index, detection) in detections.iter_mut().enumerate() {
        detection.detection_id = Some(DetectionId::from_index(index));
    }
}

/// Picks the subtitles that feed spelling and synchronization.
pub struct SubtitleSelector {
    min_confidence: f32,
    fixed_texts: HashSet<String>,
}

impl SubtitleSelector {
    pub fn new(config: &SelectionConfig, detections: &[Detection]) -> Self {
        let fixed_texts = detections
            .iter()
            .filter(|detection| detection.is_fixed_text)
            .map(|detection| fixed_key(&detection.text))
            .collect();
        Self {
            // confidences are stored as f32, compare at that precision
            min_confidence: config.min_subtitle_confidence as f32,
            fixed_texts,
        }
    }

    pub fn reason(&self, detection: &Detection) -> SubtitleFilterReason {
        let confidence = detection.confidence.unwrap_or(0.0);
        if detection.is_partial_sequence {
            SubtitleFilterReason::ExcludedPartialSequence
        } else if !detection.is_subtitle {
            SubtitleFilterReason::ExcludedNotSubtitle
        } else if confidence < self.min_confidence {
            SubtitleFilterReason::ExcludedLowConfidence
        } else if self.fixed_texts.contains(&fixed_key(&detection.text)) {
            SubtitleFilterReason::ExcludedMatchesFixedText
        } else {
            SubtitleFilterReason::IncludedInFinalSubtitles
        }
    }

    pub fn is_selected(&self, detection: &Detection) -> bool {
        self.reason(detection) == SubtitleFilterReason::IncludedInFinalSubtitles
    }

    /// Selected subtitles in input order.
    pub fn select(&self, detections: &[Detection]) -> Vec<Detection> {
        detections
            .iter()
            .filter(|detection| self.is_selected(detection))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subtitle_qa_types::BoundingBox;

    fn det(text: &str, start: f64, confidence: Option<f32>) -> Detection {
        let mut detection = Detection::new(text, start, start + 1.0, confidence, BoundingBox::FULL_FRAME);
        detection.is_subtitle = true;
        detection
    }

    #[test]
    fn ids_follow_time_then_text_order() {
        let mut batch = vec![
            det("zeta", 2.0, Some(1.0)),
            det("Beta", 1.0, Some(1.0)),
            det("alpha", 1.0, Some(1.0)),
        ];
        assign_detection_ids(&mut batch);
        let order: Vec<(&str, &str)> = batch
            .iter()
            .map(|d| (d.text.as_str(), d.detection_id.as_ref().map(DetectionId::as_str).unwrap_or("")))
            .collect();
        assert_eq!(
            order,
            vec![("alpha", "det_0000"), ("Beta", "det_0001"), ("zeta", "det_0002")]
        );
    }

    #[test]
    fn filter_reasons_are_checked_in_order() {
        let mut partial = det("Hor", 0.0, Some(1.0));
        partial.is_partial_sequence = true;
        let mut not_subtitle = det("title", 0.0, Some(1.0));
        not_subtitle.is_subtitle = false;
        let low = det("blurry", 0.0, Some(0.5));
        let missing = det("no score", 0.0, None);
        let mut fixed = det("Acme", 0.0, Some(1.0));
        fixed.is_subtitle = false;
        fixed.is_fixed_text = true;
        let shadowed = det("  ACME ", 5.0, Some(0.95));
        let kept = det("hello there", 1.0, Some(0.9));

        let batch = vec![partial, not_subtitle, low, missing, fixed, shadowed, kept];
        let selector = SubtitleSelector::new(&SelectionConfig::default(), &batch);
        let reasons: Vec<SubtitleFilterReason> = batch.iter().map(|d| selector.reason(d)).collect();
        assert_eq!(
            reasons,
            vec![
                SubtitleFilterReason::ExcludedPartialSequence,
                SubtitleFilterReason::ExcludedNotSubtitle,
                SubtitleFilterReason::ExcludedLowConfidence,
                SubtitleFilterReason::ExcludedLowConfidence,
                SubtitleFilterReason::ExcludedNotSubtitle,
                SubtitleFilterReason::ExcludedMatchesFixedText,
                SubtitleFilterReason::IncludedInFinalSubtitles,
            ]
        );
        let selected = selector.select(&batch);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].text, "hello there");
    }
}
