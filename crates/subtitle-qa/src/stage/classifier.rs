use std::collections::HashMap;

use subtitle_qa_types::{BoundingBox, DecisionReason, Detection};
use tracing::debug;

use crate::config::ClassifierConfig;
use crate::text::repetition_key;

/// Scores and decision for one detection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub score_subtitle: i32,
    pub score_fixed: i32,
    pub repeat_count: u32,
}

impl Classification {
    pub fn decision(&self) -> DecisionReason {
        if self.score_subtitle > self.score_fixed {
            DecisionReason::SubtitleScoreHigher
        } else if self.score_fixed > self.score_subtitle {
            DecisionReason::FixedScoreHigher
        } else {
            DecisionReason::ScoreTie
        }
    }
}

/// Immutable view of the batch used for repetition lookups.
struct RepetitionIndex {
    buckets: HashMap<String, Vec<(usize, BoundingBox)>>,
    keys: Vec<String>,
}

impl RepetitionIndex {
    fn build(detections: &[Detection]) -> Self {
        let mut buckets: HashMap<String, Vec<(usize, BoundingBox)>> = HashMap::new();
        let mut keys = Vec::with_capacity(detections.len());
        for (index, detection) in detections.iter().enumerate() {
            let key = repetition_key(&detection.text);
            buckets
                .entry(key.clone())
                .or_default()
                .push((index, detection.bbox));
            keys.push(key);
        }
        Self { buckets, keys }
    }

    /// Other detections with the same text at nearly the same position.
    fn repeats(&self, index: usize, bbox: &BoundingBox, min_iou: f64) -> u32 {
        let Some(bucket) = self.buckets.get(&self.keys[index]) else {
            return 0;
        };
        let count = bucket
            .iter()
            .filter(|(other, other_bbox)| *other != index && other_bbox.iou(bbox) >= min_iou)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

/// Decides subtitle vs. fixed text from position, duration, length and
/// repetition evidence over a whole batch.
pub struct TextClassifier<'a> {
    config: &'a ClassifierConfig,
    video_duration: f64,
}

impl<'a> TextClassifier<'a> {
    /// A non-positive `video_duration` disables the long-duration signal.
    pub fn new(config: &'a ClassifierConfig, video_duration: f64) -> Self {
        Self {
            config,
            video_duration,
        }
    }

    /// Scores every detection without modifying the batch.
    pub fn score_all(&self, detections: &[Detection]) -> Vec<Classification> {
        let index = RepetitionIndex::build(detections);
        detections
            .iter()
            .enumerate()
            .map(|(position, detection)| self.score(&index, position, detection))
            .collect()
    }

    /// Scores the batch and writes the results onto each detection.
    pub fn classify(&self, detections: &mut [Detection]) {
        let scores = self.score_all(detections);
        for (detection, scored) in detections.iter_mut().zip(scores) {
            let decision = scored.decision();
            detection.score_subtitle = scored.score_subtitle;
            detection.score_fixed = scored.score_fixed;
            detection.repeat_count = scored.repeat_count;
            detection.is_subtitle = decision == DecisionReason::SubtitleScoreHigher;
            detection.is_fixed_text = decision == DecisionReason::FixedScoreHigher;
            detection.decision_reason = Some(decision);
            debug!(
                text = %truncate(&detection.text, 80),
                repeat_count = scored.repeat_count,
                score_subtitle = scored.score_subtitle,
                score_fixed = scored.score_fixed,
                decision = decision.as_str(),
                "classified detection"
            );
        }
    }

    fn score(&self, index: &RepetitionIndex, position: usize, detection: &Detection) -> Classification {
        let config = self.config;
        let weights = &config.weights;
        let mut score_subtitle = 0;
        let mut score_fixed = 0;

        let center = detection.bbox.vertical_center();
        if center > config.subtitle_min_center {
            score_subtitle += weights.subtitle_position;
        } else if center < config.fixed_max_center {
            score_fixed += weights.fixed_position;
        }

        let duration = detection.end_time - detection.start_time;
        if (config.subtitle_min_duration..=config.subtitle_max_duration).contains(&duration) {
            score_subtitle += weights.subtitle_duration;
        } else if self.video_duration > 0.0
            && duration > self.video_duration * config.fixed_min_video_fraction
        {
            score_fixed += weights.fixed_duration;
        }

        let words = detection.text.split_whitespace().count();
        let starts_upper = detection
            .text
            .chars()
            .next()
            .is_some_and(char::is_uppercase);
        if words >= config.subtitle_min_words {
            score_subtitle += weights.subtitle_words;
        } else if words <= config.fixed_max_words && starts_upper {
            score_fixed += weights.fixed_words;
        }

        let repeat_count = index.repeats(position, &detection.bbox, config.repeat_iou);
        if repeat_count >= config.repeat_min_count {
            score_fixed += weights.fixed_repetition;
        }

        Classification {
            score_subtitle,
            score_fixed,
            repeat_count,
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTTOM: BoundingBox = BoundingBox {
        top: 0.8,
        left: 0.1,
        bottom: 0.9,
        right: 0.9,
    };
    const TOP: BoundingBox = BoundingBox {
        top: 0.02,
        left: 0.8,
        bottom: 0.08,
        right: 0.95,
    };
    const MIDDLE: BoundingBox = BoundingBox {
        top: 0.4,
        left: 0.2,
        bottom: 0.5,
        right: 0.8,
    };

    fn det(text: &str, start: f64, end: f64, bbox: BoundingBox) -> Detection {
        Detection::new(text, start, end, Some(0.95), bbox)
    }

    fn classify(detections: &mut [Detection], video_duration: f64) {
        let config = ClassifierConfig::default();
        TextClassifier::new(&config, video_duration).classify(detections);
    }

    #[test]
    fn bottom_sentence_is_subtitle() {
        let mut batch = vec![det("so reality check", 1.0, 3.0, BOTTOM)];
        classify(&mut batch, 60.0);
        let d = &batch[0];
        assert_eq!(d.score_subtitle, 6);
        assert_eq!(d.score_fixed, 0);
        assert!(d.is_subtitle && !d.is_fixed_text);
        assert_eq!(d.decision_reason, Some(DecisionReason::SubtitleScoreHigher));
    }

    #[test]
    fn persistent_top_logo_is_fixed() {
        let mut batch = vec![det("LOGO", 0.0, 50.0, TOP)];
        classify(&mut batch, 60.0);
        let d = &batch[0];
        assert_eq!(d.score_fixed, 3 + 4 + 1);
        assert!(d.is_fixed_text);
    }

    #[test]
    fn unknown_video_length_disables_duration_evidence() {
        let mut batch = vec![det("news", 0.0, 50.0, MIDDLE)];
        classify(&mut batch, 0.0);
        let d = &batch[0];
        assert_eq!((d.score_subtitle, d.score_fixed), (0, 0));
        assert!(!d.is_subtitle && !d.is_fixed_text);
        assert_eq!(d.decision_reason, Some(DecisionReason::ScoreTie));
    }

    #[test]
    fn duration_window_is_inclusive() {
        let mut batch = vec![
            det("a b c", 0.0, 0.5, MIDDLE),
            det("a b c", 10.0, 18.0, MIDDLE),
            det("a b c", 20.0, 20.4, MIDDLE),
        ];
        classify(&mut batch, 0.0);
        let scores: Vec<i32> = batch.iter().map(|d| d.score_subtitle).collect();
        assert_eq!(scores, vec![3, 3, 1]);
    }

    #[test]
    fn repeated_text_at_same_position_is_fixed() {
        let mut batch: Vec<Detection> = (0..4)
            .map(|i| det("Channel  Nine", i as f64 * 10.0, i as f64 * 10.0 + 2.0, BOTTOM))
            .collect();
        batch[3].text = "channel nine".to_string();
        classify(&mut batch, 0.0);
        for d in &batch {
            assert_eq!(d.repeat_count, 3);
        }
        // bottom +3, duration +2 vs repetition +4 (+1 for capitalized short text)
        assert_eq!(batch[0].score_fixed, 5);
        assert_eq!(batch[3].score_fixed, 4);
        assert_eq!(batch[0].score_subtitle, 5);
        assert_eq!(batch[0].decision_reason, Some(DecisionReason::ScoreTie));
        assert!(!batch[3].is_fixed_text && batch[3].is_subtitle);
    }

    #[test]
    fn repeats_elsewhere_on_screen_do_not_count() {
        let mut batch = vec![
            det("Sale", 0.0, 1.0, TOP),
            det("Sale", 2.0, 3.0, BOTTOM),
            det("Sale", 4.0, 5.0, MIDDLE),
            det("Sale", 6.0, 7.0, TOP),
        ];
        classify(&mut batch, 0.0);
        assert_eq!(batch[0].repeat_count, 1);
        assert_eq!(batch[1].repeat_count, 0);
    }

    #[test]
    fn scoring_is_deterministic_and_order_independent() {
        let batch = vec![
            det("Horizonte", 0.0, 4.0, TOP),
            det("Horizonte", 10.0, 14.0, TOP),
            det("so reality check", 1.0, 2.0, BOTTOM),
            det("Horizonte", 20.0, 24.0, TOP),
            det("Horizonte", 30.0, 34.0, TOP),
            det("i remember back", 2.0, 3.0, BOTTOM),
        ];
        let config = ClassifierConfig::default();
        let classifier = TextClassifier::new(&config, 40.0);
        let first = classifier.score_all(&batch);
        let second = classifier.score_all(&batch);
        assert_eq!(first, second);

        let mut reversed = batch.clone();
        reversed.reverse();
        let mut scores_reversed = classifier.score_all(&reversed);
        scores_reversed.reverse();
        assert_eq!(first, scores_reversed);
    }
}
