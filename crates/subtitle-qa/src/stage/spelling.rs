use std::collections::HashSet;

use subtitle_qa_providers::{
    SpellChecker, SpellcheckContext, candidates_from_response, normalize_spell_token,
    prepare_spellcheck_text,
};
use subtitle_qa_types::{Detection, DetectionId, SpellingCandidate};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct SpellingRun {
    pub raw: Vec<SpellingCandidate>,
    pub checked: HashSet<DetectionId>,
    pub failures: usize,
}

/// Sends each subtitle's prepared text to the checker and collects the raw
/// candidates. A failing request is logged and counts as no corrections.
pub fn collect_candidates(subtitles: &[Detection], checker: &dyn SpellChecker) -> SpellingRun {
    let mut run = SpellingRun::default();
    for subtitle in subtitles {
        if let Some(id) = subtitle.detection_id.as_ref() {
            run.checked.insert(id.clone());
        }
        let request = prepare_spellcheck_text(&subtitle.text);
        if request.is_empty() {
            continue;
        }
        let response = match checker.check(&request) {
            Ok(response) => response,
            Err(err) => {
                warn!(checker = checker.name(), error = %err, "spell check request failed");
                run.failures += 1;
                continue;
            }
        };
        run.raw.extend(candidates_from_response(
            &response,
            SpellcheckContext {
                text: &subtitle.text,
                timestamp: subtitle.start_time,
                detection_id: subtitle.detection_id.as_ref(),
            },
        ));
    }
    debug!(
        checked = run.checked.len(),
        candidates = run.raw.len(),
        "collected spelling candidates"
    );
    run
}

/// Drops non-actionable candidates: case or punctuation only diffs, and
/// words matching on-screen fixed text (brand protection).
pub fn filter_false_positives(
    candidates: &[SpellingCandidate],
    detections: &[Detection],
) -> Vec<SpellingCandidate> {
    let fixed_texts: HashSet<String> = detections
        .iter()
        .filter(|detection| detection.is_fixed_text)
        .map(|detection| detection.text.to_lowercase())
        .collect();

    candidates
        .iter()
        .filter(|candidate| {
            if !candidate.has_replacement {
                return false;
            }
            if fixed_texts.contains(&candidate.original_text.to_lowercase()) {
                return false;
            }
            let original = normalize_spell_token(&candidate.original_text);
            let suggested = normalize_spell_token(&candidate.suggested_text);
            !(!candidate.original_text.is_empty()
                && !candidate.suggested_text.is_empty()
                && original == suggested)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use subtitle_qa_providers::{
        NoopSpellChecker, ProviderError, RecordedSpellChecker, SpellcheckResponse,
    };
    use subtitle_qa_types::BoundingBox;

    fn candidate(original: &str, suggested: &str, has_replacement: bool) -> SpellingCandidate {
        SpellingCandidate {
            original_text: original.to_string(),
            suggested_text: suggested.to_string(),
            context: String::new(),
            timestamp: 0.0,
            detection_id: None,
            rule_id: "API_NINJAS_SPELLCHECK".to_string(),
            has_replacement,
        }
    }

    fn subtitle(text: &str, id: usize) -> Detection {
        let mut detection = Detection::new(text, id as f64, id as f64 + 1.0, Some(0.95), BoundingBox::FULL_FRAME);
        detection.is_subtitle = true;
        detection.detection_id = Some(DetectionId::from_index(id));
        detection
    }

    struct FailingChecker;

    impl SpellChecker for FailingChecker {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn check(&self, _: &str) -> Result<SpellcheckResponse, ProviderError> {
            Err(ProviderError::backend("failing", "quota exceeded"))
        }
    }

    #[test]
    fn drops_non_actionable_and_brand_candidates() {
        let mut brand = Detection::new("Acme", 0.0, 10.0, Some(1.0), BoundingBox::FULL_FRAME);
        brand.is_fixed_text = true;
        let detections = vec![brand];

        let candidates = vec![
            candidate("teh", "the", true),
            candidate("Paris", "paris", false),
            candidate("ACME", "acne", true),
            candidate("colour", "Colour!", true),
            candidate("recieve", "receive", true),
        ];
        let kept = filter_false_positives(&candidates, &detections);
        let originals: Vec<&str> = kept.iter().map(|c| c.original_text.as_str()).collect();
        assert_eq!(originals, vec!["teh", "recieve"]);
    }

    #[test]
    fn collects_candidates_with_detection_context() {
        let mut checker = RecordedSpellChecker::default();
        checker.insert(
            "I've seen teh light",
            serde_json::from_value(serde_json::json!({
                "corrections": [{"word": "teh", "correction": "the"}]
            }))
            .expect("response"),
        );
        let subtitles = vec![subtitle("I\u{2019}ve seen teh light!", 3), subtitle("all good", 4)];
        let run = collect_candidates(&subtitles, &checker);

        assert_eq!(run.checked.len(), 2);
        assert_eq!(run.raw.len(), 1);
        let found = &run.raw[0];
        assert_eq!(found.suggested_text, "the");
        assert_eq!(found.context, "I\u{2019}ve seen teh light!");
        assert_eq!(found.timestamp, 3.0);
        assert_eq!(found.detection_id, Some(DetectionId::from_index(3)));
    }

    #[test]
    fn failing_checker_counts_as_no_corrections() {
        let subtitles = vec![subtitle("teh cat", 0)];
        let run = collect_candidates(&subtitles, &FailingChecker);
        assert!(run.raw.is_empty());
        assert_eq!(run.failures, 1);
        assert_eq!(run.checked.len(), 1);
    }

    #[test]
    fn noop_checker_finds_nothing() {
        let run = collect_candidates(&[subtitle("anything", 0)], &NoopSpellChecker);
        assert!(run.raw.is_empty());
    }
}
