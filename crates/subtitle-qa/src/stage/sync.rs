use subtitle_qa_types::{
    Detection, OverlapGroup, SyncDetail, SyncReport, SyncStatus, SyncSummary,
    TranscriptionSegment,
};
use tracing::debug;

use crate::config::SyncConfig;
use crate::text::{
    WordWindow, char_similarity, normalize_for_contains, tokens, word_overlap_ratio, word_windows,
};

/// Outcome of scanning shifted windows for one subtitle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetSearch {
    pub best_offset: f64,
    pub best_ratio: f64,
    pub zero_ratio: f64,
    pub material_improvement: bool,
}

/// Offsets are snapped to microseconds so accumulated float steps compare exactly.
fn snap(offset: f64) -> f64 {
    let snapped = (offset * 1_000_000.0).round() / 1_000_000.0;
    if snapped == 0.0 { 0.0 } else { snapped }
}

/// Matches subtitles against the word windows of a transcription stream.
pub struct SyncEngine<'a> {
    config: &'a SyncConfig,
    windows: Vec<WordWindow>,
}

impl<'a> SyncEngine<'a> {
    pub fn new(config: &'a SyncConfig, transcription: &[TranscriptionSegment]) -> Self {
        let windows = transcription
            .iter()
            .flat_map(|segment| word_windows(&segment.text, segment.start_time, segment.end_time))
            .collect();
        Self { config, windows }
    }

    /// Transcription tokens whose windows overlap `[start, end]`, in stream order.
    fn candidate_tokens(&self, start: f64, end: f64) -> Vec<&str> {
        self.windows
            .iter()
            .filter(|window| window.overlaps(start, end))
            .map(|window| window.token.as_str())
            .collect()
    }

    fn ratio_at(&self, reference: &[String], subtitle: &Detection, offset: f64) -> f64 {
        let candidate = self.candidate_tokens(subtitle.start_time + offset, subtitle.end_time + offset);
        word_overlap_ratio(reference, &candidate)
    }

    pub fn find_best_temporal_offset(&self, subtitle: &Detection) -> OffsetSearch {
        let reference = tokens(&subtitle.text);
        let window = self.config.offset_window;
        let step = self.config.offset_step;
        let zero_ratio = self.ratio_at(&reference, subtitle, 0.0);

        // grid stays inside [-window, window]; a non-positive step scans zero only
        let grid_points = if step > 0.0 && window >= 0.0 {
            (2.0 * window / step + 1e-9).floor() as usize + 1
        } else {
            0
        };
        // zero offset seeds the scan, the grid need not contain it
        let mut best_offset: f64 = 0.0;
        let mut best_ratio = zero_ratio;
        for i in 0..grid_points {
            let offset = snap(-window + i as f64 * step);
            let ratio = self.ratio_at(&reference, subtitle, offset);
            if ratio > best_ratio || (ratio == best_ratio && offset.abs() < best_offset.abs()) {
                best_offset = offset;
                best_ratio = ratio;
            }
        }

        OffsetSearch {
            best_offset,
            best_ratio,
            zero_ratio,
            material_improvement: best_offset != 0.0
                && best_ratio - zero_ratio > self.config.offset_improvement_margin,
        }
    }

    fn status_for(&self, ratio: f64) -> SyncStatus {
        if ratio >= self.config.synced_threshold {
            SyncStatus::Synced
        } else if ratio >= self.config.likely_synced_threshold {
            SyncStatus::LikelySynced
        } else {
            SyncStatus::Misaligned
        }
    }

    /// Classifies one subtitle at zero offset. A ratio just short of a
    /// threshold gets promoted when the character similarity reaches it.
    pub fn classify(&self, index: usize, subtitle: &Detection) -> SyncDetail {
        let reference = tokens(&subtitle.text);
        let candidate = self.candidate_tokens(subtitle.start_time, subtitle.end_time);
        let ratio = word_overlap_ratio(&reference, &candidate);
        let mut status = self.status_for(ratio);
        let mut edit_similarity = None;

        let margin = self.config.tie_break_margin;
        let thresholds = [
            (self.config.synced_threshold, SyncStatus::Synced),
            (self.config.likely_synced_threshold, SyncStatus::LikelySynced),
        ];
        for (threshold, promoted) in thresholds {
            if ratio < threshold && ratio >= threshold - margin {
                let similarity = *edit_similarity.get_or_insert_with(|| {
                    char_similarity(&normalize_for_contains(&subtitle.text), &candidate.concat())
                });
                if similarity >= threshold {
                    status = promoted;
                    break;
                }
            }
        }

        let search = self.find_best_temporal_offset(subtitle);
        let offset = if search.material_improvement {
            search.best_offset
        } else {
            0.0
        };
        debug!(
            index,
            status = ?status,
            ratio,
            best_ratio = search.best_ratio,
            offset,
            "synchronization checked"
        );
        SyncDetail {
            subtitle_index: index,
            status,
            ratio,
            offset,
            best_ratio: search.best_ratio,
            edit_similarity,
        }
    }
}

/// Connected components of strictly overlapping subtitle windows with at
/// least two members, ordered by their first index.
pub fn find_overlap_groups(subtitles: &[Detection]) -> Vec<OverlapGroup> {
    let mut parent: Vec<usize> = (0..subtitles.len()).collect();

    fn root(parent: &mut [usize], mut node: usize) -> usize {
        while parent[node] != node {
            parent[node] = parent[parent[node]];
            node = parent[node];
        }
        node
    }

    for i in 0..subtitles.len() {
        for j in (i + 1)..subtitles.len() {
            let (a, b) = (&subtitles[i], &subtitles[j]);
            if a.start_time < b.end_time && b.start_time < a.end_time {
                let (ra, rb) = (root(&mut parent, i), root(&mut parent, j));
                if ra != rb {
                    parent[ra.max(rb)] = ra.min(rb);
                }
            }
        }
    }

    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    for index in 0..subtitles.len() {
        let group_root = root(&mut parent, index);
        match groups.iter().position(|(r, _)| *r == group_root) {
            Some(at) => groups[at].1.push(index),
            None => groups.push((group_root, vec![index])),
        }
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(_, members)| OverlapGroup {
            texts: members.iter().map(|&i| subtitles[i].text.clone()).collect(),
            subtitle_indices: members,
        })
        .collect()
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Per-subtitle statuses, tallies, drift estimate and overlap groups.
/// Either stream being empty yields an empty report.
pub fn build_sync_report(
    subtitles: &[Detection],
    transcription: &[TranscriptionSegment],
    config: &SyncConfig,
) -> SyncReport {
    if subtitles.is_empty() || transcription.is_empty() {
        return SyncReport::empty();
    }

    let engine = SyncEngine::new(config, transcription);
    let details: Vec<SyncDetail> = subtitles
        .iter()
        .enumerate()
        .map(|(index, subtitle)| engine.classify(index, subtitle))
        .collect();

    let mut summary = SyncSummary {
        total_subtitles: details.len(),
        ..SyncSummary::default()
    };
    for detail in &details {
        match detail.status {
            SyncStatus::Synced => summary.synced = summary.synced.saturating_add(1),
            SyncStatus::LikelySynced => {
                summary.likely_synced = summary.likely_synced.saturating_add(1)
            }
            SyncStatus::Misaligned => summary.misaligned = summary.misaligned.saturating_add(1),
        }
    }
    let mut offsets: Vec<f64> = details
        .iter()
        .map(|detail| detail.offset)
        .filter(|offset| *offset != 0.0)
        .collect();
    summary.estimated_drift = median(&mut offsets);

    SyncReport {
        summary,
        details,
        duplicates: find_overlap_groups(subtitles),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subtitle_qa_types::BoundingBox;

    fn sub(text: &str, start: f64, end: f64) -> Detection {
        let mut detection = Detection::new(text, start, end, Some(1.0), BoundingBox::FULL_FRAME);
        detection.is_subtitle = true;
        detection
    }

    fn seg(text: &str, start: f64, end: f64) -> TranscriptionSegment {
        TranscriptionSegment::new(text, start, end)
    }

    #[test]
    fn statuses_follow_word_overlap() {
        let subtitles = vec![
            sub("so reality check", 0.0, 1.0),
            sub("i remember back", 1.0, 2.0),
            sub("nothing matches", 2.0, 3.0),
        ];
        let transcription = vec![
            seg("so reality check", 0.0, 1.0),
            seg("i remember that", 1.0, 2.0),
            seg("different words", 2.0, 3.0),
        ];
        let report = build_sync_report(&subtitles, &transcription, &SyncConfig::default());
        let statuses: Vec<SyncStatus> = report.details.iter().map(|d| d.status).collect();
        assert_eq!(
            statuses,
            vec![SyncStatus::Synced, SyncStatus::LikelySynced, SyncStatus::Misaligned]
        );
        assert_eq!(report.details[0].ratio, 1.0);
        assert!((report.details[1].ratio - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.details[2].ratio, 0.0);
        assert_eq!(report.summary.total_subtitles, 3);
        assert_eq!(
            (report.summary.synced, report.summary.likely_synced, report.summary.misaligned),
            (1, 1, 1)
        );
        assert!(report.summary.estimated_drift.is_none());
        assert!(report.duplicates.is_empty());
    }

    #[test]
    fn overlap_groups_are_connected_components() {
        let subtitles = vec![sub("a", 0.0, 1.0), sub("b", 0.5, 1.5), sub("c", 2.0, 3.0)];
        let groups = find_overlap_groups(&subtitles);
        assert_eq!(
            groups,
            vec![OverlapGroup {
                subtitle_indices: vec![0, 1],
                texts: vec!["a".to_string(), "b".to_string()],
            }]
        );
    }

    #[test]
    fn overlap_chains_join_one_group() {
        let subtitles = vec![
            sub("a", 0.0, 1.0),
            sub("x", 5.0, 6.0),
            sub("b", 0.9, 2.0),
            sub("c", 1.9, 3.0),
            sub("touching", 3.0, 4.0),
        ];
        let groups = find_overlap_groups(&subtitles);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].subtitle_indices, vec![0, 2, 3]);
    }

    #[test]
    fn offset_search_finds_late_speech() {
        let config = SyncConfig::default();
        let transcription = vec![seg("hello world", 1.0, 2.0)];
        let engine = SyncEngine::new(&config, &transcription);
        let search = engine.find_best_temporal_offset(&sub("hello world", 0.0, 1.0));
        assert!(search.best_offset > 0.0 && search.best_offset <= 1.0);
        assert_eq!(search.best_offset, 0.6);
        assert_eq!(search.best_ratio, 1.0);
        assert_eq!(search.zero_ratio, 0.0);
        assert!(search.material_improvement);
    }

    #[test]
    fn offset_search_prefers_zero_when_already_aligned() {
        let config = SyncConfig::default();
        let transcription = vec![seg("hello world", 0.0, 1.0)];
        let engine = SyncEngine::new(&config, &transcription);
        let search = engine.find_best_temporal_offset(&sub("hello world", 0.0, 1.0));
        assert_eq!(search.best_offset, 0.0);
        assert_eq!(search.best_ratio, 1.0);
        assert!(!search.material_improvement);
    }

    #[test]
    fn offset_grid_stays_inside_window_when_step_does_not_divide_it() {
        let config = SyncConfig {
            offset_window: 1.5,
            offset_step: 0.4,
            ..SyncConfig::default()
        };
        // reachable only from an offset past +1.5
        let transcription = vec![seg("hello", 2.65, 3.0)];
        let engine = SyncEngine::new(&config, &transcription);
        let search = engine.find_best_temporal_offset(&sub("hello", 0.0, 1.0));
        assert!(search.best_offset.abs() <= config.offset_window);
        assert_eq!(search.best_offset, 0.0);
        assert_eq!(search.best_ratio, 0.0);
        assert!(!search.material_improvement);
    }

    #[test]
    fn non_positive_step_only_checks_zero() {
        let config = SyncConfig {
            offset_step: 0.0,
            ..SyncConfig::default()
        };
        // matches exactly at -window
        let transcription = vec![seg("hello", 0.5, 1.5)];
        let engine = SyncEngine::new(&config, &transcription);
        let search = engine.find_best_temporal_offset(&sub("hello", 2.0, 3.0));
        assert_eq!(search.best_offset, 0.0);
        assert_eq!(search.best_ratio, 0.0);
        assert!(!search.material_improvement);
    }

    #[test]
    fn small_gain_from_shifting_keeps_zero_offset() {
        let subtitles = vec![sub("alpha bravo charlie delta echo foxtrot", 0.0, 6.0)];
        let transcription = vec![
            seg("alpha bravo charlie delta echo", 0.0, 5.0),
            seg("foxtrot", 6.5, 7.0),
        ];
        let config = SyncConfig::default();

        let engine = SyncEngine::new(&config, &transcription);
        let search = engine.find_best_temporal_offset(&subtitles[0]);
        assert_eq!(search.best_offset, 0.6);
        assert_eq!(search.best_ratio, 1.0);
        assert!((search.zero_ratio - 5.0 / 6.0).abs() < 1e-12);
        assert!(!search.material_improvement);

        let report = build_sync_report(&subtitles, &transcription, &config);
        let detail = &report.details[0];
        assert_eq!(detail.offset, 0.0);
        assert_eq!(detail.best_ratio, 1.0);
        assert_eq!(detail.status, SyncStatus::LikelySynced);
        assert!(report.summary.estimated_drift.is_none());
    }

    #[test]
    fn shifted_window_scores_only_the_words_it_covers() {
        let config = SyncConfig::default();
        let transcription = vec![seg("so reality check", 0.0, 1.5)];
        let engine = SyncEngine::new(&config, &transcription);
        let search = engine.find_best_temporal_offset(&sub("so reality check", 0.5, 1.5));
        // "so" sits in [0, 0.5] and is outside the unshifted window
        assert!((search.zero_ratio - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(search.best_offset, -0.1);
        assert_eq!(search.best_ratio, 1.0);
        assert!(search.material_improvement);
    }

    #[test]
    fn drift_is_median_of_material_offsets() {
        let subtitles = vec![
            sub("hello world", 0.0, 1.0),
            sub("good morning", 10.0, 11.0),
            sub("fine thanks", 20.0, 21.0),
        ];
        let transcription = vec![
            seg("hello world", 1.0, 2.0),
            seg("good morning", 11.0, 12.0),
            seg("fine thanks", 20.0, 21.0),
        ];
        let report = build_sync_report(&subtitles, &transcription, &SyncConfig::default());
        assert_eq!(report.details[0].offset, 0.6);
        assert_eq!(report.details[1].offset, 0.6);
        assert_eq!(report.details[2].offset, 0.0);
        assert_eq!(report.details[0].status, SyncStatus::Misaligned);
        assert_eq!(report.details[0].best_ratio, 1.0);
        assert_eq!(report.summary.estimated_drift, Some(0.6));
    }

    #[test]
    fn near_threshold_ratio_is_promoted_by_edit_similarity() {
        // 19 of 20 words match, the odd one is off by a single letter
        let words: Vec<String> = (0..20).map(|i| format!("word{i}")).collect();
        let subtitle_text = words.join(" ");
        let mut heard = words.clone();
        heard[19] = "word19s".to_string();
        let transcription = vec![seg(&heard.join(" "), 0.0, 4.0)];

        let config = SyncConfig {
            synced_threshold: 0.96,
            ..SyncConfig::default()
        };
        let engine = SyncEngine::new(&config, &transcription);
        let detail = engine.classify(0, &sub(&subtitle_text, 0.0, 4.0));
        assert_eq!(detail.ratio, 0.95);
        let similarity = detail.edit_similarity.expect("tie break ran");
        assert!(similarity >= 0.96);
        assert_eq!(detail.status, SyncStatus::Synced);
    }

    #[test]
    fn clear_misses_skip_the_tie_break() {
        let config = SyncConfig::default();
        let transcription = vec![seg("completely different", 0.0, 1.0)];
        let engine = SyncEngine::new(&config, &transcription);
        let detail = engine.classify(0, &sub("nothing matches", 0.0, 1.0));
        assert_eq!(detail.status, SyncStatus::Misaligned);
        assert!(detail.edit_similarity.is_none());
    }

    #[test]
    fn empty_streams_give_empty_report() {
        let config = SyncConfig::default();
        assert_eq!(
            build_sync_report(&[], &[seg("hi", 0.0, 1.0)], &config),
            SyncReport::empty()
        );
        assert_eq!(
            build_sync_report(&[sub("hi", 0.0, 1.0)], &[], &config),
            SyncReport::empty()
        );
    }

    #[test]
    fn median_handles_even_counts() {
        assert_eq!(median(&mut []), None);
        let even = median(&mut [0.4, -0.2, 0.8, 0.2]).expect("median");
        assert!((even - 0.3).abs() < 1e-12);
        assert_eq!(median(&mut [0.5]), Some(0.5));
    }
}
