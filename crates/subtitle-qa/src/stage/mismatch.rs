use subtitle_qa_types::{
    Detection, Mismatch, MismatchKind, Severity, SyncReport, SyncStatus, TranscriptionSegment,
};

use crate::config::MismatchConfig;
use crate::text::normalize_for_contains;

const NO_NEARBY_SUBTITLE: &str = "[no nearby subtitle]";
const NO_NEARBY_TEXT: &str = "[no nearby subtitle text]";

/// Content check: every transcription segment should appear inside the
/// subtitles shown around it.
pub fn detect_containment_mismatches(
    subtitles: &[Detection],
    transcription: &[TranscriptionSegment],
    config: &MismatchConfig,
) -> Vec<Mismatch> {
    let window = config.containment_window;
    let mut ordered: Vec<&Detection> = subtitles.iter().collect();
    ordered.sort_by(|a, b| {
        a.start_time
            .total_cmp(&b.start_time)
            .then(a.end_time.total_cmp(&b.end_time))
    });

    let mut mismatches = Vec::new();
    for segment in transcription {
        let nearby: Vec<&str> = ordered
            .iter()
            .filter(|subtitle| {
                subtitle.start_time <= segment.end_time + window
                    && subtitle.end_time >= segment.start_time - window
            })
            .map(|subtitle| subtitle.text.as_str())
            .collect();

        if nearby.is_empty() {
            mismatches.push(Mismatch {
                subtitle_text: NO_NEARBY_SUBTITLE.to_string(),
                transcription_text: segment.text.clone(),
                start_time: segment.start_time,
                end_time: segment.end_time,
                severity: Severity::High,
                mismatch_type: MismatchKind::MissingSubtitleWindow,
            });
            continue;
        }

        let joined = nearby.join(" ");
        let heard = normalize_for_contains(&segment.text);
        let shown = normalize_for_contains(&joined);
        if heard.is_empty() || !shown.contains(&heard) {
            let subtitle_text = if joined.trim().is_empty() {
                NO_NEARBY_TEXT.to_string()
            } else {
                joined
            };
            mismatches.push(Mismatch {
                subtitle_text,
                transcription_text: segment.text.clone(),
                start_time: segment.start_time,
                end_time: segment.end_time,
                severity: Severity::Medium,
                mismatch_type: MismatchKind::TranscriptNotContainedInSubtitles,
            });
        }
    }
    mismatches
}

pub fn misaligned_severity(ratio: f64, config: &MismatchConfig) -> Severity {
    if ratio < config.high_severity_below {
        Severity::High
    } else if ratio < config.medium_severity_below {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Alignment check: surfaces each misaligned subtitle of `report`, graded
/// by the ratio already computed there.
pub fn detect_alignment_mismatches(
    report: &SyncReport,
    subtitles: &[Detection],
    transcription: &[TranscriptionSegment],
    config: &MismatchConfig,
) -> Vec<Mismatch> {
    report
        .details
        .iter()
        .filter(|detail| detail.status == SyncStatus::Misaligned)
        .filter_map(|detail| {
            let subtitle = subtitles.get(detail.subtitle_index)?;
            let heard = transcription
                .iter()
                .filter(|segment| {
                    segment.start_time < subtitle.end_time && subtitle.start_time < segment.end_time
                })
                .map(|segment| segment.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            Some(Mismatch {
                subtitle_text: subtitle.text.clone(),
                transcription_text: heard,
                start_time: subtitle.start_time,
                end_time: subtitle.end_time,
                severity: misaligned_severity(detail.ratio, config),
                mismatch_type: MismatchKind::SubtitleMisaligned,
            })
        })
        .collect()
}

/// Both checks, containment findings first.
pub fn detect_mismatches(
    report: &SyncReport,
    subtitles: &[Detection],
    transcription: &[TranscriptionSegment],
    config: &MismatchConfig,
) -> Vec<Mismatch> {
    let mut mismatches = detect_containment_mismatches(subtitles, transcription, config);
    mismatches.extend(detect_alignment_mismatches(report, subtitles, transcription, config));
    mismatches
}
