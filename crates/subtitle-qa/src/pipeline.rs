use serde::Serialize;
use serde_json::Value;
use subtitle_qa_providers::{
    NormalizeStats, SpellChecker, TranscriptionStats, normalize_detections,
    normalize_transcription,
};
use subtitle_qa_types::{
    AuditRow, Detection, Mismatch, RunCounts, SpellingCandidate, SyncReport, TranscriptionSegment,
};
use tracing::info;

use crate::config::AnalysisConfig;
use crate::stage::audit::{build_audit_rows, run_counts};
use crate::stage::classifier::TextClassifier;
use crate::stage::merge::{MergeStats, SequenceMerger};
use crate::stage::mismatch::detect_mismatches;
use crate::stage::select::{SubtitleSelector, assign_detection_ids};
use crate::stage::spelling::{collect_candidates, filter_false_positives};
use crate::stage::sync::build_sync_report;
use crate::stage::tagger::SemanticTagger;

/// Provider payloads for one video, already decoded from JSON.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub detections: Value,
    pub transcription: Value,
    /// Falls back to the latest detection end when absent.
    pub video_duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InputStats {
    pub annotations: usize,
    pub segments: usize,
    pub unparseable_segments: usize,
    pub transcription_rows: usize,
    pub transcription_missing_text: usize,
    pub transcription_unparseable_times: usize,
    pub merge_groups: u64,
    pub merge_sequences: u64,
    pub spellcheck_failures: usize,
}

impl InputStats {
    fn new(detections: &NormalizeStats, transcription: &TranscriptionStats, merge: &MergeStats) -> Self {
        Self {
            annotations: detections.annotations,
            segments: detections.segments,
            unparseable_segments: detections.unparseable_segments,
            transcription_rows: transcription.rows,
            transcription_missing_text: transcription.missing_text,
            transcription_unparseable_times: transcription.unparseable_times,
            merge_groups: merge.groups,
            merge_sequences: merge.sequences,
            spellcheck_failures: 0,
        }
    }
}

/// Everything one run produces. Serializes as the report file.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub video_duration: f64,
    pub counts: RunCounts,
    pub stats: InputStats,
    pub detections: Vec<Detection>,
    pub subtitles: Vec<Detection>,
    pub transcription: Vec<TranscriptionSegment>,
    pub spelling_raw: Vec<SpellingCandidate>,
    pub spelling: Vec<SpellingCandidate>,
    pub sync_report: SyncReport,
    pub mismatches: Vec<Mismatch>,
    #[serde(skip)]
    pub audit: Vec<AuditRow>,
}

fn inferred_duration(detections: &[Detection]) -> f64 {
    detections
        .iter()
        .map(|detection| detection.end_time)
        .fold(0.0, f64::max)
}

/// Runs normalize, merge, classify, tag, select, spellcheck, sync and
/// mismatch detection over one video's payloads.
pub fn analyze(
    input: &AnalysisInput,
    config: &AnalysisConfig,
    spell_checker: &dyn SpellChecker,
) -> AnalysisOutput {
    let batch = normalize_detections(&input.detections);
    let transcription = normalize_transcription(&input.transcription);
    let raw_count = batch.detections.len();

    let (mut detections, merge_stats) = SequenceMerger::new(&config.merge).merge(&batch.detections);
    info!(
        raw = raw_count,
        merged = detections.len(),
        partial = merge_stats.partial,
        "merged detections"
    );

    let video_duration = input
        .video_duration
        .filter(|duration| *duration > 0.0)
        .unwrap_or_else(|| inferred_duration(&detections));
    TextClassifier::new(&config.classifier, video_duration).classify(&mut detections);
    SemanticTagger::new(&config.tagger).tag(&mut detections);
    assign_detection_ids(&mut detections);

    let selector = SubtitleSelector::new(&config.selection, &detections);
    let subtitles = selector.select(&detections);
    info!(
        total = detections.len(),
        selected = subtitles.len(),
        video_duration,
        "selected subtitles"
    );

    let spelling_run = collect_candidates(&subtitles, spell_checker);
    let kept = filter_false_positives(&spelling_run.raw, &detections);
    info!(
        checker = spell_checker.name(),
        raw = spelling_run.raw.len(),
        kept = kept.len(),
        "filtered spelling candidates"
    );

    let sync_report = build_sync_report(&subtitles, &transcription.segments, &config.sync);
    let mismatches = detect_mismatches(
        &sync_report,
        &subtitles,
        &transcription.segments,
        &config.mismatch,
    );
    info!(
        synced = sync_report.summary.synced,
        likely_synced = sync_report.summary.likely_synced,
        misaligned = sync_report.summary.misaligned,
        overlaps = sync_report.duplicates.len(),
        mismatches = mismatches.len(),
        "checked synchronization"
    );

    let audit = build_audit_rows(&detections, &selector, &spelling_run, &kept);
    let counts = run_counts(raw_count, &detections, &audit, &spelling_run, &kept);
    let mut stats = InputStats::new(&batch.stats, &transcription.stats, &merge_stats);
    stats.spellcheck_failures = spelling_run.failures;

    AnalysisOutput {
        video_duration,
        counts,
        stats,
        detections,
        subtitles,
        transcription: transcription.segments,
        spelling_raw: spelling_run.raw,
        spelling: kept,
        sync_report,
        mismatches,
        audit,
    }
}
