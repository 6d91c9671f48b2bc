use subtitle_qa_types::Detection;
use tracing::debug;

use crate::config::MergeConfig;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub groups: u64,
    pub sequences: u64,
    pub partial: u64,
}

/// Collapses animated text (typing on or erasing at one screen position)
/// into a single detection per visual event.
pub struct SequenceMerger {
    iou_threshold: f64,
    max_gap: f64,
}

impl SequenceMerger {
    pub fn new(config: &MergeConfig) -> Self {
        Self {
            iou_threshold: config.iou_threshold,
            max_gap: config.max_gap,
        }
    }

    pub fn merge(&self, detections: &[Detection]) -> (Vec<Detection>, MergeStats) {
        let mut stats = MergeStats::default();
        let mut merged = Vec::with_capacity(detections.len());

        for mut group in self.spatial_groups(detections) {
            stats.groups = stats.groups.saturating_add(1);
            group.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

            let mut sequence: Vec<&Detection> = Vec::new();
            for detection in group {
                if let Some(previous) = sequence.last()
                    && !self.continues(previous, detection)
                {
                    merged.push(resolve_sequence(&sequence, &mut stats));
                    sequence.clear();
                }
                sequence.push(detection);
            }
            if !sequence.is_empty() {
                merged.push(resolve_sequence(&sequence, &mut stats));
            }
        }

        debug!(
            input = detections.len(),
            output = merged.len(),
            partial = stats.partial,
            "merged partial text sequences"
        );
        (merged, stats)
    }

    /// Greedy single pass: each unassigned detection seeds a group and takes
    /// every later unassigned detection overlapping the seed.
    fn spatial_groups<'a>(&self, detections: &'a [Detection]) -> Vec<Vec<&'a Detection>> {
        let mut assigned = vec![false; detections.len()];
        let mut groups = Vec::new();

        for (index, seed) in detections.iter().enumerate() {
            if assigned[index] {
                continue;
            }
            assigned[index] = true;
            let mut group = vec![seed];
            for (other_index, other) in detections.iter().enumerate().skip(index + 1) {
                if assigned[other_index] {
                    continue;
                }
                if seed.bbox.iou(&other.bbox) > self.iou_threshold {
                    assigned[other_index] = true;
                    group.push(other);
                }
            }
            groups.push(group);
        }
        groups
    }

    fn continues(&self, previous: &Detection, current: &Detection) -> bool {
        let previous_text = previous.text.trim();
        let current_text = current.text.trim();
        let is_prefix =
            current_text.starts_with(previous_text) || previous_text.starts_with(current_text);
        let gap = current.start_time - previous.end_time;
        is_prefix && gap < self.max_gap
    }
}

fn resolve_sequence(sequence: &[&Detection], stats: &mut MergeStats) -> Detection {
    stats.sequences = stats.sequences.saturating_add(1);
    if let [single] = sequence {
        return (*single).clone();
    }

    let mut longest = sequence[0];
    for member in &sequence[1..] {
        if member.text.chars().count() > longest.text.chars().count() {
            longest = member;
        }
    }

    let start_time = sequence
        .iter()
        .map(|member| member.start_time)
        .fold(f64::INFINITY, f64::min);
    let end_time = sequence
        .iter()
        .map(|member| member.end_time)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut resolved = Detection::new(
        longest.text.clone(),
        start_time,
        end_time,
        longest.confidence,
        longest.bbox,
    );
    stats.partial = stats.partial.saturating_add(1);
    resolved.is_partial_sequence = true;
    resolved.partial_members = sequence.iter().map(|member| member.text.clone()).collect();
    resolved
}
