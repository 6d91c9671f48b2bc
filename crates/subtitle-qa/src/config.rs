use serde::{Deserialize, Serialize};

use crate::settings::ConfigError;

/// Every tunable threshold of the analysis, threaded into each stage call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub merge: MergeConfig,
    pub classifier: ClassifierConfig,
    pub tagger: TaggerConfig,
    pub selection: SelectionConfig,
    pub sync: SyncConfig,
    pub mismatch: MismatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Detections join a spatial group when IoU with the seed exceeds this.
    pub iou_threshold: f64,
    /// Largest gap in seconds between consecutive members of one sequence.
    pub max_gap: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.6,
            max_gap: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub subtitle_min_center: f64,
    pub fixed_max_center: f64,
    pub subtitle_min_duration: f64,
    pub subtitle_max_duration: f64,
    pub fixed_min_video_fraction: f64,
    pub subtitle_min_words: usize,
    pub fixed_max_words: usize,
    pub repeat_iou: f64,
    pub repeat_min_count: u32,
    pub weights: ClassifierWeights,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            subtitle_min_center: 0.70,
            fixed_max_center: 0.15,
            subtitle_min_duration: 0.5,
            subtitle_max_duration: 8.0,
            fixed_min_video_fraction: 0.3,
            subtitle_min_words: 3,
            fixed_max_words: 2,
            repeat_iou: 0.85,
            repeat_min_count: 3,
            weights: ClassifierWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierWeights {
    pub subtitle_position: i32,
    pub subtitle_duration: i32,
    pub subtitle_words: i32,
    pub fixed_position: i32,
    pub fixed_duration: i32,
    pub fixed_words: i32,
    pub fixed_repetition: i32,
}

impl Default for ClassifierWeights {
    fn default() -> Self {
        Self {
            subtitle_position: 3,
            subtitle_duration: 2,
            subtitle_words: 1,
            fixed_position: 3,
            fixed_duration: 4,
            fixed_words: 1,
            fixed_repetition: 4,
        }
    }
}

/// Proper-name and brand heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    pub name_min_tokens: usize,
    pub name_max_tokens: usize,
    pub brand_min_letters: usize,
    /// Share of uppercase letters that marks text as a brand.
    pub brand_upper_ratio: f64,
    /// Fixed text repeated this often is a brand.
    pub brand_min_repeats: usize,
    pub brand_max_words: usize,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            name_min_tokens: 2,
            name_max_tokens: 4,
            brand_min_letters: 3,
            brand_upper_ratio: 0.8,
            brand_min_repeats: 2,
            brand_max_words: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub min_subtitle_confidence: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_subtitle_confidence: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub synced_threshold: f64,
    pub likely_synced_threshold: f64,
    /// Ratios this far below a threshold get an edit-distance second look.
    pub tie_break_margin: f64,
    pub offset_window: f64,
    pub offset_step: f64,
    pub offset_improvement_margin: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            synced_threshold: 0.95,
            likely_synced_threshold: 0.5,
            tie_break_margin: 0.05,
            offset_window: 1.5,
            offset_step: 0.1,
            offset_improvement_margin: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MismatchConfig {
    pub containment_window: f64,
    pub high_severity_below: f64,
    pub medium_severity_below: f64,
}

impl Default for MismatchConfig {
    fn default() -> Self {
        Self {
            containment_window: 1.5,
            high_severity_below: 0.2,
            medium_severity_below: 0.35,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit_fields = [
            ("merge.iou_threshold", self.merge.iou_threshold),
            ("classifier.subtitle_min_center", self.classifier.subtitle_min_center),
            ("classifier.fixed_max_center", self.classifier.fixed_max_center),
            (
                "classifier.fixed_min_video_fraction",
                self.classifier.fixed_min_video_fraction,
            ),
            ("classifier.repeat_iou", self.classifier.repeat_iou),
            ("tagger.brand_upper_ratio", self.tagger.brand_upper_ratio),
            (
                "selection.min_subtitle_confidence",
                self.selection.min_subtitle_confidence,
            ),
            ("sync.synced_threshold", self.sync.synced_threshold),
            ("sync.likely_synced_threshold", self.sync.likely_synced_threshold),
            ("sync.tie_break_margin", self.sync.tie_break_margin),
            (
                "sync.offset_improvement_margin",
                self.sync.offset_improvement_margin,
            ),
            ("mismatch.high_severity_below", self.mismatch.high_severity_below),
            (
                "mismatch.medium_severity_below",
                self.mismatch.medium_severity_below,
            ),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(field, value));
            }
        }

        let non_negative = [
            ("merge.max_gap", self.merge.max_gap),
            ("classifier.subtitle_min_duration", self.classifier.subtitle_min_duration),
            ("sync.offset_window", self.sync.offset_window),
            ("mismatch.containment_window", self.mismatch.containment_window),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(field, value));
            }
        }

        if !(self.classifier.subtitle_max_duration >= self.classifier.subtitle_min_duration) {
            return Err(ConfigError::invalid(
                "classifier.subtitle_max_duration",
                self.classifier.subtitle_max_duration,
            ));
        }
        if self.tagger.name_min_tokens > self.tagger.name_max_tokens {
            return Err(ConfigError::invalid(
                "tagger.name_min_tokens",
                self.tagger.name_min_tokens,
            ));
        }
        if !(self.sync.offset_step.is_finite() && self.sync.offset_step > 0.0) {
            return Err(ConfigError::invalid(
                "sync.offset_step",
                self.sync.offset_step,
            ));
        }
        if self.sync.likely_synced_threshold >= self.sync.synced_threshold {
            return Err(ConfigError::invalid(
                "sync.likely_synced_threshold",
                self.sync.likely_synced_threshold,
            ));
        }
        if self.mismatch.high_severity_below > self.mismatch.medium_severity_below {
            return Err(ConfigError::invalid(
                "mismatch.high_severity_below",
                self.mismatch.high_severity_below,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AnalysisConfig::default().validate().expect("valid defaults");
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: AnalysisConfig = toml::from_str(
            "[sync]\noffset_window = 2.0\n\n[classifier.weights]\nfixed_repetition = 6\n",
        )
        .expect("parse");
        assert_eq!(config.sync.offset_window, 2.0);
        assert_eq!(config.sync.offset_step, 0.1);
        assert_eq!(config.classifier.weights.fixed_repetition, 6);
        assert_eq!(config.classifier.weights.subtitle_position, 3);
        assert_eq!(config.merge, MergeConfig::default());
    }

    #[test]
    fn rejects_zero_step() {
        let mut config = AnalysisConfig::default();
        config.sync.offset_step = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sync.offset_step"));
    }

    #[test]
    fn rejects_inverted_name_token_range() {
        let mut config = AnalysisConfig::default();
        config.tagger.name_min_tokens = 5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tagger.name_min_tokens"));

        let config: AnalysisConfig =
            toml::from_str("[tagger]\nbrand_min_repeats = 4\n").expect("parse");
        assert_eq!(config.tagger.brand_min_repeats, 4);
        assert_eq!(config.tagger.name_max_tokens, 4);
    }

    #[test]
    fn rejects_inverted_sync_thresholds() {
        let mut config = AnalysisConfig::default();
        config.sync.likely_synced_threshold = 0.95;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_ratio_and_negative_window() {
        let mut config = AnalysisConfig::default();
        config.merge.iou_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.mismatch.containment_window = -1.0;
        assert!(config.validate().is_err());
    }
}
