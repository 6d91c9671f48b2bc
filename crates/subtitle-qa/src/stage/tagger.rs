use std::collections::HashMap;

use subtitle_qa_types::{Detection, SemanticTag};

use crate::config::TaggerConfig;
use crate::text::repetition_key;

/// Adds advisory proper-name and brand tags. Tags never influence the
/// subtitle/fixed decision, only spelling suppression downstream.
pub struct SemanticTagger<'a> {
    config: &'a TaggerConfig,
}

impl<'a> SemanticTagger<'a> {
    pub fn new(config: &'a TaggerConfig) -> Self {
        Self { config }
    }

    pub fn tag(&self, detections: &mut [Detection]) {
        let mut text_counts: HashMap<String, usize> = HashMap::new();
        for detection in detections.iter() {
            let key = repetition_key(&detection.text);
            if !key.is_empty() {
                *text_counts.entry(key).or_insert(0) += 1;
            }
        }

        for detection in detections.iter_mut() {
            let repeats = text_counts
                .get(&repetition_key(&detection.text))
                .copied()
                .unwrap_or(0);
            let mut tags = Vec::new();
            if self.looks_like_proper_name(&detection.text) {
                tags.push(SemanticTag::ProperName);
            }
            if self.looks_like_brand(&detection.text)
                || (detection.is_fixed_text && repeats >= self.config.brand_min_repeats)
                || (detection.is_fixed_text && self.is_short_capitalized(&detection.text))
            {
                tags.push(SemanticTag::BrandName);
            }

            let mut deduped: Vec<SemanticTag> = Vec::with_capacity(tags.len());
            for tag in tags {
                if !deduped.contains(&tag) {
                    deduped.push(tag);
                }
            }
            detection.semantic_tags = deduped;
        }
    }

    pub fn looks_like_proper_name(&self, text: &str) -> bool {
        let tokens = name_tokens(text);
        if !(self.config.name_min_tokens..=self.config.name_max_tokens).contains(&tokens.len()) {
            return false;
        }
        let capitalized = tokens
            .iter()
            .all(|token| token.chars().next().is_some_and(|ch| ch.is_ascii_uppercase()));
        // multi-letter acronyms are not names
        let acronym = tokens.iter().any(|token| {
            token.len() > 1
                && token
                    .chars()
                    .filter(char::is_ascii_alphabetic)
                    .all(|ch| ch.is_ascii_uppercase())
        });
        capitalized && !acronym
    }

    pub fn looks_like_brand(&self, text: &str) -> bool {
        let letters: Vec<char> = text.chars().filter(char::is_ascii_alphabetic).collect();
        if letters.len() < self.config.brand_min_letters {
            return false;
        }
        let upper = letters.iter().filter(|ch| ch.is_ascii_uppercase()).count();
        upper as f64 / letters.len() as f64 >= self.config.brand_upper_ratio
    }

    fn is_short_capitalized(&self, text: &str) -> bool {
        text.split_whitespace().count() <= self.config.brand_max_words
            && text.chars().next().is_some_and(char::is_uppercase)
    }
}

/// Letter runs that may continue with apostrophes or hyphens.
fn name_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (index, ch) in text.char_indices() {
        match start {
            None if ch.is_ascii_alphabetic() => start = Some(index),
            Some(begin) if !(ch.is_ascii_alphabetic() || ch == '\'' || ch == '-') => {
                tokens.push(&text[begin..index]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        tokens.push(&text[begin..]);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use subtitle_qa_types::BoundingBox;

    fn det(text: &str, fixed: bool) -> Detection {
        let mut detection = Detection::new(text, 0.0, 1.0, Some(0.9), BoundingBox::FULL_FRAME);
        detection.is_fixed_text = fixed;
        detection
    }

    #[test]
    fn proper_names() {
        let config = TaggerConfig::default();
        let tagger = SemanticTagger::new(&config);
        assert!(tagger.looks_like_proper_name("Maria Silva"));
        assert!(tagger.looks_like_proper_name("Jean-Luc O'Neil"));
        assert!(!tagger.looks_like_proper_name("Ana Maria de Souza"));
        assert!(!tagger.looks_like_proper_name("Maria"));
        assert!(!tagger.looks_like_proper_name("One Two Three Four Five"));
        assert!(!tagger.looks_like_proper_name("NASA Team"));
        assert!(tagger.looks_like_proper_name("A Team"));
    }

    #[test]
    fn brands_by_case() {
        let config = TaggerConfig::default();
        let tagger = SemanticTagger::new(&config);
        assert!(tagger.looks_like_brand("NETFLIX"));
        assert!(tagger.looks_like_brand("HBO MAX!"));
        assert!(!tagger.looks_like_brand("BBC news"));
        assert!(!tagger.looks_like_brand("TV"));
        assert!(!tagger.looks_like_brand("Hello World"));
    }

    #[test]
    fn tags_follow_fixed_text_rules() {
        let mut batch = vec![
            det("Maria Silva", false),
            det("breaking news tonight live", true),
            det("breaking news tonight live", true),
            det("Acme", true),
            det("Acme", false),
            det("LOGO", false),
        ];
        SemanticTagger::new(&TaggerConfig::default()).tag(&mut batch);
        assert_eq!(batch[0].semantic_tags, vec![SemanticTag::ProperName]);
        assert_eq!(batch[1].semantic_tags, vec![SemanticTag::BrandName]);
        assert_eq!(batch[3].semantic_tags, vec![SemanticTag::BrandName]);
        assert!(batch[4].semantic_tags.is_empty());
        assert_eq!(batch[5].semantic_tags, vec![SemanticTag::BrandName]);
    }

    #[test]
    fn name_and_brand_tags_can_coexist() {
        let mut batch = vec![det("Acme Corp", true)];
        SemanticTagger::new(&TaggerConfig::default()).tag(&mut batch);
        assert_eq!(
            batch[0].semantic_tags,
            vec![SemanticTag::ProperName, SemanticTag::BrandName]
        );
    }

    #[test]
    fn thresholds_come_from_config() {
        let config = TaggerConfig {
            name_max_tokens: 5,
            brand_min_repeats: 3,
            ..TaggerConfig::default()
        };
        let tagger = SemanticTagger::new(&config);
        assert!(tagger.looks_like_proper_name("One Two Three Four Five"));

        let mut batch = vec![
            det("breaking news tonight live", true),
            det("breaking news tonight live", true),
        ];
        tagger.tag(&mut batch);
        assert!(batch[0].semantic_tags.is_empty());
    }
}
