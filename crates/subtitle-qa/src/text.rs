//! Text normalization and similarity measures shared by the analysis stages.

use std::collections::HashMap;

const NUMBER_WORDS: &[(&str, &str)] = &[
    ("zero", "0"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
    ("ten", "10"),
    ("eleven", "11"),
    ("twelve", "12"),
    ("thirteen", "13"),
    ("fourteen", "14"),
    ("fifteen", "15"),
    ("sixteen", "16"),
    ("seventeen", "17"),
    ("eighteen", "18"),
    ("nineteen", "19"),
    ("twenty", "20"),
    ("twenties", "20s"),
    ("thirty", "30"),
    ("thirties", "30s"),
    ("forty", "40"),
    ("forties", "40s"),
    ("fifty", "50"),
    ("fifties", "50s"),
    ("sixty", "60"),
    ("seventy", "70"),
    ("eighty", "80"),
    ("ninety", "90"),
    ("hundred", "100"),
    ("thousand", "1000"),
];

fn number_word(word: &str) -> Option<&'static str> {
    NUMBER_WORDS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, digits)| *digits)
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Lowercases, drops punctuation, maps number words to digits and collapses
/// whitespace: `"Fifty percent!"` becomes `"50 percent"`.
pub fn normalize_for_comparison(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|ch| is_word_char(*ch) || ch.is_whitespace())
        .collect();
    stripped
        .split_whitespace()
        .map(|word| number_word(word).unwrap_or(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Comparison form with all spaces removed, used for substring checks.
pub fn normalize_for_contains(text: &str) -> String {
    normalize_for_comparison(text).replace(' ', "")
}

pub fn tokens(text: &str) -> Vec<String> {
    normalize_for_comparison(text)
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case-folded, whitespace-collapsed key used for repetition counting.
pub fn repetition_key(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A normalized token with the slice of its parent's time span it occupies.
#[derive(Debug, Clone, PartialEq)]
pub struct WordWindow {
    pub token: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl WordWindow {
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start_time < end && start < self.end_time
    }
}

/// Splits `text` into tokens that evenly partition `[start, end]`.
pub fn word_windows(text: &str, start: f64, end: f64) -> Vec<WordWindow> {
    let tokens = tokens(text);
    if tokens.is_empty() {
        return Vec::new();
    }
    let count = tokens.len();
    let slice = (end - start).max(0.0) / count as f64;
    tokens
        .into_iter()
        .enumerate()
        .map(|(index, token)| {
            let window_start = start + slice * index as f64;
            let window_end = if index + 1 == count {
                end.max(start)
            } else {
                start + slice * (index + 1) as f64
            };
            WordWindow {
                token,
                start_time: window_start,
                end_time: window_end,
            }
        })
        .collect()
}

/// Share of `reference` tokens found in `candidate`, counting duplicates at
/// most as often as they occur in `candidate`. Zero for an empty reference.
pub fn word_overlap_ratio<A, B>(reference: &[A], candidate: &[B]) -> f64
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    if reference.is_empty() {
        return 0.0;
    }
    let mut available: HashMap<&str, usize> = HashMap::new();
    for token in candidate {
        *available.entry(token.as_ref()).or_insert(0) += 1;
    }
    let mut matched = 0usize;
    for token in reference {
        if let Some(count) = available.get_mut(token.as_ref())
            && *count > 0
        {
            *count -= 1;
            matched += 1;
        }
    }
    matched as f64 / reference.len() as f64
}

/// Single-character insert/delete/substitute distance, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// `1 - distance / longer length`, or `1.0` when both strings are empty.
pub fn char_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}
