//! Chat Profanity Filter
//!
//! Pure word-by-word masking of banned vocabulary. Matching is
//! case-insensitive and ignores non-letter characters, so "B@dword!"
//! still matches "badword". Matched words keep their first and last
//! character; everything in between becomes `*`.

use std::collections::HashSet;

/// Starter dictionary. Deployments are expected to extend it via
/// [`ProfanityFilter::with_words`].
const DEFAULT_BANNED: &[&str] = &["badword", "curse"];

/// Masks banned words in chat text.
#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    banned: HashSet<String>,
}

impl Default for ProfanityFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfanityFilter {
    /// Create a filter with the default dictionary.
    pub fn new() -> Self {
        Self::with_words(DEFAULT_BANNED.iter().copied())
    }

    /// Create a filter with a custom banned-word list. Words are
    /// normalized (lowercased, letters only) before lookup.
    pub fn with_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            banned: words
                .into_iter()
                .map(|w| normalize(w.as_ref()))
                .collect(),
        }
    }

    /// Filter a message, masking any word that matches the banned list.
    /// Word count and per-word length are preserved; runs of whitespace
    /// collapse to single spaces.
    pub fn filter(&self, input: &str) -> String {
        if input.trim().is_empty() {
            return input.to_string();
        }
        input
            .split_whitespace()
            .map(|word| {
                if self.banned.contains(&normalize(word)) {
                    mask(word)
                } else {
                    word.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Lowercase and strip everything that is not an ASCII letter.
fn normalize(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// Mask the interior of a word, keeping the first and last character.
/// Words of one or two characters become `**`.
fn mask(word: &str) -> String {
    let mut chars: Vec<char> = word.chars().collect();
    if chars.len() <= 2 {
        return "**".to_string();
    }
    let last = chars.len() - 1;
    for c in &mut chars[1..last] {
        if c.is_alphanumeric() {
            *c = '*';
        }
    }
    chars.into_iter().collect()
}
