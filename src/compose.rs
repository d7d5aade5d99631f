//! Turns raw user input into the ordered list of candidates to present.
//!
//! Input is trimmed and lowercased, then classified once:
//! - empty input yields no candidates
//! - a single alphabetic word yields the word followed by its neighbors
//! - anything else is a phrase and is passed through capitalized

use std::collections::HashSet;

use serde::Serialize;

use crate::semantic::QueryEngine;

/// Hard cap on the number of candidates, the input included
pub const MAX_CANDIDATES: usize = 5;

/// Neighbors requested from the engine for a single word
pub const NEIGHBORS_PER_WORD: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Empty,
    SingleWord(String),
    Phrase(String),
}

/// Classify raw input. Pure; the returned text is already normalized.
pub fn classify(raw: &str) -> InputKind {
    let text = raw.trim().to_lowercase();

    if text.is_empty() {
        InputKind::Empty
    } else if text.chars().all(char::is_alphabetic) {
        InputKind::SingleWord(text)
    } else {
        InputKind::Phrase(capitalize(&text))
    }
}

/// Uppercase the first character, leave the rest untouched.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ordered, deduplicated candidates, input first, at most `MAX_CANDIDATES`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CandidateList(Vec<String>);

impl CandidateList {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn single(text: String) -> Self {
        Self(vec![text])
    }

    /// `word` first, then neighbors not already present (case-insensitive).
    fn merge<'a>(word: String, neighbors: impl IntoIterator<Item = &'a str>) -> Self {
        let mut seen = HashSet::new();
        seen.insert(word.to_lowercase());

        let mut list = vec![word];
        for neighbor in neighbors {
            if list.len() >= MAX_CANDIDATES {
                break;
            }
            if seen.insert(neighbor.to_lowercase()) {
                list.push(neighbor.to_string());
            }
        }

        Self(list)
    }
}

#[cfg(test)]
impl CandidateList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
impl<S: Into<String>> FromIterator<S> for CandidateList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Clone)]
pub struct Composer {
    engine: QueryEngine,
}

impl Composer {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Build the candidate list for `raw`.
    ///
    /// Never fails: engine errors are logged and yield an empty list.
    pub fn compose(&self, raw: &str) -> CandidateList {
        match classify(raw) {
            InputKind::Empty => CandidateList::default(),
            InputKind::Phrase(phrase) => CandidateList::single(phrase),
            InputKind::SingleWord(word) => match self.engine.query(&word, NEIGHBORS_PER_WORD) {
                Ok(result) => CandidateList::merge(word, result.words()),
                Err(err) => {
                    log::warn!("similar words for '{}' unavailable: {}", word, err);
                    CandidateList::default()
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_empty() {
        assert_eq!(classify(""), InputKind::Empty);
        assert_eq!(classify("   \t"), InputKind::Empty);
    }

    #[test]
    fn test_classify_single_word_is_lowercased() {
        assert_eq!(classify("Cat"), InputKind::SingleWord("cat".to_string()));
        assert_eq!(classify("  KITTEN "), InputKind::SingleWord("kitten".to_string()));
        assert_eq!(classify("café"), InputKind::SingleWord("café".to_string()));
    }

    #[test]
    fn test_classify_phrase() {
        assert_eq!(
            classify("the cat sat"),
            InputKind::Phrase("The cat sat".to_string())
        );
        assert_eq!(
            classify("THE CAT SAT"),
            InputKind::Phrase("The cat sat".to_string())
        );
        assert_eq!(classify("cat's"), InputKind::Phrase("Cat's".to_string()));
        assert_eq!(classify("route66"), InputKind::Phrase("Route66".to_string()));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("hello"), "Hello");
        assert_eq!(capitalize("élan vital"), "Élan vital");
        assert_eq!(capitalize("1st place"), "1st place");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_merge_removes_self_and_caps() {
        let list = CandidateList::merge(
            "cat".to_string(),
            ["cat", "kitten", "feline", "tabby", "dog", "puppy"],
        );
        assert_eq!(list.as_slice(), ["cat", "kitten", "feline", "tabby", "dog"]);
    }

    #[test]
    fn test_merge_is_case_insensitive() {
        let list = CandidateList::merge("cat".to_string(), ["Cat", "CAT", "kitten", "Kitten"]);
        assert_eq!(list.as_slice(), ["cat", "kitten"]);
    }

    #[test]
    fn test_merge_without_self_match_still_caps_at_five() {
        let list = CandidateList::merge("kitty".to_string(), ["a", "b", "c", "d", "e"]);
        assert_eq!(list.as_slice(), ["kitty", "a", "b", "c", "d"]);
        assert_eq!(list.len(), MAX_CANDIDATES);
    }

    #[test]
    fn test_candidate_list_serializes_as_array() {
        let list = CandidateList::merge("cat".to_string(), ["dog"]);
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"["cat","dog"]"#);
    }
}
