//! Vocabulary loading for the embedding index.
//!
//! Reads a delimited word list (one word per record, first column, no header),
//! keeps only clean alphabetic words and drops duplicates. First occurrence
//! wins, so the resulting order is the order words appear in the source.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// Default field delimiter of the word list export.
pub const DEFAULT_DELIMITER: u8 = b';';

#[derive(Debug, thiserror::Error)]
pub enum VocabularyError {
    #[error("failed to read word list {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("malformed word list: {0}")]
    Malformed(#[from] csv::Error),
}

/// A deduplicated list of clean words, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    words: Vec<String>,
}

/// Counters collected while loading, logged by the build command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows: usize,
    pub rejected: usize,
    pub duplicates: usize,
}

impl Vocabulary {
    /// Load a word list from a file.
    pub fn load(path: &Path, delimiter: u8) -> Result<(Self, LoadStats), VocabularyError> {
        let reader = Self::reader_builder(delimiter)
            .from_path(path)
            .map_err(|source| VocabularyError::Unreadable {
                path: path.display().to_string(),
                source,
            })?;

        Self::collect(reader)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn reader_builder(delimiter: u8) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .delimiter(delimiter)
            .flexible(true);
        builder
    }

    fn collect<R: Read>(mut reader: csv::Reader<R>) -> Result<(Self, LoadStats), VocabularyError> {
        let mut vocab = Vocabulary::default();
        let mut seen = HashSet::new();
        let mut stats = LoadStats::default();

        for record in reader.byte_records() {
            let record = record?;
            stats.rows += 1;

            let Some(word) = record.get(0).and_then(|field| std::str::from_utf8(field).ok()) else {
                stats.rejected += 1;
                continue;
            };

            match vocab.push(word, &mut seen) {
                Push::Added => {}
                Push::Rejected => stats.rejected += 1,
                Push::Duplicate => stats.duplicates += 1,
            }
        }

        log::info!(
            "loaded {} words ({} rows, {} rejected, {} duplicates)",
            vocab.len(),
            stats.rows,
            stats.rejected,
            stats.duplicates
        );

        Ok((vocab, stats))
    }

    fn push(&mut self, raw: &str, seen: &mut HashSet<String>) -> Push {
        let word = raw.trim();
        if !is_clean_word(word) {
            return Push::Rejected;
        }
        if !seen.insert(word.to_string()) {
            return Push::Duplicate;
        }
        self.words.push(word.to_string());
        Push::Added
    }
}

enum Push {
    Added,
    Rejected,
    Duplicate,
}

#[cfg(test)]
impl Vocabulary {
    pub fn from_reader<R: Read>(rdr: R, delimiter: u8) -> Result<(Self, LoadStats), VocabularyError> {
        Self::collect(Self::reader_builder(delimiter).from_reader(rdr))
    }

    /// Build a vocabulary from already-split tokens, applying the same filters.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = Vocabulary::default();
        let mut seen = HashSet::new();
        for word in words {
            let _ = vocab.push(word.as_ref(), &mut seen);
        }
        vocab
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

/// A word is clean when it is non-empty and made only of alphabetic characters.
pub fn is_clean_word(word: &str) -> bool {
    !word.is_empty() && word.chars().all(char::is_alphabetic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(src: &str) -> (Vocabulary, LoadStats) {
        Vocabulary::from_reader(src.as_bytes(), DEFAULT_DELIMITER).unwrap()
    }

    #[test]
    fn test_filters_digits_and_symbols() {
        let (vocab, stats) = load("cat\nc4t\nkit-ten\nfeline\nhello world\nnaïve\n");

        assert_eq!(vocab.words(), ["cat", "feline", "naïve"]);
        assert_eq!(stats.rejected, 3);
    }

    #[test]
    fn test_deduplicates_keeping_first_occurrence() {
        let (vocab, stats) = load("dog\ncat\ndog\ncat\nbird\n");

        assert_eq!(vocab.words(), ["dog", "cat", "bird"]);
        assert_eq!(stats.duplicates, 2);
        assert_eq!(stats.rows, 5);
    }

    #[test]
    fn test_dedup_is_case_sensitive() {
        let (vocab, _) = load("Cat\ncat\n");
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn test_only_first_column_is_read() {
        let (vocab, _) = load("apple;fruit\nbanana;fruit;yellow\n");
        assert_eq!(vocab.words(), ["apple", "banana"]);
    }

    #[test]
    fn test_trims_surrounding_whitespace() {
        let (vocab, _) = load("  cat \n\tdog\n");
        assert_eq!(vocab.words(), ["cat", "dog"]);
    }

    #[test]
    fn test_custom_delimiter() {
        let (vocab, _) =
            Vocabulary::from_reader("apple,red\npear,green\n".as_bytes(), b',').unwrap();
        assert_eq!(vocab.words(), ["apple", "pear"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Vocabulary::load(Path::new("/nonexistent/words.csv"), DEFAULT_DELIMITER);
        assert!(matches!(result, Err(VocabularyError::Unreadable { .. })));
    }

    #[test]
    fn test_output_never_contains_unclean_words() {
        let src = "a1\nb_c\nd.e\nfine\n42\n\u{00e9}t\u{00e9}\n ok \nfine\n";
        let (vocab, _) = load(src);

        let mut seen = HashSet::new();
        for word in vocab.iter() {
            assert!(is_clean_word(word), "unclean word {word:?}");
            assert!(!word.chars().any(|c| c.is_ascii_digit()));
            assert!(seen.insert(word), "duplicate word {word:?}");
        }
    }

    #[test]
    fn test_invalid_utf8_row_is_rejected_not_fatal() {
        let src: &[u8] = b"cat\n\xff\xfeoops\ndog\n";
        let (vocab, stats) = Vocabulary::from_reader(src, DEFAULT_DELIMITER).unwrap();

        assert_eq!(vocab.words(), ["cat", "dog"]);
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn test_invalid_utf8_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.csv");
        std::fs::write(&path, b"owl;1\n\xc3\x28;2\nlark;3\n").unwrap();

        let (vocab, stats) = Vocabulary::load(&path, DEFAULT_DELIMITER).unwrap();
        assert_eq!(vocab.words(), ["owl", "lark"]);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn test_from_words_applies_filters() {
        let vocab = Vocabulary::from_words(["cat", "cat", "c4t", "dog"]);
        assert_eq!(vocab.words(), ["cat", "dog"]);
    }
}
