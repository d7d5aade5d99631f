//! Deterministic encoder and a small cat-themed vocabulary.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::compose::Composer;
use crate::semantic::{EmbeddingError, Encoder, IndexBuilder, IndexStorage, QueryEngine};
use crate::vocab::Vocabulary;

pub const FIXTURE_MODEL: &str = "fixture-3d";

/// Vocabulary order is the tie-break order.
pub const CAT_WORDS: [(&str, [f32; 3]); 6] = [
    ("cat", [1.0, 0.0, 0.0]),
    ("kitten", [0.95, 0.3, 0.0]),
    ("feline", [0.9, 0.4, 0.0]),
    ("dog", [0.6, 0.8, 0.0]),
    ("tabby", [0.85, 0.5, 0.0]),
    ("puppy", [0.3, 0.9, 0.1]),
];

/// Looks words up in a fixed table; anything else fails to embed.
pub struct FixtureEncoder {
    name: String,
    vectors: HashMap<String, Vec<f32>>,
    fail_after: Option<usize>,
    calls: AtomicUsize,
}

impl FixtureEncoder {
    pub fn cats() -> Self {
        Self::with_name(FIXTURE_MODEL)
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vectors: CAT_WORDS
                .iter()
                .map(|(word, v)| (word.to_string(), v.to_vec()))
                .collect(),
            fail_after: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every embed call after the first `calls` fails.
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }
}

impl Encoder for FixtureEncoder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| call >= limit) {
            return Err(EmbeddingError::EmbeddingFailed("encoder went away".to_string()));
        }

        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed(format!("no fixture vector for '{text}'")))
    }
}

pub fn cat_vocabulary() -> Vocabulary {
    Vocabulary::from_words(CAT_WORDS.iter().map(|(word, _)| *word))
}

/// Build and publish the cat index under `dir`, then open an engine on it.
pub fn cat_engine(dir: &Path) -> QueryEngine {
    let encoder = Arc::new(FixtureEncoder::cats());
    let storage = IndexStorage::new(dir.join("words.idx"));

    IndexBuilder::new(encoder.as_ref())
        .batch_size(4)
        .build_and_publish(&cat_vocabulary(), &storage)
        .unwrap();

    QueryEngine::open(encoder, &storage).unwrap()
}

pub fn cat_composer(dir: &Path) -> Composer {
    Composer::new(cat_engine(dir))
}
