//! Nearest-neighbor queries over a loaded word index.
//!
//! A `QueryEngine` can only be constructed from a successfully loaded index,
//! so a missing or corrupt artifact is reported once at startup instead of
//! on every query. The engine is cheap to clone and shares the index
//! read-only between callers.

use std::sync::Arc;

use serde::Serialize;

use crate::semantic::embeddings::{EmbeddingError, Encoder};
use crate::semantic::index::{IndexError, Neighbor, SimilarityIndex};
use crate::semantic::storage::{IndexStorage, IndexStorageError};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("word index unavailable: {0}")]
    IndexUnavailable(#[from] IndexStorageError),

    #[error("encoder produces {encoder} dimensions but index has {index}")]
    EncoderMismatch { encoder: usize, index: usize },

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

/// Neighbors found for one query string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub text: String,
    pub neighbors: Vec<Neighbor>,
}

impl QueryResult {
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.neighbors.iter().map(|n| n.word.as_str())
    }
}

#[derive(Clone)]
pub struct QueryEngine {
    encoder: Arc<dyn Encoder>,
    index: Arc<SimilarityIndex>,
}

impl QueryEngine {
    /// Wrap an already loaded index.
    pub fn new(encoder: Arc<dyn Encoder>, index: Arc<SimilarityIndex>) -> Result<Self, QueryError> {
        if encoder.dimensions() != index.dimensions() {
            return Err(QueryError::EncoderMismatch {
                encoder: encoder.dimensions(),
                index: index.dimensions(),
            });
        }

        Ok(Self { encoder, index })
    }

    /// Load the persisted index for `encoder`.
    ///
    /// Fails when the artifact is missing, corrupt or built with another model.
    pub fn open(encoder: Arc<dyn Encoder>, storage: &IndexStorage) -> Result<Self, QueryError> {
        let index = storage.load_for(&encoder.model_id(), encoder.dimensions())?;
        if index.is_empty() {
            log::warn!("word index at {} has no entries", storage.path().display());
        }

        log::info!(
            "loaded {} words from {} (model '{}')",
            index.len(),
            storage.path().display(),
            encoder.model_name()
        );

        Self::new(encoder, Arc::new(index))
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    pub fn model_name(&self) -> &str {
        self.encoder.model_name()
    }

    /// Return the `k` vocabulary entries closest to `text`.
    ///
    /// No filtering happens here; `text` itself is returned if it is indexed.
    pub fn query(&self, text: &str, k: usize) -> Result<QueryResult, QueryError> {
        let embedding = self.encoder.embed(text)?;
        let neighbors = self.index.search(&embedding, k)?;

        log::debug!("query '{}' -> {} neighbors", text, neighbors.len());

        Ok(QueryResult {
            text: text.to_string(),
            neighbors,
        })
    }
}
