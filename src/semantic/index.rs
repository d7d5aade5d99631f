//! Immutable word index with exact cosine similarity search.
//!
//! Entries keep their insertion order, which is also the tie-break order for
//! equal scores. Embeddings are normalized once on construction so a search
//! is a dot product per entry.

use std::cmp::Ordering;
use std::collections::HashSet;

/// A vocabulary word together with the embedding computed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub word: String,
    pub embedding: Vec<f32>,
}

/// A nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Neighbor {
    pub word: String,
    /// Cosine similarity in [-1.0, 1.0]
    pub score: f32,
}

/// Read-only similarity index over the vocabulary.
#[derive(Debug)]
pub struct SimilarityIndex {
    entries: Vec<IndexEntry>,
    /// Unit-length copies of the entry embeddings, same order as `entries`.
    unit: Vec<Vec<f32>>,
    dimensions: usize,
}

impl SimilarityIndex {
    /// Build an index from entries in insertion order.
    ///
    /// Fails on dimension mismatch, zero-norm vectors and repeated words.
    pub fn from_entries(dimensions: usize, entries: Vec<IndexEntry>) -> Result<Self, IndexError> {
        let mut seen = HashSet::with_capacity(entries.len());
        let mut unit = Vec::with_capacity(entries.len());

        for entry in &entries {
            if entry.embedding.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: dimensions,
                    got: entry.embedding.len(),
                });
            }
            if !seen.insert(entry.word.as_str()) {
                return Err(IndexError::DuplicateEntry(entry.word.clone()));
            }
            unit.push(normalized(&entry.embedding).ok_or(IndexError::ZeroNormVector)?);
        }

        Ok(Self {
            entries,
            unit,
            dimensions,
        })
    }

    /// Get the expected embedding dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    /// Return the `k` entries most similar to `query`.
    ///
    /// Results are sorted by score (highest first); equal scores keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let query = normalized(query).ok_or(IndexError::ZeroNormVector)?;

        if k == 0 {
            return Ok(vec![]);
        }

        let mut scored: Vec<(usize, f32)> = self
            .unit
            .iter()
            .enumerate()
            .map(|(position, target)| (position, dot(&query, target)))
            .collect();

        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            ord => ord,
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| Neighbor {
                word: self.entries[position].word.clone(),
                score,
            })
            .collect())
    }
}

#[cfg(test)]
impl SimilarityIndex {
    pub fn contains(&self, word: &str) -> bool {
        self.entries.iter().any(|entry| entry.word == word)
    }
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cannot store or search with zero-norm vector")]
    ZeroNormVector,

    #[error("Word '{0}' appears more than once")]
    DuplicateEntry(String),
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn normalized(v: &[f32]) -> Option<Vec<f32>> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm < f32::EPSILON {
        return None;
    }
    Some(v.iter().map(|x| x / norm).collect())
}
