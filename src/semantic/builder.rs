//! Offline index build: vocabulary -> embeddings -> published artifact.
//!
//! The whole index is embedded in memory before anything touches disk, and
//! the artifact is published with an atomic rename, so a failed build never
//! leaves a partial index behind.

use indicatif::{ProgressBar, ProgressStyle};

use crate::semantic::embeddings::{EmbeddingError, Encoder};
use crate::semantic::index::{IndexEntry, IndexError, SimilarityIndex};
use crate::semantic::storage::{IndexStorage, IndexStorageError};
use crate::vocab::Vocabulary;

/// Default number of words embedded per encoder call
pub const DEFAULT_BATCH_SIZE: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("vocabulary is empty, nothing to index")]
    EmptyVocabulary,

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("invalid embedding: {0}")]
    Index(#[from] IndexError),

    #[error("failed to publish index: {0}")]
    Storage(#[from] IndexStorageError),
}

/// Summary of a published build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub entries: usize,
    pub dimensions: usize,
    pub model: String,
}

pub struct IndexBuilder<'a> {
    encoder: &'a dyn Encoder,
    batch_size: usize,
    show_progress: bool,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(encoder: &'a dyn Encoder) -> Self {
        Self {
            encoder,
            batch_size: DEFAULT_BATCH_SIZE,
            show_progress: false,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Embed every vocabulary word and assemble the in-memory index.
    pub fn build(&self, vocab: &Vocabulary) -> Result<SimilarityIndex, BuildError> {
        if vocab.is_empty() {
            return Err(BuildError::EmptyVocabulary);
        }

        let dimensions = self.encoder.dimensions();
        let progress = self.progress_bar(vocab.len());
        let mut entries = Vec::with_capacity(vocab.len());

        for batch in vocab.words().chunks(self.batch_size) {
            let embeddings = self.encoder.embed_batch(batch)?;
            if embeddings.len() != batch.len() {
                return Err(EmbeddingError::EmbeddingFailed(format!(
                    "encoder returned {} vectors for {} words",
                    embeddings.len(),
                    batch.len()
                ))
                .into());
            }

            entries.extend(
                batch
                    .iter()
                    .zip(embeddings)
                    .map(|(word, embedding)| IndexEntry {
                        word: word.clone(),
                        embedding,
                    }),
            );
            progress.inc(batch.len() as u64);
        }

        progress.finish_and_clear();

        Ok(SimilarityIndex::from_entries(dimensions, entries)?)
    }

    /// Build the index and atomically publish it to `storage`.
    pub fn build_and_publish(
        &self,
        vocab: &Vocabulary,
        storage: &IndexStorage,
    ) -> Result<BuildReport, BuildError> {
        let index = self.build(vocab)?;

        storage.save(&index, &self.encoder.model_id())?;

        log::info!(
            "published {} entries ({} dimensions) to {}",
            index.len(),
            index.dimensions(),
            storage.path().display()
        );

        Ok(BuildReport {
            entries: index.len(),
            dimensions: index.dimensions(),
            model: self.encoder.model_name().to_string(),
        })
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} embedding [{bar:40}] {pos}/{len} ({eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}
