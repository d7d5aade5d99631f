//! Word embedding index: build offline, query at serve time.
//!
//! # Architecture
//!
//! - `embeddings`: `Encoder` capability and the fastembed implementation
//! - `index`: immutable in-memory index with cosine similarity search
//! - `storage`: binary file I/O for the words.idx artifact
//! - `builder`: embeds a vocabulary and publishes the artifact atomically
//! - `engine`: loads the artifact once and answers nearest-neighbor queries

mod builder;
pub mod embeddings;
mod engine;
mod index;
mod storage;

pub use builder::{BuildError, BuildReport, IndexBuilder, DEFAULT_BATCH_SIZE};
pub use embeddings::{EmbeddingError, EmbeddingModel, Encoder};
pub use engine::{QueryEngine, QueryError, QueryResult};
pub use index::{IndexEntry, IndexError, Neighbor, SimilarityIndex};
pub use storage::{IndexHeader, IndexStorage, IndexStorageError};

/// Default embedding model name
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
