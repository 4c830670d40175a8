// Embeddings module
// Document chunking and the embedding model boundary

pub mod chunking;

pub use chunking::{Chunk, ChunkingConfig, chunk_document, split_words};

use crate::Result;

/// A fixed-length vector produced by an embedding model
pub type EmbeddingVector = Vec<f32>;

/// Maps text to embedding vectors using a single fixed model.
///
/// Implementations return exactly one vector per input, in input order, all
/// of the same dimension. Identical input must produce identical output for
/// the lifetime of the model.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;
}
