
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{RagError, Result};

/// A window of consecutive words taken from a source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk within the document's chunk sequence
    pub index: usize,
    /// The chunk's words joined by single spaces
    pub text: String,
}

/// Configuration for word-window chunking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Number of words per chunk
    pub chunk_size: usize,
    /// Number of words shared between neighbouring chunks
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 300,
            overlap: 50,
        }
    }
}

impl ChunkingConfig {
    /// Distance in words between the starts of two neighbouring chunks
    #[inline]
    pub fn stride(&self) -> Result<usize> {
        if self.chunk_size == 0 || self.overlap >= self.chunk_size {
            return Err(RagError::InvalidChunking {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(self.chunk_size - self.overlap)
    }
}

/// Split document text into overlapping word windows.
///
/// Words are separated by any whitespace. Each chunk holds up to
/// `chunk_size` words and starts `chunk_size - overlap` words after the
/// previous one. Splitting stops once a chunk reaches the final word, so the
/// last chunk may be shorter than `chunk_size`. Text without words yields no
/// chunks.
#[inline]
pub fn split_words(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    let stride = ChunkingConfig {
        chunk_size,
        overlap,
    }
    .stride()?;

    let words = text.split_whitespace().collect::<Vec<_>>();
    let mut chunks = Vec::with_capacity(words.len().div_ceil(stride));
    let mut start = 0;

    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        chunks.push(Chunk {
            index: chunks.len(),
            text: words[start..end].join(" "),
        });

        if end == words.len() {
            break;
        }
        start += stride;
    }

    debug!(
        "Split {} words into {} chunks (size {}, overlap {})",
        words.len(),
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}

/// Chunk a document using the configured window size and overlap
#[inline]
pub fn chunk_document(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    split_words(text, config.chunk_size, config.overlap)
}
