//! Exact nearest-neighbour index over chunk embeddings.
//!
//! Vectors are stored row-major in one contiguous buffer and searched with a
//! full L2 scan. Document-scale indexes hold hundreds of vectors, where a
//! linear scan is exact and cheap.

#[cfg(test)]
mod tests;

use tracing::debug;

use crate::embeddings::EmbeddingVector;
use crate::{RagError, Result};

/// A single search result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Index of the matching chunk in insertion order
    pub chunk_index: usize,
    /// Euclidean distance between the query and the chunk vector
    pub distance: f32,
}

/// Immutable in-memory vector index, built once from a full set of vectors
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    /// Build an index over `vectors`; the first vector fixes the dimension.
    ///
    /// Fails with [`RagError::DimensionMismatch`] when any vector differs in
    /// length from the first one.
    #[inline]
    pub fn build(vectors: &[EmbeddingVector]) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Err(RagError::EmptyDocument);
        };

        let dimension = first.len();
        if dimension == 0 {
            return Err(RagError::Embedding(
                "embedding vectors must not be empty".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(dimension * vectors.len());
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    found: vector.len(),
                    position,
                });
            }
            if !is_finite(vector) {
                return Err(RagError::Embedding(format!(
                    "vector {position} contains a non-finite component"
                )));
            }
            data.extend_from_slice(vector);
        }

        debug!(
            "Built vector index with {} vectors of dimension {}",
            vectors.len(),
            dimension
        );

        Ok(Self { dimension, data })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return up to `k` vectors closest to `query`, nearest first.
    ///
    /// Equal distances keep insertion order. Asking for more results than the
    /// index holds returns every vector.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                found: query.len(),
                position: 0,
            });
        }

        if !is_finite(query) {
            return Err(RagError::Embedding(
                "query vector contains a non-finite component".to_string(),
            ));
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(chunk_index, vector)| SearchHit {
                chunk_index,
                distance: l2_distance(query, vector),
            })
            .collect::<Vec<_>>();

        // sort_by is stable, so ties stay in insertion order
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);

        Ok(hits)
    }
}

fn is_finite(vector: &[f32]) -> bool {
    vector.iter().all(|component| component.is_finite())
}

/// Euclidean distance between two equal-length vectors
#[inline]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
