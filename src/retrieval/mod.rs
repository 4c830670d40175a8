//! Document retrieval.
//!
//! A [`DocumentIndex`] bundles the chunks of one uploaded document with the
//! vector index built from their embeddings. A [`Retriever`] owns the
//! currently active document index and swaps in a replacement only once it
//! has been completely built, so a failed upload never disturbs the index
//! that readers are using.


use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::embeddings::{Chunk, ChunkingConfig, Embedder, EmbeddingVector, chunk_document};
use crate::index::VectorIndex;
use crate::{RagError, Result};

/// Chunks of a single document together with their vector index
#[derive(Debug)]
pub struct DocumentIndex {
    id: Uuid,
    built_at: DateTime<Utc>,
    chunks: Vec<Chunk>,
    index: VectorIndex,
}

/// A retrieved chunk with its distance to the query
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub index: usize,
    pub text: String,
    pub distance: f32,
}

/// Outcome of a retrieval request
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Chunks ordered nearest first
    Chunks(Vec<RetrievedChunk>),
    /// No document has been indexed yet
    NoIndex,
}

impl Retrieval {
    /// Chunk texts in nearest-first order, or `None` when nothing is indexed
    #[inline]
    pub fn texts(&self) -> Option<Vec<&str>> {
        match self {
            Self::Chunks(chunks) => Some(chunks.iter().map(|c| c.text.as_str()).collect()),
            Self::NoIndex => None,
        }
    }
}

/// Summary of a successful index build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub id: Uuid,
    pub chunk_count: usize,
    pub dimension: usize,
}

/// Lifecycle state of a [`Retriever`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexState {
    Empty,
    Ready {
        id: Uuid,
        built_at: DateTime<Utc>,
        chunk_count: usize,
        dimension: usize,
    },
}

impl DocumentIndex {
    /// Chunk, embed and index a document.
    ///
    /// Either every step succeeds and a complete index is returned, or the
    /// first failure is returned and nothing is built.
    #[inline]
    pub fn build(text: &str, chunking: &ChunkingConfig, embedder: &dyn Embedder) -> Result<Self> {
        let started = Instant::now();

        let chunks = chunk_document(text, chunking)?;
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_aligned(embedder, &texts)?;
        let index = VectorIndex::build(&vectors)?;

        let document = Self {
            id: Uuid::new_v4(),
            built_at: Utc::now(),
            chunks,
            index,
        };

        debug!(
            "Built document index {} with {} chunks in {:?}",
            document.id,
            document.chunks.len(),
            started.elapsed()
        );

        Ok(document)
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    #[inline]
    pub fn report(&self) -> BuildReport {
        BuildReport {
            id: self.id,
            chunk_count: self.chunks.len(),
            dimension: self.index.dimension(),
        }
    }

    /// Find the `k` chunks nearest to `query`, nearest first.
    ///
    /// `k == 0` returns nothing without embedding the query.
    #[inline]
    pub fn retrieve_top_k(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = embed_aligned(embedder, &[query.to_string()])?
            .pop()
            .ok_or_else(|| RagError::Embedding("no vector returned for query".to_string()))?;

        let hits = self.index.search(&query_vector, k)?;

        hits.into_iter()
            .map(|hit| {
                let chunk = self.chunks.get(hit.chunk_index).ok_or_else(|| {
                    RagError::Other(anyhow::anyhow!(
                        "index returned unknown chunk {}",
                        hit.chunk_index
                    ))
                })?;
                Ok(RetrievedChunk {
                    index: chunk.index,
                    text: chunk.text.clone(),
                    distance: hit.distance,
                })
            })
            .collect()
    }
}

/// Embed `texts` and check that the embedder returned one vector per input
fn embed_aligned(embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
    let vectors = embedder.embed(texts)?;
    if vectors.len() != texts.len() {
        return Err(RagError::Embedding(format!(
            "expected {} embeddings, received {}",
            texts.len(),
            vectors.len()
        )));
    }
    Ok(vectors)
}

/// Owns the active document index and the embedding model used to query it
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    current: RwLock<Option<Arc<DocumentIndex>>>,
}

impl Retriever {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, chunking: ChunkingConfig) -> Self {
        Self {
            embedder,
            chunking,
            current: RwLock::new(None),
        }
    }

    /// Build an index for `text` and make it the active one.
    ///
    /// On failure the previously active index, if any, stays in place.
    #[inline]
    pub fn build_index(&self, text: &str) -> Result<BuildReport> {
        let document = DocumentIndex::build(text, &self.chunking, self.embedder.as_ref())?;
        let report = document.report();

        let previous = self.current.write().replace(Arc::new(document));

        match previous {
            Some(old) => info!(
                "Replaced document index {} with {} ({} chunks)",
                old.id(),
                report.id,
                report.chunk_count
            ),
            None => info!(
                "Document index {} ready ({} chunks, dimension {})",
                report.id, report.chunk_count, report.dimension
            ),
        }

        Ok(report)
    }

    /// Retrieve the `k` most relevant chunks from the active index
    #[inline]
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Retrieval> {
        let Some(document) = self.current() else {
            debug!("Retrieval requested before any document was indexed");
            return Ok(Retrieval::NoIndex);
        };

        let chunks = document.retrieve_top_k(query, k, self.embedder.as_ref())?;
        debug!(
            "Retrieved {} chunks from document index {}",
            chunks.len(),
            document.id()
        );

        Ok(Retrieval::Chunks(chunks))
    }

    /// The active document index, if one has been built
    #[inline]
    pub fn current(&self) -> Option<Arc<DocumentIndex>> {
        self.current.read().as_ref().map(Arc::clone)
    }

    #[inline]
    pub fn state(&self) -> IndexState {
        self.current().map_or(IndexState::Empty, |document| IndexState::Ready {
            id: document.id(),
            built_at: document.built_at(),
            chunk_count: document.chunks().len(),
            dimension: document.dimension(),
        })
    }
}
