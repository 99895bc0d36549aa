use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Candidate, ChunkRecord, VectorSpace};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Term-statistics search over `context` + `text` of each chunk.
pub trait LexicalIndex: Send + Sync {
    /// Index `chunks`, replacing anything indexed before.
    fn add_documents(&self, chunks: &[ChunkRecord]) -> Result<()>;

    /// Up to `k` candidates with a strictly positive score, best first.
    fn search(&self, query: &str, k: usize) -> Result<Vec<Candidate>>;
}

/// Nearest-neighbour search over the two vector spaces of each chunk.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;

    async fn add_chunks(&self, chunks: &[ChunkRecord]) -> Result<()>;

    /// Up to `k` candidates ranked by similarity in `space`, best first.
    async fn search(&self, query_vector: &[f32], k: usize, space: VectorSpace) -> Result<Vec<Candidate>>;
}

/// Produces the short situating context for one chunk of a document.
#[async_trait]
pub trait ContextGenerator: Send + Sync {
    async fn generate(&self, chunk: &ChunkRecord, document_text: &str) -> Result<String>;
}
