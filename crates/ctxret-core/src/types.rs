//! Domain types shared by the lexical and vector engines and the retriever.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier assigned by the chunker. Unique within a document and the join
/// key between the lexical and vector indices.
pub type ChunkId = u64;

/// A contiguous slice of a source document, the atomic retrieval unit.
///
/// - `chunk_id`: 1-based position assigned at chunking time
/// - `text`: the raw chunk text
/// - `start_token`/`end_token`: token window covered by the chunk
/// - `context`: situating summary, attached once after chunking
/// - `embedding`: dense vector of `text`
/// - `contextual_embedding`: dense vector of `context` + `text`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: ChunkId,
    pub text: String,
    pub start_token: usize,
    pub end_token: usize,
    pub context: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub contextual_embedding: Option<Vec<f32>>,
}

impl ChunkRecord {
    pub fn new(chunk_id: ChunkId, text: impl Into<String>, start_token: usize, end_token: usize) -> Self {
        Self {
            chunk_id,
            text: text.into(),
            start_token,
            end_token,
            context: None,
            embedding: None,
            contextual_embedding: None,
        }
    }

    /// Attach the situating context. A context that is already set is never
    /// replaced.
    pub fn attach_context(&mut self, context: impl Into<String>) -> Result<()> {
        if self.context.is_some() {
            return Err(Error::ContextAlreadySet(self.chunk_id));
        }
        self.context = Some(context.into());
        Ok(())
    }

    pub fn context(&self) -> Result<&str> {
        self.context
            .as_deref()
            .ok_or(Error::IncompleteChunk { chunk_id: self.chunk_id, field: "context" })
    }

    /// Context followed by the chunk text, the input for the contextual
    /// embedding and the lexical index.
    pub fn contextualized_text(&self) -> Result<String> {
        Ok(format!("{}\n\n{}", self.context()?, self.text))
    }

    pub fn embedding(&self) -> Result<&[f32]> {
        self.embedding
            .as_deref()
            .ok_or(Error::IncompleteChunk { chunk_id: self.chunk_id, field: "embedding" })
    }

    pub fn contextual_embedding(&self) -> Result<&[f32]> {
        self.contextual_embedding.as_deref().ok_or(Error::IncompleteChunk {
            chunk_id: self.chunk_id,
            field: "contextual_embedding",
        })
    }
}

/// Ordered chunks of one document, in chunker order.
#[derive(Debug, Clone, Default)]
pub struct ChunkStore {
    chunks: Vec<ChunkRecord>,
}

impl ChunkStore {
    pub fn new(chunks: Vec<ChunkRecord>) -> Self { Self { chunks } }

    pub fn chunks(&self) -> &[ChunkRecord] { &self.chunks }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn get(&self, chunk_id: ChunkId) -> Option<&ChunkRecord> {
        self.chunks.iter().find(|c| c.chunk_id == chunk_id)
    }

    pub fn total_chars(&self) -> usize {
        self.chunks.iter().map(|c| c.text.chars().count()).sum()
    }

    /// Average chunk length in characters; 0 for an empty store.
    pub fn average_chunk_chars(&self) -> usize {
        if self.chunks.is_empty() {
            0
        } else {
            self.total_chars() / self.chunks.len()
        }
    }
}

/// Which of the two vector spaces a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorSpace {
    Embedding,
    ContextualEmbedding,
}

impl VectorSpace {
    pub fn from_contextual(use_contextual: bool) -> Self {
        if use_contextual {
            VectorSpace::ContextualEmbedding
        } else {
            VectorSpace::Embedding
        }
    }

    /// Column / vector name in the backing store.
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorSpace::Embedding => "embedding",
            VectorSpace::ContextualEmbedding => "contextual_embedding",
        }
    }
}

/// One hit from a single subsystem.
///
/// `score` is engine-native: unbounded non-negative for BM25, cosine
/// similarity for vectors. Higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub chunk_id: ChunkId,
    pub text: String,
    pub context: String,
    pub score: f32,
}

/// A candidate with its score min-max scaled against the rest of its list.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCandidate {
    pub candidate: Candidate,
    pub normalized_score: f32,
}

/// A merged hybrid result.
///
/// `vector_score` and `bm25_score` are normalized scores, `0.0` when the
/// chunk was absent from that subsystem's candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: ChunkId,
    pub text: String,
    pub context: String,
    pub vector_score: f32,
    pub bm25_score: f32,
    pub combined_score: f32,
}
