use std::fmt;

use thiserror::Error;

use crate::types::ChunkId;

/// Retrieval subsystem that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Lexical,
    Vector,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Lexical => f.write_str("lexical"),
            Subsystem::Vector => f.write_str("vector"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("The {0} index has no documents; add documents before searching")]
    UninitializedIndex(Subsystem),

    #[error("{subsystem} search failed: {source}")]
    Search {
        subsystem: Subsystem,
        #[source]
        source: anyhow::Error,
    },

    #[error("Embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Chunk {chunk_id} is missing `{field}`")]
    IncompleteChunk { chunk_id: ChunkId, field: &'static str },

    #[error("Chunk {0} already has a context attached")]
    ContextAlreadySet(ChunkId),

    #[error("Context generation failed: {0}")]
    ContextGeneration(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a backend failure from one of the search subsystems.
    pub fn search<E>(subsystem: Subsystem, err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Error::Search { subsystem, source: err.into() }
    }

    pub fn embedding<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Error::Embedding(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
