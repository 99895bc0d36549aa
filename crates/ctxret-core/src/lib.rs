#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use chunker::{Chunker, ChunkingConfig, Tokenization};
pub use error::{Error, Result, Subsystem};
pub use traits::{ContextGenerator, Embedder, LexicalIndex, VectorIndex};
pub use types::{Candidate, ChunkId, ChunkRecord, ChunkStore, NormalizedCandidate, RetrievedChunk, VectorSpace};
