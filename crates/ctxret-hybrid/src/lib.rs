//! ctxret-hybrid
//!
//! Hybrid retrieval: dense vector search and BM25 run side by side, each
//! candidate list is min-max normalized, and the union is ranked by a
//! weighted sum. Also hosts the indexing pipeline that feeds both indices.

pub mod normalize;
pub mod pipeline;
pub mod retriever;

pub use normalize::{min_max_normalize, normalize_candidates};
pub use pipeline::IndexingPipeline;
pub use retriever::{merge_candidates, rank, HybridRetriever, RetrieverConfig};
