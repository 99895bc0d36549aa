//! ctxret-vector
//!
//! Dual-space chunk vectors in LanceDB: `embedding` of the raw text and
//! `contextual_embedding` of context + text, searched by cosine similarity.

pub mod schema;
pub mod search;
pub mod writer;

pub use writer::LanceVectorIndex;
