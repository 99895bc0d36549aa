//! ctxret-text
//!
//! BM25 lexical search over chunk context and text, backed by Tantivy.

pub mod index;
pub mod tantivy_utils;

pub use index::TantivyLexicalIndex;
