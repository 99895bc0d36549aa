use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

use ctxret_core::types::VectorSpace;

pub const CHUNK_ID: &str = "chunk_id";
pub const TEXT: &str = "text";
pub const CONTEXT: &str = "context";
pub const DISTANCE: &str = "_distance";

fn vector_field(name: &str, dim: i32) -> Field {
	Field::new(name, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true)
}

/// One row per chunk, carrying both vector spaces.
pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(CHUNK_ID, DataType::Int64, false),
		Field::new(TEXT, DataType::Utf8, false),
		Field::new(CONTEXT, DataType::Utf8, false),
		vector_field(VectorSpace::Embedding.as_str(), dim),
		vector_field(VectorSpace::ContextualEmbedding.as_str(), dim),
	]))
}
