use async_trait::async_trait;

use ctxret_core::error::Result;
use ctxret_core::traits::ContextGenerator;
use ctxret_core::types::ChunkRecord;

/// Offline generator returning a fixed sentence per chunk.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockContextGenerator;

#[async_trait]
impl ContextGenerator for MockContextGenerator {
    async fn generate(&self, chunk: &ChunkRecord, _document_text: &str) -> Result<String> {
        Ok(format!("This is chunk {} from the document discussing various topics.", chunk.chunk_id))
    }
}
