//! ctxret-context
//!
//! Situating context for chunks: a language-model backed generator, an
//! offline mock, and the helper that fills a whole chunk list.

use std::sync::Arc;

use tracing::info;

use ctxret_core::config::{ContextProvider, ContextSettings};
use ctxret_core::error::Result;
use ctxret_core::traits::ContextGenerator;
use ctxret_core::types::ChunkRecord;

pub mod anthropic;
pub mod mock;

pub use anthropic::{AnthropicConfig, AnthropicContextGenerator};
pub use mock::MockContextGenerator;

/// Prompt asking the model for a succinct context situating `chunk_text` in `document_text`.
pub fn build_prompt(document_text: &str, chunk_text: &str) -> String {
    format!(
        "<document>
{document_text}
</document>

Here is the chunk we want to situate within the whole document:
<chunk>
{chunk_text}
</chunk>

Please give a short succinct context to situate this chunk within the overall document for the purposes of improving search retrieval of the chunk. Answer only with the succinct context and nothing else."
    )
}

pub fn generator_from_settings(settings: &ContextSettings) -> Result<Arc<dyn ContextGenerator>> {
    match settings.provider {
        ContextProvider::Mock => Ok(Arc::new(MockContextGenerator)),
        ContextProvider::Anthropic => Ok(Arc::new(AnthropicContextGenerator::from_settings(settings)?)),
    }
}

/// Attach a generated context to every chunk, in order. Stops at the first failure.
pub async fn contextualize(chunks: &mut [ChunkRecord], document_text: &str, generator: &dyn ContextGenerator) -> Result<()> {
    for chunk in chunks.iter_mut() {
        let context = generator.generate(chunk, document_text).await?;
        chunk.attach_context(context)?;
    }
    info!(chunks = chunks.len(), "contextualized chunks");
    Ok(())
}
