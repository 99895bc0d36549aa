use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use ctxret_context::contextualize;
use ctxret_core::chunker::Chunker;
use ctxret_core::error::Result;
use ctxret_core::traits::{ContextGenerator, Embedder, LexicalIndex, VectorIndex};
use ctxret_core::types::ChunkStore;
use ctxret_embed::embed_chunk;

/// One-shot indexing of a document: chunk, contextualize, embed both
/// spaces, then store into the vector and lexical indices.
pub struct IndexingPipeline<L, V>
where
    L: LexicalIndex,
    V: VectorIndex,
{
    chunker: Chunker,
    generator: Arc<dyn ContextGenerator>,
    embedder: Arc<dyn Embedder>,
    lexical: Arc<L>,
    vector: Arc<V>,
    show_progress: bool,
}

impl<L, V> IndexingPipeline<L, V>
where
    L: LexicalIndex,
    V: VectorIndex,
{
    pub fn new(
        chunker: Chunker,
        generator: Arc<dyn ContextGenerator>,
        embedder: Arc<dyn Embedder>,
        lexical: Arc<L>,
        vector: Arc<V>,
    ) -> Self {
        Self { chunker, generator, embedder, lexical, vector, show_progress: false }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }

    pub async fn run(&self, document_text: &str) -> Result<ChunkStore> {
        let mut chunks = self.chunker.chunk(document_text)?;
        info!(chunks = chunks.len(), "document chunked");

        let pb = self.progress_bar(chunks.len());
        pb.set_message("generating contexts");
        contextualize(&mut chunks, document_text, self.generator.as_ref()).await?;

        pb.set_message("embedding");
        for chunk in chunks.iter_mut() {
            embed_chunk(self.embedder.as_ref(), chunk)?;
            pb.inc(1);
        }

        pb.set_message("storing");
        self.vector.add_chunks(&chunks).await?;
        self.lexical.add_documents(&chunks)?;
        pb.finish_with_message("indexed");

        let store = ChunkStore::new(chunks);
        info!(chunks = store.len(), avg_chars = store.average_chunk_chars(), "indexing complete");
        Ok(store)
    }
}
