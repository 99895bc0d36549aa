use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use ctxret_core::config::{validate_weights, RetrievalSettings};
use ctxret_core::error::{Error, Result, Subsystem};
use ctxret_core::traits::{Embedder, LexicalIndex, VectorIndex};
use ctxret_core::types::{ChunkId, NormalizedCandidate, RetrievedChunk, VectorSpace};

use crate::normalize::normalize_candidates;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrieverConfig {
    pub vector_weight: f32,
    pub bm25_weight: f32,
    /// Each subsystem is asked for `overfetch_factor * top_k` candidates.
    pub overfetch_factor: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self { vector_weight: 0.5, bm25_weight: 0.5, overfetch_factor: 2 }
    }
}

impl RetrieverConfig {
    pub fn from_settings(settings: &RetrievalSettings) -> Self {
        Self {
            vector_weight: settings.vector_weight,
            bm25_weight: settings.bm25_weight,
            overfetch_factor: settings.overfetch_factor,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_weights(self.vector_weight, self.bm25_weight)?;
        if self.overfetch_factor == 0 {
            return Err(Error::InvalidConfig("overfetch_factor must be at least 1".into()));
        }
        Ok(())
    }
}

/// Dense + BM25 retrieval over the same chunk set, fused by weighted
/// min-max normalized scores.
pub struct HybridRetriever<L, V>
where
    L: LexicalIndex + 'static,
    V: VectorIndex,
{
    lexical: Arc<L>,
    vector: Arc<V>,
    embedder: Arc<dyn Embedder>,
    config: RetrieverConfig,
}

impl<L, V> HybridRetriever<L, V>
where
    L: LexicalIndex + 'static,
    V: VectorIndex,
{
    pub fn new(lexical: Arc<L>, vector: Arc<V>, embedder: Arc<dyn Embedder>, config: RetrieverConfig) -> Result<Self> {
        config.validate()?;
        if embedder.dim() != vector.dim() {
            return Err(Error::DimensionMismatch { expected: vector.dim(), actual: embedder.dim() });
        }
        Ok(Self { lexical, vector, embedder, config })
    }

    pub fn config(&self) -> RetrieverConfig { self.config }

    /// Top `top_k` chunks for `query`, searching the contextual vector space.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        self.retrieve_with_space(query, top_k, true).await
    }

    pub async fn retrieve_with_space(&self, query: &str, top_k: usize, use_contextual: bool) -> Result<Vec<RetrievedChunk>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let fetch_k = top_k.saturating_mul(self.config.overfetch_factor);
        let space = VectorSpace::from_contextual(use_contextual);

        let lexical = Arc::clone(&self.lexical);
        let lexical_query = query.to_string();
        let lexical_task = tokio::task::spawn_blocking(move || lexical.search(&lexical_query, fetch_k));
        let embedder = Arc::clone(&self.embedder);
        let embed_query = query.to_string();
        let vector_search = async {
            let query_vector = tokio::task::spawn_blocking(move || embedder.embed(&embed_query))
                .await
                .map_err(Error::embedding)??;
            self.vector.search(&query_vector, fetch_k, space).await
        };
        let (vector_hits, lexical_hits) = tokio::join!(vector_search, lexical_task);
        let vector_hits = vector_hits?;
        let lexical_hits = lexical_hits.map_err(|e| Error::search(Subsystem::Lexical, e))??;
        debug!(query, vector = vector_hits.len(), lexical = lexical_hits.len(), space = space.as_str(), "hybrid candidates");

        let merged = merge_candidates(normalize_candidates(vector_hits), normalize_candidates(lexical_hits), &self.config);
        Ok(rank(merged, top_k))
    }
}

/// Union both candidate lists by chunk id. A chunk missing from one list
/// scores 0.0 on that side.
pub fn merge_candidates(
    vector: Vec<NormalizedCandidate>,
    lexical: Vec<NormalizedCandidate>,
    config: &RetrieverConfig,
) -> Vec<RetrievedChunk> {
    let mut by_id: HashMap<ChunkId, RetrievedChunk> = HashMap::with_capacity(vector.len() + lexical.len());
    for n in vector {
        let c = n.candidate;
        by_id.insert(c.chunk_id, RetrievedChunk {
            chunk_id: c.chunk_id,
            text: c.text,
            context: c.context,
            vector_score: n.normalized_score,
            bm25_score: 0.0,
            combined_score: 0.0,
        });
    }
    for n in lexical {
        let c = n.candidate;
        by_id
            .entry(c.chunk_id)
            .and_modify(|r| r.bm25_score = n.normalized_score)
            .or_insert(RetrievedChunk {
                chunk_id: c.chunk_id,
                text: c.text,
                context: c.context,
                vector_score: 0.0,
                bm25_score: n.normalized_score,
                combined_score: 0.0,
            });
    }
    by_id
        .into_values()
        .map(|mut r| {
            r.combined_score = config.vector_weight * r.vector_score + config.bm25_weight * r.bm25_score;
            r
        })
        .collect()
}

/// Best `top_k` by combined score; equal scores keep ascending chunk id order.
pub fn rank(mut merged: Vec<RetrievedChunk>, top_k: usize) -> Vec<RetrievedChunk> {
    merged.sort_by(|a, b| match b.combined_score.total_cmp(&a.combined_score) {
        Ordering::Equal => a.chunk_id.cmp(&b.chunk_id),
        other => other,
    });
    merged.truncate(top_k);
    merged
}
