//! Token-window chunking with overlap.

use std::path::Path;

use tokenizers::Tokenizer;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{ChunkId, ChunkRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 800, chunk_overlap: 200 }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let cfg = Self { chunk_size, chunk_overlap };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    fn step(&self) -> usize { self.chunk_size - self.chunk_overlap }
}

/// How a document is split into tokens before windowing.
pub enum Tokenization {
    /// Whitespace-separated words.
    Whitespace,
    /// Subword tokens of a Hugging Face tokenizer.
    Model(Box<Tokenizer>),
}

impl Tokenization {
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut tokenizer = Tokenizer::from_file(path)
            .map_err(|e| Error::InvalidConfig(format!("Failed to load tokenizer {}: {}", path.display(), e)))?;
        // Windows span the whole document, so the model's own limits must not apply.
        tokenizer
            .with_truncation(None)
            .map_err(|e| Error::InvalidConfig(format!("Failed to disable truncation: {}", e)))?;
        tokenizer.with_padding(None);
        Ok(Tokenization::Model(Box::new(tokenizer)))
    }

    /// Byte spans of each token in `text`.
    fn spans(&self, text: &str) -> Result<Vec<(usize, usize)>> {
        match self {
            Tokenization::Whitespace => Ok(word_spans(text)),
            Tokenization::Model(tokenizer) => {
                let encoding = tokenizer
                    .encode(text, false)
                    .map_err(|e| Error::InvalidConfig(format!("Tokenization failed: {}", e)))?;
                Ok(encoding
                    .get_offsets()
                    .iter()
                    .copied()
                    .filter(|(start, end)| end > start)
                    .collect())
            }
        }
    }
}

fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in text.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, i));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

pub struct Chunker {
    config: ChunkingConfig,
    tokenization: Tokenization,
}

impl Chunker {
    pub fn new(config: ChunkingConfig, tokenization: Tokenization) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, tokenization })
    }

    pub fn config(&self) -> ChunkingConfig { self.config }

    /// Split `text` into overlapping windows of `chunk_size` tokens. Ids start at 1.
    pub fn chunk(&self, text: &str) -> Result<Vec<ChunkRecord>> {
        let spans = self.tokenization.spans(text)?;
        if spans.is_empty() {
            return Ok(Vec::new());
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut next_id: ChunkId = 1;
        loop {
            let end = (start + self.config.chunk_size).min(spans.len());
            let from = floor_char_boundary(text, spans[start].0);
            let to = ceil_char_boundary(text, spans[end - 1].1);
            chunks.push(ChunkRecord::new(next_id, &text[from..to], start, end));
            next_id += 1;
            if end == spans.len() {
                break;
            }
            start += self.config.step();
        }
        debug!(tokens = spans.len(), chunks = chunks.len(), "chunked document");
        Ok(chunks)
    }
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
