use anyhow::{anyhow, Context as _};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use ctxret_core::config::EmbeddingSettings;
use ctxret_core::error::{Error, Result};
use ctxret_core::traits::Embedder;
use ctxret_core::types::ChunkRecord;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

const DEFAULT_MODEL_DIR: &str = "models/all-MiniLM-L6-v2";

/// Sentence-transformers BERT encoder (all-MiniLM-L6-v2 by default) run with candle.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl BertEmbedder {
    pub fn new(model_dir: &Path, max_len: usize) -> anyhow::Result<Self> {
        let device = device::select_device();
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        tokenizer.with_padding(None);

        let config_path = model_dir.join("config.json");
        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        let dim = raw
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;
        let config: BertConfig = serde_json::from_value(raw)?;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        info!(dim, max_len, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len })
    }

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if emb.len() != self.dim {
            return Err(anyhow!("model produced {} values, expected {}", emb.len(), self.dim));
        }
        if start.elapsed().as_millis() > 100 { debug!(ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(emb)
    }
}

impl Embedder for BertEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed(&self, text: &str) -> Result<Vec<f32>> { self.embed_text(text).map_err(Error::embedding) }
}

fn load_weights(model_dir: &Path, device: &Device) -> anyhow::Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pytorch = model_dir.join("pytorch_model.bin");
    if pytorch.exists() {
        let weights = candle_core::pickle::read_all(&pytorch)?;
        return Ok(weights.into_iter().collect());
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

/// Deterministic bag-of-words hashing embedder for tests and offline runs.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim } }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        if self.dim == 0 {
            return Err(Error::InvalidConfig("embedding dimension must be positive".into()));
        }
        let mut v = vec![0f32; self.dim];
        let tokens = text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty());
        for token in tokens {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 0.5 + val;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let use_fake = settings.use_fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake {
        info!(dim = settings.dimension, "using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.dimension)));
    }
    let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
    let embedder = BertEmbedder::new(&model_dir, settings.max_len).map_err(Error::embedding)?;
    if embedder.dim() != settings.dimension {
        warn!(model = embedder.dim(), configured = settings.dimension, "model dimension differs from configuration");
        return Err(Error::DimensionMismatch { expected: settings.dimension, actual: embedder.dim() });
    }
    Ok(Arc::new(embedder))
}

pub fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = ctxret_core::config::expand_path(dir);
        if p.exists() { return Ok(p); }
        return Err(Error::NotFound(format!("model directory {}", p.display())));
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { info!(var, dir = %p.display(), "using model dir"); return Ok(p); }
        }
    }
    let default = Path::new(DEFAULT_MODEL_DIR);
    if default.exists() { return Ok(default.to_path_buf()); }
    Err(Error::NotFound(format!(
        "embedding model directory (set embedding.model_dir, APP_MODEL_DIR or place it at {})",
        DEFAULT_MODEL_DIR
    )))
}

/// Fill both vectors of `chunk`: `embedding` from its text and
/// `contextual_embedding` from context + text. The context must be attached.
pub fn embed_chunk(embedder: &dyn Embedder, chunk: &mut ChunkRecord) -> Result<()> {
    let contextual_input = chunk.contextualized_text()?;
    let embedding = embedder.embed(&chunk.text)?;
    let contextual_embedding = embedder.embed(&contextual_input)?;
    chunk.embedding = Some(embedding);
    chunk.contextual_embedding = Some(contextual_embedding);
    Ok(())
}
