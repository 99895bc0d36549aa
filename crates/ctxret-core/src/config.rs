//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_RETRIEVAL__TOP_K=5`). Provides helpers to expand `~` and `${VAR}` and
//! to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Extract and validate the typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub context: ContextSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub tokenizer_path: Option<String>,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 800, chunk_overlap: 200, tokenizer_path: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub dimension: usize,
    pub max_len: usize,
    pub use_fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: None, dimension: 384, max_len: 256, use_fake: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub vector_weight: f32,
    pub bm25_weight: f32,
    pub overfetch_factor: usize,
    pub use_contextual: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3, vector_weight: 0.5, bm25_weight: 0.5, overfetch_factor: 2, use_contextual: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextProvider {
    Mock,
    Anthropic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    pub provider: ContextProvider,
    pub model: String,
    pub max_tokens: u32,
    pub api_url: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            provider: ContextProvider::Mock,
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: 200,
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub lancedb_dir: String,
    pub collection: String,
    pub tantivy_dir: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            lancedb_dir: "./data/lancedb".to_string(),
            collection: "contextual_retrieval".to_string(),
            tantivy_dir: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be positive".into()));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".into()));
        }
        if self.embedding.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.max_len must be positive".into()));
        }
        let r = &self.retrieval;
        validate_weights(r.vector_weight, r.bm25_weight)?;
        if r.overfetch_factor == 0 {
            return Err(Error::InvalidConfig("retrieval.overfetch_factor must be at least 1".into()));
        }
        Ok(())
    }

    pub fn lancedb_dir(&self) -> PathBuf { expand_path(&self.storage.lancedb_dir) }

    pub fn tantivy_dir(&self) -> Option<PathBuf> {
        self.storage.tantivy_dir.as_deref().map(expand_path)
    }
}

/// Weights must be finite, non-negative and not both zero.
pub fn validate_weights(vector_weight: f32, bm25_weight: f32) -> Result<()> {
    for (name, w) in [("vector_weight", vector_weight), ("bm25_weight", bm25_weight)] {
        if !w.is_finite() || w < 0.0 {
            return Err(Error::InvalidConfig(format!("{} must be a finite non-negative number, got {}", name, w)));
        }
    }
    if vector_weight == 0.0 && bm25_weight == 0.0 {
        return Err(Error::InvalidConfig("vector_weight and bm25_weight cannot both be zero".into()));
    }
    Ok(())
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
