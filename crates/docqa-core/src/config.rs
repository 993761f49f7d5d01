//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_RETRIEVAL__TOP_K`).
//! Paths in the settings have `~` and `${VAR}` expanded.

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
    env_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_for_env(None)
    }

    pub fn load_for_env(env_name: Option<&str>) -> anyhow::Result<Self> {
        let env_name = match env_name {
            Some(name) => name.to_string(),
            None => env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string()),
        };

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => tracing::warn!(env = other, "unknown RUST_ENV, using config.toml only"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, env_name })
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    /// Typed, validated settings with paths expanded.
    pub fn settings(&self) -> anyhow::Result<AppConfig> {
        let mut settings: AppConfig = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract configuration: {}", e))?;
        settings.expand_paths();
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub history: HistoryConfig,
    pub evaluation: EvaluationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub pdf_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { pdf_dir: PathBuf::from("data") }
    }
}

/// Word-window chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 700, overlap: 150 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::invalid_config("chunking.chunk_size must be greater than 0"));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::invalid_config(format!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// all-MiniLM-L6-v2 (BERT) loaded from `model_dir`.
    Minilm,
    /// Hashed bag-of-words vectors; no model files needed.
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub model_dir: PathBuf,
    pub dimension: usize,
    pub max_len: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Minilm,
            model_dir: PathBuf::from("models/all-MiniLM-L6-v2"),
            dimension: 384,
            max_len: 256,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub path: PathBuf,
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("embeddings/lancedb"), collection: "documents".to_string() }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4, max_context_chars: 3000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub context_window: usize,
    pub max_tokens: usize,
    pub stop: Vec<String>,
    /// 0.0 selects greedy decoding.
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub repeat_penalty: f32,
    pub repeat_last_n: usize,
    pub seed: u64,
    pub timeout_secs: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/mistral-7b.Q4_0.gguf"),
            tokenizer_path: PathBuf::from("models/tokenizer.json"),
            context_window: 2048,
            max_tokens: 512,
            stop: vec!["</s>".to_string(), "Context:".to_string(), "Question:".to_string()],
            temperature: 0.0,
            top_p: None,
            repeat_penalty: 1.1,
            repeat_last_n: 64,
            seed: 299_792_458,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("chat_logs") }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub threshold: f32,
    pub cases_file: Option<PathBuf>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self { threshold: 0.75, cases_file: None }
    }
}

impl AppConfig {
    /// Startup checks. Every violation is a configuration error.
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.embedding.dimension == 0 {
            return Err(Error::invalid_config("embedding.dimension must be greater than 0"));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::invalid_config("embedding.batch_size must be greater than 0"));
        }
        if self.index.collection.trim().is_empty() {
            return Err(Error::invalid_config("index.collection must not be empty"));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::invalid_config("retrieval.top_k must be greater than 0"));
        }
        if self.generation.max_tokens == 0 {
            return Err(Error::invalid_config("generation.max_tokens must be greater than 0"));
        }
        if self.generation.max_tokens >= self.generation.context_window {
            return Err(Error::invalid_config(format!(
                "generation.max_tokens ({}) must be smaller than generation.context_window ({})",
                self.generation.max_tokens, self.generation.context_window
            )));
        }
        if !(0.0..=1.0).contains(&self.evaluation.threshold) {
            return Err(Error::invalid_config("evaluation.threshold must be within [0, 1]"));
        }
        Ok(())
    }

    fn expand_paths(&mut self) {
        let expand = |p: &Path| expand_path(p.to_string_lossy());
        self.data.pdf_dir = expand(&self.data.pdf_dir);
        self.embedding.model_dir = expand(&self.embedding.model_dir);
        self.index.path = expand(&self.index.path);
        self.generation.model_path = expand(&self.generation.model_path);
        self.generation.tokenizer_path = expand(&self.generation.tokenizer_path);
        self.history.dir = expand(&self.history.dir);
        self.evaluation.cases_file = self.evaluation.cases_file.as_deref().map(expand);
    }
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
