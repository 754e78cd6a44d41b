//! Configuration types for driftlog.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DriftlogError, Result};
use crate::traits::ChunkConfig;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftlogConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding provider configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval and fusion configuration.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Reranking provider configuration.
    #[serde(default)]
    pub rerank: RerankConfig,

    /// Answer generation provider configuration.
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: 30000,
        }
    }
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of an OpenAI-compatible embeddings API.
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Texts per embeddings request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_openai_endpoint(),
            model: default_embedding_model(),
            api_key_env: default_embedding_key_env(),
            dimension: 1536,
            batch_size: 64,
            timeout_secs: 60,
        }
    }
}

/// Chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Character overlap between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 200,
        }
    }
}

impl From<&ChunkingConfig> for ChunkConfig {
    fn from(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates requested from the dense path.
    #[serde(default = "default_retrieval_top_k")]
    pub dense_top_k: usize,

    /// Candidates requested from the lexical path.
    #[serde(default = "default_retrieval_top_k")]
    pub sparse_top_k: usize,

    /// RRF damping constant k.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,

    /// Candidates kept after fusion.
    #[serde(default = "default_retrieval_top_k")]
    pub fused_top_k: usize,

    /// Chunks kept after reranking and shown to the generator.
    #[serde(default = "default_rerank_top_n")]
    pub rerank_top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            dense_top_k: 20,
            sparse_top_k: 20,
            rrf_k: 60,
            fused_top_k: 20,
            rerank_top_n: 5,
        }
    }
}

/// Reranking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    #[serde(default = "default_rerank_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_rerank_model")]
    pub model: String,

    #[serde(default = "default_rerank_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rerank_endpoint(),
            model: default_rerank_model(),
            api_key_env: default_rerank_key_env(),
            timeout_secs: 60,
        }
    }
}

/// Generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_generation_key_env")]
    pub api_key_env: String,

    /// Output budget in tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_generation_endpoint(),
            model: default_generation_model(),
            api_key_env: default_generation_key_env(),
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

// Default value functions

fn default_busy_timeout() -> u32 {
    30000
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_dimension() -> usize {
    1536
}

fn default_batch_size() -> usize {
    64
}

fn default_timeout() -> u64 {
    60
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_retrieval_top_k() -> usize {
    20
}

fn default_rrf_k() -> u32 {
    60
}

fn default_rerank_top_n() -> usize {
    5
}

fn default_rerank_endpoint() -> String {
    "https://api.cohere.com".to_string()
}

fn default_rerank_model() -> String {
    "rerank-v3.5".to_string()
}

fn default_rerank_key_env() -> String {
    "CO_API_KEY".to_string()
}

fn default_generation_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_generation_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_generation_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("driftlog")
        .join("driftlog.db")
}

impl DriftlogConfig {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| DriftlogError::config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("driftlog").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("driftlog.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        // Return defaults
        Ok(Self::default())
    }
}

/// Read an API key from the environment variable named in a config section.
pub fn api_key_from_env(var: &str) -> Result<String> {
    std::env::var(var)
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| DriftlogError::config(format!("Environment variable {} is not set", var)))
}
