use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Docuseek server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime used for embeddings and generation.
    pub ollama_url: Option<String>,
    /// Reranking provider used to score (query, passage) pairs.
    pub rerank_provider: RerankProvider,
    /// Base URL of the external reranker service (`RERANK_PROVIDER=http`).
    pub reranker_url: Option<String>,
    /// Generation provider used for summaries, categories, and answers.
    pub generation_provider: GenerationProvider,
    /// Generation model identifier passed to the provider.
    pub generation_model: Option<String>,
    /// Chunking policy applied during ingestion.
    pub chunking_policy: ChunkingPolicy,
    /// Optional override for the automatic chunk size selection.
    pub chunk_size: Option<usize>,
    /// Optional override for the sentence-policy word overlap.
    pub chunk_overlap: Option<usize>,
    /// Neighbors retrieved per expanded query during search.
    pub search_k_per_expansion: usize,
    /// Number of reranked chunks kept for answer synthesis.
    pub search_final_k: usize,
    /// Upper bound accepted for caller-supplied `k` values.
    pub search_max_k: usize,
    /// Word budget applied to generated document summaries.
    pub summary_max_words: usize,
    /// Path of the JSON document store.
    pub document_store_path: Option<String>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends for the processing pipeline.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic in-process hashing encoder.
    Hash,
}

/// Supported reranking backends.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerankProvider {
    /// External cross-encoder service speaking the TEI `/rerank` protocol.
    Http,
    /// Deterministic in-process lexical-overlap scorer.
    Lexical,
}

/// Supported text-generation backends.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Generation disabled; deterministic fallbacks apply.
    None,
    /// Local Ollama runtime.
    Ollama,
}

/// Chunking policies selectable per deployment.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingPolicy {
    /// Greedy paragraph packing bounded by character count, no overlap.
    Paragraph,
    /// Sentence packing bounded by word count with a word overlap.
    Sentence,
}

const DEFAULT_K_PER_EXPANSION: usize = 20;
const DEFAULT_FINAL_K: usize = 5;
const DEFAULT_MAX_K: usize = 20;
const DEFAULT_SUMMARY_MAX_WORDS: usize = 120;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            embedding_provider: load_env("EMBEDDING_PROVIDER")?.parse().map_err(|()| {
                ConfigError::InvalidValue("Invalid EMBEDDING_PROVIDER".to_string())
            })?,
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?.parse().map_err(|_| {
                ConfigError::InvalidValue("Invalid EMBEDDING_DIMENSION".to_string())
            })?,
            ollama_url: load_env_optional("OLLAMA_URL"),
            rerank_provider: load_env_optional("RERANK_PROVIDER")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("RERANK_PROVIDER".to_string()))
                })
                .transpose()?
                .unwrap_or(RerankProvider::Lexical),
            reranker_url: load_env_optional("RERANKER_URL"),
            generation_provider: load_env_optional("GENERATION_PROVIDER")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("GENERATION_PROVIDER".to_string()))
                })
                .transpose()?
                .unwrap_or(GenerationProvider::None),
            generation_model: load_env_optional("GENERATION_MODEL"),
            chunking_policy: load_env_optional("CHUNKING_POLICY")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("CHUNKING_POLICY".to_string()))
                })
                .transpose()?
                .unwrap_or(ChunkingPolicy::Paragraph),
            chunk_size: parse_optional("CHUNK_SIZE")?,
            chunk_overlap: parse_optional("CHUNK_OVERLAP")?,
            search_k_per_expansion: parse_optional("SEARCH_K_PER_EXPANSION")?
                .unwrap_or(DEFAULT_K_PER_EXPANSION),
            search_final_k: parse_optional("SEARCH_FINAL_K")?.unwrap_or(DEFAULT_FINAL_K),
            search_max_k: parse_optional("SEARCH_MAX_K")?.unwrap_or(DEFAULT_MAX_K),
            summary_max_words: parse_optional("SUMMARY_MAX_WORDS")?
                .unwrap_or(DEFAULT_SUMMARY_MAX_WORDS),
            document_store_path: load_env_optional("DOCUMENT_STORE_PATH"),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional(key: &str) -> Result<Option<usize>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for RerankProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "lexical" => Ok(Self::Lexical),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for GenerationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for ChunkingPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paragraph" => Ok(Self::Paragraph),
            "sentence" => Ok(Self::Sentence),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        embedding_provider = ?config.embedding_provider,
        rerank_provider = ?config.rerank_provider,
        generation_provider = ?config.generation_provider,
        chunking_policy = ?config.chunking_policy,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
