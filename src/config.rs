use thiserror::Error;

use crate::retrieval::chunking::ChunkingConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Service configuration, loaded once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,

    // Vector store
    pub collection_name: String,

    // Embeddings
    pub embedding_engine: String,
    pub embedding_model: String,
    pub openai_api_key: Option<String>,
    pub openai_api_base_url: String,

    // Chunking
    pub chunking: ChunkingConfig,

    // Generation
    pub google_api_key: String,
    pub gemini_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_context_tokens: usize,

    // Documents
    pub docs_file_path: String,

    // External calls
    pub external_request_timeout_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{} has an unparsable value: {}", key, value))),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let google_api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GOOGLE_API_KEY".to_string()))?;

        let chunking = ChunkingConfig {
            chunk_size: parse_env("CHUNK_SIZE", 1000)?,
            chunk_overlap: parse_env("CHUNK_OVERLAP", 200)?,
        };
        chunking
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            host: env_or("HOST", "0.0.0.0"),
            port: parse_env("PORT", 8000)?,
            collection_name: env_or("CHROMA_COLLECTION_NAME", "llms_docs"),
            embedding_engine: env_or("RAG_EMBEDDING_ENGINE", "local").to_lowercase(),
            embedding_model: env_or("EMBEDDING_MODEL", "all-MiniLM-L6-v2"),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_api_base_url: env_or("OPENAI_API_BASE_URL", "https://api.openai.com/v1"),
            chunking,
            google_api_key,
            gemini_model: env_or("GEMINI_MODEL", "gemini-1.5-flash"),
            max_tokens: parse_env("MAX_TOKENS", 1024)?,
            temperature: parse_env("TEMPERATURE", 0.7)?,
            max_context_tokens: parse_env("MAX_CONTEXT_TOKENS", 3000)?,
            docs_file_path: env_or("DOCS_FILE_PATH", "data/llms-full.txt"),
            external_request_timeout_secs: parse_env("EXTERNAL_REQUEST_TIMEOUT_SECS", 30)?,
        })
    }
}
