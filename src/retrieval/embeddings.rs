use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::config::Config;

/// Error types for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Model error: {0}")]
    ModelError(String),
}

/// Trait for embedding providers
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a list of texts, preserving input order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible embeddings API provider
pub struct OpenAIEmbeddings {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
    /// Semaphore to limit concurrent requests
    semaphore: Arc<Semaphore>,
}

impl OpenAIEmbeddings {
    const BATCH_SIZE: usize = 50;

    pub fn new(api_key: String, base_url: &str, model: &str) -> Self {
        let dimension = match model {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            _ => 1536,
        };

        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        let client = Client::with_config(config);

        let max_concurrent = std::env::var("OPENAI_MAX_CONCURRENT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        info!(
            "Initialized OpenAI embeddings: model={}, dimension={}, max_concurrent={}",
            model, dimension, max_concurrent
        );

        Self {
            client,
            model: model.to_string(),
            dimension,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(Self::BATCH_SIZE) {
            let _permit = self.semaphore.acquire().await.map_err(|e| {
                EmbeddingError::ApiError(format!("Failed to acquire semaphore: {}", e))
            })?;

            let request = CreateEmbeddingRequest {
                model: self.model.clone(),
                input: EmbeddingInput::StringArray(batch.to_vec()),
                encoding_format: None,
                user: None,
                dimensions: None,
            };

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| EmbeddingError::ApiError(format!("OpenAI API error: {}", e)))?;

            for embedding_data in response.data {
                all_embeddings.push(embedding_data.embedding);
            }
        }

        Ok(all_embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(feature = "embeddings")]
pub use sentence_transformers::SentenceTransformerEmbeddings;

/// Local sentence-transformer inference via candle
#[cfg(feature = "embeddings")]
mod sentence_transformers {
    use std::sync::Arc;

    use candle_core::{Device, Tensor};
    use candle_nn::VarBuilder;
    use candle_transformers::models::bert::{BertModel, Config as BertConfig};
    use hf_hub::{api::sync::Api, Repo, RepoType};
    use tokenizers::Tokenizer;
    use tracing::info;

    use super::{EmbeddingError, EmbeddingProvider};

    /// Map a short model name to its HuggingFace repository id
    fn resolve_repo_id(model_name: &str) -> String {
        match model_name {
            "all-minilm-l6-v2" | "all-MiniLM-L6-v2" => {
                "sentence-transformers/all-MiniLM-L6-v2".to_string()
            }
            "bge-base-en-v1.5" => "BAAI/bge-base-en-v1.5".to_string(),
            "bge-small-en-v1.5" => "BAAI/bge-small-en-v1.5".to_string(),
            name if name.contains('/') => name.to_string(),
            name => format!("sentence-transformers/{}", name),
        }
    }

    /// Embedding provider running a BERT sentence-transformer on the CPU.
    ///
    /// Model weights and tokenizer are downloaded from HuggingFace once at
    /// construction; the forward pass runs on a blocking thread.
    pub struct SentenceTransformerEmbeddings {
        model: Arc<BertModel>,
        tokenizer: Arc<Tokenizer>,
        model_name: String,
        dimension: usize,
    }

    impl SentenceTransformerEmbeddings {
        pub fn new(model_name: &str) -> Result<Self, EmbeddingError> {
            let repo_id = resolve_repo_id(model_name);
            info!("Loading sentence-transformer model: {}", repo_id);

            let api = Api::new().map_err(|e| {
                EmbeddingError::ModelError(format!("Failed to initialize HF API: {}", e))
            })?;
            let repo = api.repo(Repo::with_revision(
                repo_id,
                RepoType::Model,
                "main".to_string(),
            ));

            let tokenizer_path = repo.get("tokenizer.json").map_err(|e| {
                EmbeddingError::ModelError(format!("Failed to download tokenizer: {}", e))
            })?;
            let config_path = repo.get("config.json").map_err(|e| {
                EmbeddingError::ModelError(format!("Failed to download config: {}", e))
            })?;
            let weights_path = repo
                .get("model.safetensors")
                .or_else(|_| repo.get("pytorch_model.bin"))
                .map_err(|e| {
                    EmbeddingError::ModelError(format!("Failed to download model weights: {}", e))
                })?;

            let tokenizer = Tokenizer::from_file(tokenizer_path).map_err(|e| {
                EmbeddingError::ModelError(format!("Failed to load tokenizer: {}", e))
            })?;

            let config_str = std::fs::read_to_string(config_path)
                .map_err(|e| EmbeddingError::ModelError(format!("Failed to read config: {}", e)))?;
            let config: BertConfig = serde_json::from_str(&config_str).map_err(|e| {
                EmbeddingError::ModelError(format!("Failed to parse config: {}", e))
            })?;
            let dimension = config.hidden_size;

            let device = Device::Cpu;
            let vb = VarBuilder::from_pth(&weights_path, candle_core::DType::F32, &device)
                .or_else(|_| unsafe {
                    VarBuilder::from_mmaped_safetensors(
                        &[weights_path],
                        candle_core::DType::F32,
                        &device,
                    )
                })
                .map_err(|e| {
                    EmbeddingError::ModelError(format!("Failed to load model weights: {}", e))
                })?;

            let model = BertModel::load(vb, &config).map_err(|e| {
                EmbeddingError::ModelError(format!("Failed to load BERT model: {}", e))
            })?;

            info!(
                "Sentence-transformer model loaded: {} (dimension {})",
                model_name, dimension
            );

            Ok(Self {
                model: Arc::new(model),
                tokenizer: Arc::new(tokenizer),
                model_name: model_name.to_string(),
                dimension,
            })
        }
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for SentenceTransformerEmbeddings {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let model = self.model.clone();
            let tokenizer = self.tokenizer.clone();

            // CPU-bound inference runs on a blocking thread
            tokio::task::spawn_blocking(move || {
                let device = Device::Cpu;
                let mut all_embeddings = Vec::with_capacity(texts.len());

                for text in texts {
                    let encoding = tokenizer.encode(text, true).map_err(|e| {
                        EmbeddingError::ModelError(format!("Tokenization failed: {}", e))
                    })?;
                    let token_ids = encoding.get_ids().to_vec();
                    let token_type_ids = encoding.get_type_ids().to_vec();

                    let token_ids = Tensor::new(token_ids.as_slice(), &device)
                        .and_then(|t| t.unsqueeze(0))
                        .map_err(|e| {
                            EmbeddingError::ModelError(format!(
                                "Failed to build token tensor: {}",
                                e
                            ))
                        })?;
                    let token_type_ids = Tensor::new(token_type_ids.as_slice(), &device)
                        .and_then(|t| t.unsqueeze(0))
                        .map_err(|e| {
                            EmbeddingError::ModelError(format!(
                                "Failed to build type tensor: {}",
                                e
                            ))
                        })?;

                    let embeddings =
                        model
                            .forward(&token_ids, &token_type_ids, None)
                            .map_err(|e| {
                                EmbeddingError::ModelError(format!("Model forward failed: {}", e))
                            })?;

                    // Mean pooling over the sequence dimension
                    let embedding = embeddings
                        .mean(1)
                        .and_then(|t| t.squeeze(0))
                        .and_then(|t| t.to_vec1::<f32>())
                        .map_err(|e| {
                            EmbeddingError::ModelError(format!("Pooling failed: {}", e))
                        })?;

                    all_embeddings.push(embedding);
                }

                Ok(all_embeddings)
            })
            .await
            .map_err(|e| EmbeddingError::ModelError(format!("Task join error: {}", e)))?
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            &self.model_name
        }
    }
}

/// Factory for creating embedding providers
pub struct EmbeddingFactory;

impl EmbeddingFactory {
    /// Create an embedding provider from the service configuration
    pub fn from_config(config: &Config) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
        info!("Creating embedding provider: {}", config.embedding_engine);

        match config.embedding_engine.as_str() {
            "openai" => {
                let api_key = config.openai_api_key.clone().ok_or_else(|| {
                    EmbeddingError::ConfigError(
                        "OPENAI_API_KEY must be set for the openai embedding engine".to_string(),
                    )
                })?;
                Ok(Arc::new(OpenAIEmbeddings::new(
                    api_key,
                    &config.openai_api_base_url,
                    &config.embedding_model,
                )))
            }
            "local" | "" => Self::create_local(&config.embedding_model),
            other => Err(EmbeddingError::ConfigError(format!(
                "Unsupported embedding engine: {}. Supported: local, openai",
                other
            ))),
        }
    }

    #[cfg(feature = "embeddings")]
    fn create_local(model: &str) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
        let provider = SentenceTransformerEmbeddings::new(model)?;
        Ok(Arc::new(provider))
    }

    #[cfg(not(feature = "embeddings"))]
    fn create_local(_model: &str) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
        Err(EmbeddingError::ConfigError(
            "Local embedding support not compiled. Enable the 'embeddings' feature or set \
             RAG_EMBEDDING_ENGINE=openai."
                .to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_embedding_dimension() {
        let provider = OpenAIEmbeddings::new(
            "test_key".to_string(),
            "https://api.openai.com/v1",
            "text-embedding-3-small",
        );

        assert_eq!(provider.dimension(), 1536);
        assert_eq!(provider.model_name(), "text-embedding-3-small");
    }

    #[tokio::test]
    #[ignore] // Requires API key
    async fn test_openai_embeddings() {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap();
        let provider =
            OpenAIEmbeddings::new(api_key, "https://api.openai.com/v1", "text-embedding-3-small");
        let texts = vec!["Hello world".to_string(), "Test embedding".to_string()];

        let embeddings = provider.embed(texts).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), provider.dimension());
    }
}
