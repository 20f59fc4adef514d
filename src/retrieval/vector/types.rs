use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single entry to be stored in the vector database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorItem {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: Value,
}

/// A stored entry returned from a similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredItem {
    pub id: String,
    pub text: String,
    pub metadata: Value,
    /// Similarity on a 0..=1 scale (1 - distance)
    pub similarity: f32,
}

/// Entry count and metadata for a collection
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub name: String,
    pub count: usize,
    pub metadata: Map<String, Value>,
}

/// Error types for vector database operations
#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Operation failed: {0}")]
    OperationError(String),
}

/// Abstract trait for vector database operations
#[async_trait]
pub trait VectorDB: Send + Sync {
    /// Create a collection if it does not exist, attaching the given metadata
    async fn create_collection(
        &self,
        collection: &str,
        metadata: Map<String, Value>,
    ) -> Result<(), VectorError>;

    /// Delete a collection from the vector database
    async fn delete_collection(&self, collection: &str) -> Result<(), VectorError>;

    /// Replace entries sharing `source`, then add `items`
    async fn upsert(
        &self,
        collection: &str,
        source: &str,
        items: Vec<VectorItem>,
    ) -> Result<(), VectorError>;

    /// Return up to `limit` nearest entries by similarity.
    ///
    /// Returns fewer than `limit` when the collection holds fewer entries,
    /// and `CollectionNotFound` when the collection does not exist.
    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredItem>, VectorError>;

    /// Entry count and collection metadata
    async fn info(&self, collection: &str) -> Result<CollectionInfo, VectorError>;
}
