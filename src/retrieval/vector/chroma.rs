use async_trait::async_trait;
use chromadb::client::{ChromaAuthMethod, ChromaClient as ChromaDbClient, ChromaClientOptions};
use chromadb::collection::{ChromaCollection, CollectionEntries, GetOptions, QueryOptions};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::types::{CollectionInfo, ScoredItem, VectorDB, VectorError, VectorItem};

/// Configuration for ChromaDB
#[derive(Debug, Clone)]
pub struct ChromaConfig {
    pub url: Option<String>,
    pub database: String,
    pub auth: ChromaAuthMethod,
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            url: None,
            database: "default_database".to_string(),
            auth: ChromaAuthMethod::None,
        }
    }
}

impl ChromaConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        // Either a full CHROMA_URL, or CHROMA_HTTP_HOST + CHROMA_HTTP_PORT
        let url = if let Ok(chroma_url) = std::env::var("CHROMA_URL") {
            Some(chroma_url)
        } else if let Ok(host) = std::env::var("CHROMA_HTTP_HOST") {
            let port = std::env::var("CHROMA_HTTP_PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(8000);

            let ssl = std::env::var("CHROMA_HTTP_SSL")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                == "true";

            let protocol = if ssl { "https" } else { "http" };

            Some(format!("{}://{}:{}", protocol, host, port))
        } else {
            None
        };

        let database =
            std::env::var("CHROMA_DATABASE").unwrap_or_else(|_| "default_database".to_string());

        let auth = if let Ok(token) = std::env::var("CHROMA_AUTH_TOKEN") {
            ChromaAuthMethod::TokenAuth {
                token,
                header: chromadb::client::ChromaTokenHeader::Authorization,
            }
        } else {
            ChromaAuthMethod::None
        };

        Self {
            url,
            database,
            auth,
        }
    }
}

/// ChromaDB-backed vector store
pub struct ChromaStore {
    client: ChromaDbClient,
}

impl ChromaStore {
    pub async fn new(config: ChromaConfig) -> Result<Self, VectorError> {
        info!(
            "Initializing ChromaDB client: {:?} (database: {})",
            config.url, config.database
        );

        let options = ChromaClientOptions {
            url: config.url.clone(),
            database: config.database.clone(),
            auth: config.auth.clone(),
        };

        let client = ChromaDbClient::new(options).await.map_err(|e| {
            VectorError::ConnectionError(format!("Failed to connect to ChromaDB: {}", e))
        })?;

        info!("Successfully connected to ChromaDB");

        Ok(Self { client })
    }

    async fn get_collection(&self, collection: &str) -> Result<ChromaCollection, VectorError> {
        self.client.get_collection(collection).await.map_err(|e| {
            VectorError::CollectionNotFound(format!("Collection '{}' not found: {}", collection, e))
        })
    }

    async fn get_or_create_collection(
        &self,
        collection: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<ChromaCollection, VectorError> {
        self.client
            .get_or_create_collection(collection, metadata)
            .await
            .map_err(|e| {
                VectorError::DatabaseError(format!(
                    "Failed to get or create collection '{}': {}",
                    collection, e
                ))
            })
    }

    fn items_to_entries(items: &[VectorItem]) -> CollectionEntries<'_> {
        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        let embeddings: Vec<Vec<f32>> = items.iter().map(|item| item.vector.clone()).collect();
        let documents: Vec<&str> = items.iter().map(|item| item.text.as_str()).collect();
        let metadatas: Vec<Map<String, Value>> = items
            .iter()
            .map(|item| item.metadata.as_object().cloned().unwrap_or_default())
            .collect();

        CollectionEntries {
            ids,
            embeddings: Some(embeddings),
            metadatas: Some(metadatas),
            documents: Some(documents),
        }
    }
}

#[async_trait]
impl VectorDB for ChromaStore {
    async fn create_collection(
        &self,
        collection: &str,
        metadata: Map<String, Value>,
    ) -> Result<(), VectorError> {
        debug!("Creating collection: {}", collection);
        self.get_or_create_collection(collection, Some(metadata))
            .await?;
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), VectorError> {
        info!("Deleting collection: {}", collection);

        self.client
            .delete_collection(collection)
            .await
            .map_err(|e| {
                VectorError::DatabaseError(format!(
                    "Failed to delete collection '{}': {}",
                    collection, e
                ))
            })
    }

    async fn upsert(
        &self,
        collection: &str,
        source: &str,
        items: Vec<VectorItem>,
    ) -> Result<(), VectorError> {
        if items.is_empty() {
            debug!("No items to upsert into collection: {}", collection);
            return Ok(());
        }

        let handle = self.get_or_create_collection(collection, None).await?;

        // Entries from a previous indexing of the same source are replaced
        if let Err(e) = handle
            .delete(None, Some(json!({ "source": source })), None)
            .await
        {
            debug!(
                "No prior entries removed for source '{}' in '{}': {}",
                source, collection, e
            );
        }

        info!(
            "Upserting {} items into collection: {}",
            items.len(),
            collection
        );

        let entries = Self::items_to_entries(&items);
        handle.upsert(entries, None).await.map_err(|e| {
            VectorError::OperationError(format!(
                "Failed to upsert items into collection '{}': {}",
                collection, e
            ))
        })?;

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredItem>, VectorError> {
        debug!("Searching collection '{}' with limit {}", collection, limit);

        let handle = self.get_collection(collection).await?;

        let query_options = QueryOptions {
            query_embeddings: Some(vec![vector]),
            query_texts: None,
            n_results: Some(limit),
            where_metadata: None,
            where_document: None,
            include: Some(vec!["metadatas", "documents", "distances"]),
        };

        let result = handle.query(query_options, None).await.map_err(|e| {
            VectorError::OperationError(format!(
                "Failed to search collection '{}': {}",
                collection, e
            ))
        })?;

        // One query vector in, one result row group out
        let ids = result.ids.into_iter().next().unwrap_or_default();
        let documents = result
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        let metadatas = result
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default();
        let distances = result
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();

        let items = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| ScoredItem {
                id,
                text: documents.get(i).cloned().unwrap_or_default(),
                metadata: metadatas
                    .get(i)
                    .cloned()
                    .flatten()
                    .map(Value::Object)
                    .unwrap_or(Value::Null),
                similarity: 1.0 - distances.get(i).copied().unwrap_or(1.0),
            })
            .collect::<Vec<_>>();

        debug!(
            "Search returned {} results from collection: {}",
            items.len(),
            collection
        );

        Ok(items)
    }

    async fn info(&self, collection: &str) -> Result<CollectionInfo, VectorError> {
        let handle = self.get_or_create_collection(collection, None).await?;

        let get_options = GetOptions {
            ids: vec![],
            where_metadata: None,
            limit: None,
            offset: None,
            where_document: None,
            include: Some(vec!["metadatas".to_string()]),
        };

        let result = handle.get(get_options).await.map_err(|e| {
            VectorError::OperationError(format!(
                "Failed to read collection '{}': {}",
                collection, e
            ))
        })?;

        Ok(CollectionInfo {
            name: handle.name().to_string(),
            count: result.ids.len(),
            metadata: handle.metadata().cloned().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests require a running Chroma instance:
    // docker run -p 8000:8000 chromadb/chroma

    #[tokio::test]
    #[ignore] // Requires external service
    async fn test_chroma_connection() {
        let config = ChromaConfig::default();
        let store = ChromaStore::new(config).await;
        assert!(store.is_ok());
    }

    #[tokio::test]
    #[ignore]
    async fn test_upsert_and_search() {
        let store = ChromaStore::new(ChromaConfig::default()).await.unwrap();
        let collection = "ragdocs_test_collection";

        let item = VectorItem {
            id: "docs-0".to_string(),
            text: "test document".to_string(),
            vector: vec![0.1, 0.2, 0.3],
            metadata: json!({ "source": "docs", "chunk_id": 0, "tokens": 2 }),
        };

        store
            .create_collection(collection, Map::new())
            .await
            .unwrap();
        store
            .upsert(collection, "docs", vec![item])
            .await
            .unwrap();

        let results = store
            .search(collection, vec![0.1, 0.2, 0.3], 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);

        let info = store.info(collection).await.unwrap();
        assert_eq!(info.count, 1);

        store.delete_collection(collection).await.unwrap();
    }
}
