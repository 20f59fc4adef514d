use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::retrieval::chunking::TokenChunker;
use crate::retrieval::embeddings::EmbeddingProvider;
use crate::retrieval::vector::{VectorDB, VectorItem};

use super::ActiveCollection;

/// Result of re-indexing the corpus
#[derive(Debug)]
pub struct ReloadSummary {
    pub total_chunks: usize,
    pub collection_documents: usize,
    pub file_path: String,
}

/// Chunks, embeds and indexes the configured corpus file.
///
/// Reload builds a complete staging collection before swapping it in as the
/// active one, so in-flight queries never observe a partially indexed
/// collection. Concurrent reloads are serialized.
pub struct DocumentIndexer {
    chunker: Arc<TokenChunker>,
    embeddings: Arc<dyn EmbeddingProvider>,
    vector_db: Arc<dyn VectorDB>,
    active: Arc<ActiveCollection>,
    base_collection: String,
    docs_file_path: PathBuf,
    reload_lock: Mutex<()>,
}

impl DocumentIndexer {
    pub fn new(
        chunker: Arc<TokenChunker>,
        embeddings: Arc<dyn EmbeddingProvider>,
        vector_db: Arc<dyn VectorDB>,
        active: Arc<ActiveCollection>,
        base_collection: String,
        docs_file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            chunker,
            embeddings,
            vector_db,
            active,
            base_collection,
            docs_file_path: docs_file_path.into(),
            reload_lock: Mutex::new(()),
        }
    }

    /// Re-chunk and re-index the corpus into a fresh collection, swap it in,
    /// then delete the previous collection.
    pub async fn reload(&self) -> AppResult<ReloadSummary> {
        let _guard = self.reload_lock.lock().await;

        if !self.docs_file_path.exists() {
            return Err(AppError::NotFound(format!(
                "Document file {} not found",
                self.docs_file_path.display()
            )));
        }

        let text = tokio::fs::read_to_string(&self.docs_file_path).await?;
        let source = self
            .docs_file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let chunks = self.chunker.chunk(&text, &source);
        info!("Chunked '{}' into {} chunks", source, chunks.len());

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embeddings.embed(texts).await.map_err(AppError::from)?;
        if vectors.len() != chunks.len() {
            return Err(AppError::Internal(format!(
                "Embedding count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        // Build the replacement collection completely before exposing it
        let staging = format!("{}-{}", self.base_collection, Uuid::new_v4().simple());
        let mut metadata = Map::new();
        metadata.insert(
            "hnsw:space".to_string(),
            Value::String("cosine".to_string()),
        );
        metadata.insert(
            "embedding_model".to_string(),
            Value::String(self.embeddings.model_name().to_string()),
        );
        self.vector_db.create_collection(&staging, metadata).await?;

        let items: Vec<VectorItem> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorItem {
                id: format!("{}-{}", chunk.source, chunk.index),
                text: chunk.text.clone(),
                vector,
                metadata: json!({
                    "source": chunk.source,
                    "chunk_id": chunk.index,
                    "tokens": chunk.tokens,
                    "offset": chunk.offset,
                }),
            })
            .collect();

        self.vector_db.upsert(&staging, &source, items).await?;
        let collection_info = self.vector_db.info(&staging).await?;

        let previous = self.active.swap(staging.clone());
        info!(
            "Collection swapped: {} -> {} ({} entries)",
            previous,
            staging,
            collection_info.count
        );

        if previous != staging {
            if let Err(e) = self.vector_db.delete_collection(&previous).await {
                warn!("Could not delete previous collection {}: {}", previous, e);
            }
        }

        Ok(ReloadSummary {
            total_chunks: chunks.len(),
            collection_documents: collection_info.count,
            file_path: self.docs_file_path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::chunking::ChunkingConfig;
    use crate::services::testing::{EchoGenerator, HashEmbeddings, InMemoryStore};
    use crate::services::QueryService;
    use std::io::Write;
    use std::time::Duration;

    fn write_corpus(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("docs.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn indexer(
        store: Arc<InMemoryStore>,
        active: Arc<ActiveCollection>,
        path: PathBuf,
    ) -> DocumentIndexer {
        let chunker = Arc::new(
            TokenChunker::new(ChunkingConfig {
                chunk_size: 16,
                chunk_overlap: 4,
            })
            .unwrap(),
        );
        DocumentIndexer::new(
            chunker,
            Arc::new(HashEmbeddings::default()),
            store,
            active,
            "docs".to_string(),
            path,
        )
    }

    #[tokio::test]
    async fn test_reload_missing_file_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let active = Arc::new(ActiveCollection::new("docs"));
        let indexer = indexer(store, active, PathBuf::from("/nonexistent/docs.txt"));

        let result = indexer.reload().await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reload_indexes_and_swaps_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_corpus(&dir, "The quick brown fox jumps over the lazy dog. ");

        let store = Arc::new(InMemoryStore::new());
        let active = Arc::new(ActiveCollection::new("docs"));
        let indexer = indexer(store.clone(), active.clone(), path.clone());

        let summary = indexer.reload().await.unwrap();

        assert!(summary.total_chunks >= 1);
        assert_eq!(summary.collection_documents, summary.total_chunks);
        assert_eq!(summary.file_path, path.display().to_string());

        let current = active.current();
        assert_ne!(current, "docs");
        assert!(current.starts_with("docs-"));

        let info = store.info(&current).await.unwrap();
        assert_eq!(info.count, summary.total_chunks);
        assert_eq!(
            info.metadata.get("embedding_model").and_then(|v| v.as_str()),
            Some("hash-embeddings")
        );
    }

    #[tokio::test]
    async fn test_second_reload_replaces_previous_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_corpus(&dir, "Some documentation text to index twice.");

        let store = Arc::new(InMemoryStore::new());
        let active = Arc::new(ActiveCollection::new("docs"));
        let indexer = indexer(store.clone(), active.clone(), path);

        indexer.reload().await.unwrap();
        let first = active.current();

        indexer.reload().await.unwrap();
        let second = active.current();

        assert_ne!(first, second);

        // Only the newest collection remains
        let names = store.collection_names().await;
        assert_eq!(names, vec![second]);
    }

    #[tokio::test]
    async fn test_query_during_reload_sees_one_collection_in_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_corpus(&dir, &"alpha ".repeat(60));

        let store = Arc::new(InMemoryStore::new());
        let active = Arc::new(ActiveCollection::new("docs"));
        let indexer = indexer(store.clone(), active.clone(), path.clone());
        indexer.reload().await.unwrap();

        std::fs::write(&path, "beta ".repeat(60)).unwrap();

        let service = QueryService::new(
            Arc::new(HashEmbeddings::default()),
            store.clone(),
            Arc::new(EchoGenerator),
            active.clone(),
            Duration::from_secs(5),
        );

        let (reloaded, searched) = tokio::join!(indexer.reload(), service.search("alpha", 10));
        reloaded.unwrap();
        let results = searched.unwrap();

        // The query sees the old corpus or the new one, never a mix
        assert!(!results.is_empty());
        let from_old = results
            .iter()
            .filter(|r| r.content.contains("alpha"))
            .count();
        let from_new = results
            .iter()
            .filter(|r| r.content.contains("beta"))
            .count();
        assert!(from_old == results.len() || from_new == results.len());
    }
}
