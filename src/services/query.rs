use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::generation::{ContextPassage, GenerationProvider};
use crate::retrieval::chunking;
use crate::retrieval::embeddings::EmbeddingProvider;
use crate::retrieval::vector::{ScoredItem, VectorDB, VectorError};

use super::ActiveCollection;

/// A retrieved chunk annotated with rank and similarity
#[derive(Debug, Clone)]
pub struct RankedSource {
    pub rank: usize,
    pub content: String,
    pub source: String,
    pub chunk_id: u64,
    pub similarity_score: f32,
    pub tokens: u64,
    pub metadata: Value,
}

/// Everything a single query produces
#[derive(Debug)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<RankedSource>,
    pub follow_up_questions: Vec<String>,
}

/// Sequences embed -> retrieve -> compose for one question.
///
/// Each request is independent and stateless; the first failing step aborts
/// it. An empty or missing collection is not a failure: the answer is then
/// composed without retrieved context.
pub struct QueryService {
    embeddings: Arc<dyn EmbeddingProvider>,
    vector_db: Arc<dyn VectorDB>,
    generator: Arc<dyn GenerationProvider>,
    active: Arc<ActiveCollection>,
    timeout: Duration,
}

impl QueryService {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        vector_db: Arc<dyn VectorDB>,
        generator: Arc<dyn GenerationProvider>,
        active: Arc<ActiveCollection>,
        timeout: Duration,
    ) -> Self {
        Self {
            embeddings,
            vector_db,
            generator,
            active,
            timeout,
        }
    }

    /// Retrieve the `limit` most similar chunks for `query`
    pub async fn search(&self, query: &str, limit: usize) -> AppResult<Vec<RankedSource>> {
        let embeddings = tokio::time::timeout(
            self.timeout,
            self.embeddings.embed(vec![query.to_string()]),
        )
        .await
        .map_err(|_| {
            AppError::EmbeddingUnavailable(format!(
                "embedding request timed out after {}s",
                self.timeout.as_secs()
            ))
        })?
        .map_err(AppError::from)?;

        let embedding = embeddings.into_iter().next().ok_or_else(|| {
            AppError::EmbeddingUnavailable("embedding backend returned no vector".to_string())
        })?;

        let collection = self.active.current();
        let items = match self.vector_db.search(&collection, embedding, limit).await {
            Ok(items) => items,
            Err(VectorError::CollectionNotFound(e)) => {
                debug!("Search against absent collection, returning no results: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(rank_results(items))
    }

    /// Answer `question` grounded in the `max_results` most similar chunks
    pub async fn answer(&self, question: &str, max_results: usize) -> AppResult<QueryOutcome> {
        let sources = self.search(question, max_results).await?;

        let passages: Vec<ContextPassage> = sources
            .iter()
            .map(|source| ContextPassage {
                text: source.content.clone(),
                tokens: source.tokens as usize,
            })
            .collect();

        let answer = tokio::time::timeout(
            self.timeout,
            self.generator.generate_answer(question, &passages),
        )
        .await
        .map_err(|_| {
            AppError::GenerationFailed(format!(
                "generation request timed out after {}s",
                self.timeout.as_secs()
            ))
        })?
        .map_err(AppError::from)?;

        // Follow-up suggestions degrade to an empty list rather than failing
        // the whole query
        let follow_up_questions = match tokio::time::timeout(
            self.timeout,
            self.generator.suggest_follow_ups(question, &passages),
        )
        .await
        {
            Ok(Ok(questions)) => questions,
            Ok(Err(e)) => {
                warn!("Follow-up suggestion failed: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!("Follow-up suggestion timed out");
                Vec::new()
            }
        };

        Ok(QueryOutcome {
            answer,
            sources,
            follow_up_questions,
        })
    }
}

/// Order results by descending similarity, ties broken by chunk index,
/// and assign 1-based ranks.
fn rank_results(items: Vec<ScoredItem>) -> Vec<RankedSource> {
    let mut sources: Vec<RankedSource> = items
        .into_iter()
        .map(|item| {
            let chunk_id = item
                .metadata
                .get("chunk_id")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let tokens = item
                .metadata
                .get("tokens")
                .and_then(Value::as_u64)
                .unwrap_or_else(|| chunking::count_tokens_approx(&item.text) as u64);
            let source = item
                .metadata
                .get("source")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();

            RankedSource {
                rank: 0,
                content: item.text,
                source,
                chunk_id,
                similarity_score: item.similarity,
                tokens,
                metadata: item.metadata,
            }
        })
        .collect();

    sources.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });

    for (i, source) in sources.iter_mut().enumerate() {
        source.rank = i + 1;
    }

    sources
}
