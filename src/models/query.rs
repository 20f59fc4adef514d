use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;
use validator::Validate;

use crate::services::RankedSource;

/// Default number of retrieved chunks per query
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Maximum graphemes in a source content preview
const PREVIEW_GRAPHEMES: usize = 200;

#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, message = "question must not be empty"))]
    pub question: String,

    #[validate(range(min = 1, max = 20))]
    pub max_results: Option<usize>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 1, message = "q must not be empty"))]
    pub q: String,

    #[validate(range(min = 1, max = 20))]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SourceInfo {
    pub rank: usize,
    pub content_preview: String,
    pub source: String,
    pub chunk_id: u64,
    pub similarity_score: f32,
    pub tokens: u64,
}

impl From<&RankedSource> for SourceInfo {
    fn from(source: &RankedSource) -> Self {
        Self {
            rank: source.rank,
            content_preview: content_preview(&source.content),
            source: source.source.clone(),
            chunk_id: source.chunk_id,
            similarity_score: source.similarity_score,
            tokens: source.tokens,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceInfo>,
    pub follow_up_questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultEntry {
    pub rank: usize,
    pub content: String,
    pub metadata: Value,
    pub similarity_score: f32,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<SearchResultEntry>,
}

/// Truncate text to a preview on a grapheme boundary
pub fn content_preview(text: &str) -> String {
    let mut iter = text.grapheme_indices(true);
    match iter.nth(PREVIEW_GRAPHEMES) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_is_not_truncated() {
        assert_eq!(content_preview("short text"), "short text");
    }

    #[test]
    fn test_long_content_gets_ellipsis() {
        let text = "a".repeat(500);
        let preview = content_preview(&text);
        assert_eq!(preview.len(), 203);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_preview_respects_grapheme_boundaries() {
        let text = "é".repeat(300);
        let preview = content_preview(&text);
        assert!(preview.ends_with("..."));
        assert!(preview.strip_suffix("...").unwrap().chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_query_request_validation() {
        let valid = QueryRequest {
            question: "What are LLMs?".to_string(),
            max_results: Some(5),
        };
        assert!(valid.validate().is_ok());

        let empty = QueryRequest {
            question: String::new(),
            max_results: None,
        };
        assert!(empty.validate().is_err());

        let out_of_range = QueryRequest {
            question: "q".to_string(),
            max_results: Some(50),
        };
        assert!(out_of_range.validate().is_err());
    }
}
