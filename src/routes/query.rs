use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    QueryRequest, QueryResponse, SearchParams, SearchResponse, SearchResultEntry, SourceInfo,
    DEFAULT_MAX_RESULTS,
};
use crate::AppState;

/// POST /query - answer a question grounded in the indexed documents
pub async fn query_documents(
    state: web::Data<AppState>,
    form: web::Json<QueryRequest>,
) -> AppResult<HttpResponse> {
    form.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let question = form.question.trim().to_string();
    if question.is_empty() {
        return Err(AppError::Validation(
            "question must not be empty".to_string(),
        ));
    }

    let max_results = form.max_results.unwrap_or(DEFAULT_MAX_RESULTS);

    let outcome = state.query_service.answer(&question, max_results).await?;
    let sources: Vec<SourceInfo> = outcome.sources.iter().map(SourceInfo::from).collect();

    Ok(HttpResponse::Ok().json(QueryResponse {
        question,
        answer: outcome.answer,
        sources,
        follow_up_questions: outcome.follow_up_questions,
    }))
}

/// GET /search - retrieval only, no answer generation
pub async fn search_documents(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> AppResult<HttpResponse> {
    params
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let query = params.q.trim().to_string();
    if query.is_empty() {
        return Err(AppError::Validation("q must not be empty".to_string()));
    }

    let limit = params.limit.unwrap_or(DEFAULT_MAX_RESULTS);

    let results = state.query_service.search(&query, limit).await?;
    let results: Vec<SearchResultEntry> = results
        .into_iter()
        .map(|source| SearchResultEntry {
            rank: source.rank,
            content: source.content,
            metadata: source.metadata,
            similarity_score: source.similarity_score,
        })
        .collect();

    Ok(HttpResponse::Ok().json(SearchResponse {
        query,
        total_results: results.len(),
        results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_helpers::build_state;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_query_with_blank_question_is_bad_request() {
        let state = build_state("data/llms-full.txt").await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/query", web::post().to(query_documents)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({ "question": "   " }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_query_rejects_out_of_range_max_results() {
        let state = build_state("data/llms-full.txt").await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/query", web::post().to(query_documents)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({ "question": "What is Rust?", "max_results": 50 }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_query_returns_answer_with_ranked_sources() {
        let state = build_state("data/llms-full.txt").await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/query", web::post().to(query_documents)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({ "question": "What is Rust?" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["question"], "What is Rust?");
        assert_eq!(body["answer"], "answer[What is Rust?|1]");
        assert_eq!(body["sources"].as_array().unwrap().len(), 1);
        assert_eq!(body["sources"][0]["rank"], 1);
        assert_eq!(body["sources"][0]["source"], "doc");
        assert_eq!(body["follow_up_questions"], json!(["What else?"]));
    }

    #[actix_web::test]
    async fn test_search_with_blank_query_is_bad_request() {
        let state = build_state("data/llms-full.txt").await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/search", web::get().to(search_documents)),
        )
        .await;

        let req = test::TestRequest::get().uri("/search?q=%20").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_search_returns_ranked_results_without_answer() {
        let state = build_state("data/llms-full.txt").await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/search", web::get().to(search_documents)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/search?q=Rust&limit=10")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["query"], "Rust");
        assert_eq!(body["total_results"], 1);
        assert_eq!(body["results"][0]["rank"], 1);
        assert!(body["results"][0]["content"]
            .as_str()
            .unwrap()
            .contains("Rust"));
        assert!(body.get("answer").is_none());
    }
}
