use actix_web::{web, HttpResponse};

use crate::error::AppResult;
use crate::models::ReloadResponse;
use crate::AppState;

/// POST /reload-documents - re-chunk and re-index the corpus, replacing the
/// active collection atomically
pub async fn reload_documents(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let summary = state.indexer.reload().await?;

    Ok(HttpResponse::Ok().json(ReloadResponse {
        message: "Documents reloaded successfully".to_string(),
        total_chunks: summary.total_chunks,
        collection_documents: summary.collection_documents,
        file_path: summary.file_path,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_helpers::build_state;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;
    use std::io::Write;

    #[actix_web::test]
    async fn test_reload_with_missing_file_is_not_found() {
        let state = build_state("/nonexistent/docs.txt").await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/reload-documents", web::post().to(reload_documents)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/reload-documents")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_reload_reindexes_the_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"Large language models predict the next token. They are trained on text.")
            .unwrap();

        let state = build_state(path.to_str().unwrap()).await;
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/reload-documents", web::post().to(reload_documents)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/reload-documents")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["message"], "Documents reloaded successfully");
        assert!(body["total_chunks"].as_u64().unwrap() >= 1);
        assert_eq!(body["total_chunks"], body["collection_documents"]);

        // The active collection now points at the freshly indexed corpus
        assert_ne!(state.active_collection.current(), "docs");
    }
}
