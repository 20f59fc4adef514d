use actix_web::{web, HttpResponse};
use tracing::warn;

use crate::error::AppResult;
use crate::generation::GenerationProvider;
use crate::models::{CollectionInfoResponse, DatabaseStatus, HealthResponse};
use crate::retrieval::embeddings::EmbeddingProvider;
use crate::retrieval::vector::VectorDB;
use crate::AppState;

/// GET /health - component availability
pub async fn health_check(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let collection = state.active_collection.current();

    let database_status = match state.vector_db.info(&collection).await {
        Ok(info) => DatabaseStatus {
            connected: true,
            collection: info.name,
            documents: info.count,
        },
        Err(e) => {
            warn!("Vector store health probe failed: {}", e);
            DatabaseStatus {
                connected: false,
                collection,
                documents: 0,
            }
        }
    };

    let generation_status = state.generator.probe().await;

    let healthy = database_status.connected && generation_status.success;

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        message: if healthy {
            "All components operational".to_string()
        } else {
            "One or more components are unavailable".to_string()
        },
        database_status,
        generation_status,
    }))
}

/// GET /info - collection entry count and embedding model
pub async fn get_info(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let collection = state.active_collection.current();
    let info = state.vector_db.info(&collection).await?;

    let embedding_model = info
        .metadata
        .get("embedding_model")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| state.embeddings.model_name().to_string());

    Ok(HttpResponse::Ok().json(CollectionInfoResponse {
        collection_name: state.config.collection_name.clone(),
        total_documents: info.count,
        embedding_model,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_helpers::build_state;
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_health_reports_component_status() {
        let state = build_state("data/llms-full.txt").await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database_status"]["connected"], true);
        assert_eq!(body["database_status"]["documents"], 1);
        assert_eq!(body["generation_status"]["success"], true);
    }

    #[actix_web::test]
    async fn test_info_reports_count_and_embedding_model() {
        let state = build_state("data/llms-full.txt").await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/info", web::get().to(get_info)),
        )
        .await;

        let req = test::TestRequest::get().uri("/info").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["collection_name"], "docs");
        assert_eq!(body["total_documents"], 1);
        assert_eq!(body["embedding_model"], "hash-embeddings");
    }
}
