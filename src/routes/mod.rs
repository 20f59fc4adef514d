pub mod documents;
pub mod health;
pub mod query;

use actix_web::web;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .route("/info", web::get().to(health::get_info))
        .route("/query", web::post().to(query::query_documents))
        .route("/search", web::get().to(query::search_documents))
        .route(
            "/reload-documents",
            web::post().to(documents::reload_documents),
        );
}
