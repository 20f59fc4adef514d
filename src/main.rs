mod config;
mod error;
mod generation;
mod models;
mod retrieval;
mod routes;
mod services;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{
    middleware::{Compress, Logger, NormalizePath},
    web, App, HttpResponse, HttpServer,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::generation::{GeminiGenerator, GenerationProvider};
use crate::retrieval::chunking::TokenChunker;
use crate::retrieval::embeddings::{EmbeddingFactory, EmbeddingProvider};
use crate::retrieval::vector::{ChromaConfig, ChromaStore, VectorDB};
use crate::routes::create_routes;
use crate::services::{ActiveCollection, DocumentIndexer, QueryService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub vector_db: Arc<dyn VectorDB>,
    pub generator: Arc<dyn GenerationProvider>,
    pub active_collection: Arc<ActiveCollection>,
    pub query_service: Arc<QueryService>,
    pub indexer: Arc<DocumentIndexer>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_level = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info".to_string())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting RagDocs backend");

    let config = Arc::new(Config::from_env()?);
    info!("Configuration loaded from environment");

    let chunker = Arc::new(TokenChunker::new(config.chunking.clone())?);

    let embeddings = EmbeddingFactory::from_config(&config)?;
    info!("Embedding provider ready: {}", embeddings.model_name());

    let vector_db: Arc<dyn VectorDB> =
        Arc::new(ChromaStore::new(ChromaConfig::from_env()).await?);

    let generator: Arc<dyn GenerationProvider> = Arc::new(GeminiGenerator::new(&config)?);
    info!("Generation provider ready: {}", generator.model_name());

    let active_collection = Arc::new(ActiveCollection::new(config.collection_name.clone()));
    let timeout = Duration::from_secs(config.external_request_timeout_secs);

    let query_service = Arc::new(QueryService::new(
        embeddings.clone(),
        vector_db.clone(),
        generator.clone(),
        active_collection.clone(),
        timeout,
    ));

    let indexer = Arc::new(DocumentIndexer::new(
        chunker,
        embeddings.clone(),
        vector_db.clone(),
        active_collection.clone(),
        config.collection_name.clone(),
        config.docs_file_path.clone(),
    ));

    let state = web::Data::new(AppState {
        config: config.clone(),
        embeddings,
        vector_db,
        generator,
        active_collection,
        query_service,
        indexer,
    });

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    info!("Server running at http://{}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .wrap(Compress::default())
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .route("/", web::get().to(index))
            .configure(create_routes)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}

/// Landing page listing the available endpoints
async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>RagDocs</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; }
        .container { max-width: 800px; margin: 0 auto; }
        .endpoint { background: #f5f5f5; padding: 15px; margin: 10px 0; border-radius: 5px; }
        .method { color: #fff; padding: 3px 8px; border-radius: 3px; font-weight: bold; }
        .get { background: #61affe; }
        .post { background: #49cc90; }
        code { background: #f8f8f8; padding: 2px 4px; border-radius: 3px; }
    </style>
</head>
<body>
    <div class="container">
        <h1>RagDocs</h1>
        <p>Documentation question-answering over an indexed text corpus.</p>

        <h2>Endpoints</h2>

        <div class="endpoint">
            <span class="method get">GET</span> <code>/health</code>
            <p>Component availability.</p>
        </div>

        <div class="endpoint">
            <span class="method get">GET</span> <code>/info</code>
            <p>Collection entry count and embedding model.</p>
        </div>

        <div class="endpoint">
            <span class="method post">POST</span> <code>/query</code>
            <p>Answer a question grounded in the indexed documents.</p>
            <p><strong>Body:</strong> <code>{"question": "your question", "max_results": 5}</code></p>
        </div>

        <div class="endpoint">
            <span class="method get">GET</span> <code>/search?q=&amp;limit=</code>
            <p>Similarity search without answer generation.</p>
        </div>

        <div class="endpoint">
            <span class="method post">POST</span> <code>/reload-documents</code>
            <p>Re-chunk and re-index the configured corpus file.</p>
        </div>

        <h2>Quick start</h2>
        <pre><code>curl -X POST "http://localhost:8000/query" \
     -H "Content-Type: application/json" \
     -d '{"question": "What are LLMs?"}'</code></pre>
    </div>
</body>
</html>
"#;
