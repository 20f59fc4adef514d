use serde::Serialize;

use crate::generation::ProbeStatus;

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub connected: bool,
    pub collection: String,
    pub documents: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub database_status: DatabaseStatus,
    pub generation_status: ProbeStatus,
}

#[derive(Debug, Serialize)]
pub struct CollectionInfoResponse {
    pub collection_name: String,
    pub total_documents: usize,
    pub embedding_model: String,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub message: String,
    pub total_chunks: usize,
    pub collection_documents: usize,
    pub file_path: String,
}
