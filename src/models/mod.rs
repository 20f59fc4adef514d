pub mod query;
pub mod system;

pub use query::{
    content_preview, QueryRequest, QueryResponse, SearchParams, SearchResponse, SearchResultEntry,
    SourceInfo, DEFAULT_MAX_RESULTS,
};
pub use system::{CollectionInfoResponse, DatabaseStatus, HealthResponse, ReloadResponse};
