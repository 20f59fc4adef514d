pub mod chroma;
pub mod types;

pub use chroma::{ChromaConfig, ChromaStore};
pub use types::{CollectionInfo, ScoredItem, VectorDB, VectorError, VectorItem};
