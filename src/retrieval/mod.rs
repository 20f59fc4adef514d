pub mod chunking;
pub mod embeddings;
pub mod vector;

pub use chunking::{Chunk, ChunkingConfig, TokenChunker};
pub use embeddings::{EmbeddingError, EmbeddingFactory, EmbeddingProvider};
pub use vector::{VectorDB, VectorError};
