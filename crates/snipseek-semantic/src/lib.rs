// Semantic code search for snipseek
//
// This crate embeds a natural language description of code and finds the
// nearest snippets in prebuilt per-language usearch partitions. The
// embedding model and each partition load lazily, exactly once, and stay
// resident for the life of the service.

pub mod embeddings;
pub mod error;
pub mod models;
pub mod partition;
pub mod preprocessing;
pub mod registry;
pub mod search;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types
pub use embeddings::{model_dimension, EmbeddingEngine, FastEmbedEncoder, TextEncoder};
pub use error::{EmbeddingError, LoadError, SearchError};
pub use models::{similarity_from_distance, PartitionState, PartitionStatus, SearchResult};
pub use partition::LanguagePartition;
pub use preprocessing::normalize_query;
pub use registry::IndexRegistry;
pub use search::{SearchService, ServiceState};
