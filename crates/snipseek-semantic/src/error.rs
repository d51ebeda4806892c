use thiserror::Error;

/// Why a language partition could not be brought into memory
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("No partition is configured for language {language:?}")]
    UnknownLanguage { language: String },

    #[error("Missing index artifact for {language} at {path:?}")]
    MissingArtifact {
        language: String,
        path: std::path::PathBuf,
    },

    /// The two artifact files disagree about how many snippets exist.
    ///
    /// Positions in the vector index are meaningless against the snippet
    /// list in that case, so the whole partition is refused instead of
    /// serving answers pointing at the wrong code.
    #[error("Corrupt artifact for {language}: index holds {vectors} vectors but metadata lists {snippets} snippets")]
    Corrupt {
        language: String,
        vectors: usize,
        snippets: usize,
    },

    #[error("Vector index error for {language}: {reason}")]
    Index { language: String, reason: String },

    #[error("Metadata error for {language}: {reason}")]
    Metadata { language: String, reason: String },

    #[error("IO error for {language}: {source}")]
    Io {
        language: String,
        #[source]
        source: std::io::Error,
    },
}

/// Embedding model and inference failures
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("Failed to generate embeddings: {0}")]
    Inference(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors surfaced to callers of the search service
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Language {language:?} is not supported (supported: {supported:?})")]
    UnsupportedLanguage {
        language: String,
        supported: Vec<String>,
    },

    #[error("No usable index for language {language:?}: {source}")]
    IndexUnavailable {
        language: String,
        #[source]
        source: LoadError,
    },

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Similarity query failed for {language:?}: {reason}")]
    QueryFailed { language: String, reason: String },
}
