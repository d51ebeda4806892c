use crate::error::EmbeddingError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use snipseek_core::config::EmbeddingConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Anything that can turn text into fixed-width vectors
///
/// Production wraps a fastembed ONNX model; tests substitute a
/// deterministic stub so nothing downloads model weights.
pub trait TextEncoder: Send + Sync {
    /// Vector width this encoder produces
    fn dimension(&self) -> usize;

    /// Encode a batch of texts, one vector per input, in input order
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Vector width for a known model name
///
/// The width has to be known before the model is loaded, because index
/// artifacts are opened against it. Unknown names fall back to 384, which
/// covers the MiniLM and BGE-small families.
pub fn model_dimension(model: &str) -> usize {
    match model {
        "sentence-transformers/all-MiniLM-L6-v2" => 384,
        "BAAI/bge-small-en-v1.5" => 384,
        "BAAI/bge-base-en-v1.5" => 768,
        _ => 384,
    }
}

fn model_kind(model: &str) -> EmbeddingModel {
    match model {
        "sentence-transformers/all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
        "BAAI/bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "BAAI/bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        _ => {
            warn!("Unknown model {}, defaulting to bge-small-en-v1.5", model);
            EmbeddingModel::BGESmallENV15
        }
    }
}

/// Encoder backed by a fastembed ONNX model
pub struct FastEmbedEncoder {
    model: TextEmbedding,
    dimension: usize,
}

impl FastEmbedEncoder {
    /// Load the model, downloading weights into the cache dir on first use
    ///
    /// Blocks for however long the download takes; callers on an async
    /// runtime should wrap this in spawn_blocking.
    pub fn load(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let dimension = model_dimension(&config.model);
        info!(
            "Loading embedding model {} ({} dimensions)",
            config.model, dimension
        );

        let options = InitOptions::new(model_kind(&config.model))
            .with_cache_dir(config.cache_dir.clone())
            .with_max_length(config.max_sequence_length)
            .with_show_download_progress(false);

        let model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;

        info!("Embedding model ready");
        Ok(Self { model, dimension })
    }
}

impl TextEncoder for FastEmbedEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Inference(e.to_string()))
    }
}

/// Batched embedding on top of an encoder
///
/// Cheap to clone; clones share the underlying model.
#[derive(Clone)]
pub struct EmbeddingEngine {
    encoder: Arc<dyn TextEncoder>,
    batch_size: usize,
}

impl EmbeddingEngine {
    pub fn new(encoder: Arc<dyn TextEncoder>, batch_size: usize) -> Self {
        Self {
            encoder,
            batch_size: batch_size.max(1),
        }
    }

    /// Load the configured fastembed model and wrap it
    pub fn load(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let encoder = FastEmbedEncoder::load(config)?;
        Ok(Self::new(Arc::new(encoder), config.batch_size))
    }

    /// Vector width of the underlying encoder
    pub fn dimension(&self) -> usize {
        self.encoder.dimension()
    }

    /// Embed texts in fixed-size batches, preserving input order
    ///
    /// Batching bounds encoder memory; the output is the concatenation of
    /// the per-batch results, so the configured batch size never changes
    /// what comes back, only how it is computed. Every vector is checked
    /// against the encoder's declared width before it leaves this function.
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = self.encoder.dimension();
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            debug!("Encoding batch of {} texts", batch.len());
            let encoded = self.encoder.encode(batch)?;
            if encoded.len() != batch.len() {
                return Err(EmbeddingError::Inference(format!(
                    "Encoder returned {} vectors for {} texts",
                    encoded.len(),
                    batch.len()
                )));
            }
            for vector in &encoded {
                if vector.len() != expected {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
            }
            vectors.extend(encoded);
        }

        Ok(vectors)
    }

    /// Embed a single query
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let query = [text.to_string()];
        let mut vectors = self.embed(&query)?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Inference("Encoder returned no vector for query".into()))
    }
}

impl std::fmt::Debug for EmbeddingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingEngine")
            .field("dimension", &self.dimension())
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}
