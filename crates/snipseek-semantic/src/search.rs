use crate::embeddings::{model_dimension, EmbeddingEngine, TextEncoder};
use crate::error::{EmbeddingError, SearchError};
use crate::models::{PartitionStatus, SearchResult};
use crate::preprocessing::normalize_query;
use crate::registry::IndexRegistry;
use futures::future::join_all;
use snipseek_core::Config;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task;
use tracing::{debug, info, warn};

const STATE_UNINITIALIZED: u8 = 0;
const STATE_INITIALIZING: u8 = 1;
const STATE_READY: u8 = 2;

/// Lifecycle state of the search service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// No model loaded yet; the first search triggers initialization
    Uninitialized,
    /// Model download/load in progress
    Initializing,
    /// Model resident; searches run without setup work
    Ready,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ServiceState::Uninitialized => "uninitialized",
            ServiceState::Initializing => "initializing",
            ServiceState::Ready => "ready",
        })
    }
}

/// Semantic code search over prebuilt per-language partitions
///
/// The embedding model loads once, on first use or via [`initialize`];
/// partitions load lazily per language through the registry. There is no
/// global lock: once warm, concurrent searches share only the encoder and
/// the loaded partitions, both of which are read-only.
///
/// [`initialize`]: SearchService::initialize
pub struct SearchService {
    config: Config,
    registry: IndexRegistry,
    /// Encoder injected at construction; None means load fastembed on demand
    encoder: Option<Arc<dyn TextEncoder>>,
    engine: OnceCell<EmbeddingEngine>,
    state: AtomicU8,
}

impl SearchService {
    /// Service over `config`; nothing loads until first use
    pub fn new(config: Config) -> Self {
        let registry = IndexRegistry::new(
            config.search.languages.clone(),
            config.index.artifact_dir.clone(),
            model_dimension(&config.embedding.model),
        );
        Self {
            config,
            registry,
            encoder: None,
            engine: OnceCell::new(),
            state: AtomicU8::new(STATE_UNINITIALIZED),
        }
    }

    /// Service with a caller-supplied encoder instead of the fastembed model
    ///
    /// The registry opens artifacts against the encoder's dimension. The
    /// service cold-starts exactly like [`new`]: the one initialization
    /// path runs on first use, wrapping the provided encoder instead of
    /// loading a model, then warming up partitions as usual. Tests use
    /// this to stage exact vector geometry without downloading weights.
    ///
    /// [`new`]: SearchService::new
    pub fn with_encoder(config: Config, encoder: Arc<dyn TextEncoder>) -> Self {
        let registry = IndexRegistry::new(
            config.search.languages.clone(),
            config.index.artifact_dir.clone(),
            encoder.dimension(),
        );
        Self {
            config,
            registry,
            encoder: Some(encoder),
            engine: OnceCell::new(),
            state: AtomicU8::new(STATE_UNINITIALIZED),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServiceState {
        match self.state.load(Ordering::SeqCst) {
            STATE_INITIALIZING => ServiceState::Initializing,
            STATE_READY => ServiceState::Ready,
            _ => ServiceState::Uninitialized,
        }
    }

    /// Languages with a configured partition, in configuration order
    pub fn supported_languages(&self) -> &[String] {
        &self.config.search.languages
    }

    fn supports(&self, language: &str) -> bool {
        self.config.search.languages.iter().any(|l| l == language)
    }

    /// Per-language partition status, in configuration order
    pub fn partition_status(&self) -> Vec<PartitionStatus> {
        self.registry.status()
    }

    /// Load the embedding model and warm up every configured partition
    ///
    /// Safe to call any number of times from any number of tasks; the work
    /// happens once. A partition that fails to warm up is logged and
    /// skipped, because searches retry it on demand. A model load failure
    /// fails this call but leaves the service able to try again.
    pub async fn initialize(&self) -> Result<(), SearchError> {
        self.ensure_ready().await.map(|_| ())
    }

    async fn ensure_ready(&self) -> Result<&EmbeddingEngine, SearchError> {
        self.engine
            .get_or_try_init(|| async {
                self.state.store(STATE_INITIALIZING, Ordering::SeqCst);
                info!("Initializing search service");

                let engine = match &self.encoder {
                    Some(encoder) => {
                        EmbeddingEngine::new(Arc::clone(encoder), self.config.embedding.batch_size)
                    }
                    None => {
                        let embedding = self.config.embedding.clone();
                        match task::spawn_blocking(move || EmbeddingEngine::load(&embedding)).await
                        {
                            Ok(Ok(engine)) => engine,
                            Ok(Err(e)) => {
                                self.state.store(STATE_UNINITIALIZED, Ordering::SeqCst);
                                return Err(SearchError::Embedding(e));
                            }
                            Err(e) => {
                                self.state.store(STATE_UNINITIALIZED, Ordering::SeqCst);
                                return Err(SearchError::Embedding(EmbeddingError::ModelLoad(
                                    format!("model load task failed: {}", e),
                                )));
                            }
                        }
                    }
                };

                self.warm_up().await;
                self.state.store(STATE_READY, Ordering::SeqCst);
                info!(
                    "Search service ready: {}-dimensional encoder, {}/{} partitions loaded",
                    engine.dimension(),
                    self.registry.loaded_count(),
                    self.registry.languages().len()
                );
                Ok(engine)
            })
            .await
    }

    /// Eagerly load every configured partition, concurrently
    async fn warm_up(&self) {
        let loads = self
            .config
            .search
            .languages
            .iter()
            .map(|language| self.registry.load(language));
        for (language, outcome) in self
            .config
            .search
            .languages
            .iter()
            .zip(join_all(loads).await)
        {
            if let Err(e) = outcome {
                warn!("Warm-up skipped {}: {}", language, e);
            }
        }
    }

    /// Find the `top_k` snippets closest to `query` in `language`'s partition
    ///
    /// Results come back sorted by distance, closest first, with at most
    /// `min(top_k, partition size)` entries. The language check runs before
    /// any model or index work, so asking for an unsupported language costs
    /// nothing. Embedding and the index query both run on the blocking
    /// pool; dropping the returned future mid-flight leaves the service in
    /// a clean state.
    pub async fn search(
        &self,
        query: &str,
        language: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if !self.supports(language) {
            return Err(SearchError::UnsupportedLanguage {
                language: language.to_string(),
                supported: self.config.search.languages.clone(),
            });
        }

        let engine = self.ensure_ready().await?.clone();

        let partition = match self.registry.load(language).await {
            Ok(partition) => partition,
            Err(source) => {
                warn!("Partition unavailable for {}: {}", language, source);
                return Err(SearchError::IndexUnavailable {
                    language: language.to_string(),
                    source,
                });
            }
        };

        if top_k == 0 || partition.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Searching {} partition ({} snippets) for top {}",
            language,
            partition.len(),
            top_k
        );

        let text = normalize_query(query, self.config.embedding.max_sequence_length);
        let vector = task::spawn_blocking(move || engine.embed_query(&text))
            .await
            .map_err(|e| EmbeddingError::Inference(format!("embedding task failed: {}", e)))??;

        let query_partition = Arc::clone(&partition);
        let hits = task::spawn_blocking(move || query_partition.query(&vector, top_k))
            .await
            .map_err(|e| SearchError::QueryFailed {
                language: language.to_string(),
                reason: format!("query task failed: {}", e),
            })??;

        Ok(hits
            .into_iter()
            .filter_map(|(position, distance)| {
                partition
                    .snippet(position)
                    .map(|snippet| SearchResult::new(snippet.clone(), distance))
            })
            .collect())
    }
}
