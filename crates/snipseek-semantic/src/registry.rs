use crate::error::LoadError;
use crate::models::{PartitionState, PartitionStatus};
use crate::partition::LanguagePartition;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tokio::task;
use tracing::debug;

/// Lazily loaded set of language partitions
///
/// Each language gets a load-once cell: the first caller does the disk
/// work, concurrent callers for the same language share that one attempt,
/// and everyone after gets the cached partition. A failed attempt leaves
/// the cell empty, so the next request retries; artifacts can be repaired
/// or installed without restarting the service.
pub struct IndexRegistry {
    languages: Vec<String>,
    artifact_dir: PathBuf,
    dimension: usize,
    cells: HashMap<String, OnceCell<Arc<LanguagePartition>>>,
    /// Most recent load failure per language, kept for status reporting
    last_errors: Mutex<HashMap<String, String>>,
}

impl IndexRegistry {
    /// Registry for `languages`, loading from `artifact_dir/<language>/`
    pub fn new(languages: Vec<String>, artifact_dir: PathBuf, dimension: usize) -> Self {
        let cells = languages
            .iter()
            .map(|language| (language.clone(), OnceCell::new()))
            .collect();
        Self {
            languages,
            artifact_dir,
            dimension,
            cells,
            last_errors: Mutex::new(HashMap::new()),
        }
    }

    /// Languages this registry knows about, in configuration order
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Partition for `language`, loading it on first use
    ///
    /// The load runs on the blocking pool and no lock is held while files
    /// are read, so searches against already-loaded languages are never
    /// stalled by a slow load of another one.
    pub async fn load(&self, language: &str) -> Result<Arc<LanguagePartition>, LoadError> {
        let cell = self
            .cells
            .get(language)
            .ok_or_else(|| LoadError::UnknownLanguage {
                language: language.to_string(),
            })?;

        // warm path: no locks, no bookkeeping
        if let Some(partition) = cell.get() {
            return Ok(Arc::clone(partition));
        }

        let result = cell
            .get_or_try_init(|| {
                let load_language = language.to_string();
                let dir = self.artifact_dir.join(language);
                let dimension = self.dimension;
                async move {
                    debug!("Loading {} partition from {}", load_language, dir.display());
                    let task_language = load_language.clone();
                    match task::spawn_blocking(move || {
                        LanguagePartition::load(&task_language, &dir, dimension)
                    })
                    .await
                    {
                        Ok(outcome) => outcome.map(Arc::new),
                        Err(e) => Err(LoadError::Index {
                            language: load_language,
                            reason: format!("load task failed: {}", e),
                        }),
                    }
                }
            })
            .await;

        match result {
            Ok(partition) => {
                self.last_errors_lock().remove(language);
                Ok(Arc::clone(partition))
            }
            Err(e) => {
                self.last_errors_lock()
                    .insert(language.to_string(), e.to_string());
                Err(e)
            }
        }
    }

    /// Partition for `language` if it is already resident; never loads
    pub fn get(&self, language: &str) -> Option<Arc<LanguagePartition>> {
        self.cells
            .get(language)
            .and_then(|cell| cell.get())
            .map(Arc::clone)
    }

    /// How many partitions are resident
    pub fn loaded_count(&self) -> usize {
        self.cells.values().filter(|cell| cell.initialized()).count()
    }

    /// Per-language load state, in configuration order
    pub fn status(&self) -> Vec<PartitionStatus> {
        let last_errors = self.last_errors_lock();
        self.languages
            .iter()
            .map(|language| {
                let state = match self.get(language) {
                    Some(partition) => PartitionState::Loaded {
                        snippets: partition.len(),
                        loaded_at: partition.loaded_at(),
                    },
                    None => match last_errors.get(language) {
                        Some(error) => PartitionState::Failed {
                            error: error.clone(),
                        },
                        None => PartitionState::Unloaded,
                    },
                };
                PartitionStatus {
                    language: language.clone(),
                    state,
                }
            })
            .collect()
    }

    fn last_errors_lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // a poisoned map of error strings is still a map of error strings
        self.last_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
