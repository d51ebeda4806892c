// Test doubles and artifact builders shared by this crate's unit tests.

use crate::embeddings::TextEncoder;
use crate::error::EmbeddingError;
use crate::partition::{PartitionMetadata, INDEX_FILE, METADATA_FILE};
use snipseek_core::config::{Config, IndexConfig, SearchConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use usearch::ffi::{IndexOptions, MetricKind, ScalarKind};
use usearch::Index;

/// Deterministic encoder for tests
///
/// Unpinned texts hash to a stable pseudo-random vector; pinned texts
/// return exactly the vector staged for them, so a test controls the
/// geometry that matters and ignores the rest.
pub(crate) struct StubEncoder {
    claimed_dimension: usize,
    emit_dimension: usize,
    pinned: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl StubEncoder {
    /// Encoder producing `dimension`-wide vectors derived from the text
    pub(crate) fn keyed(dimension: usize) -> Self {
        Self {
            claimed_dimension: dimension,
            emit_dimension: dimension,
            pinned: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Encoder that claims one width but emits another
    pub(crate) fn lying(claimed: usize, emitted: usize) -> Self {
        Self {
            claimed_dimension: claimed,
            emit_dimension: emitted,
            pinned: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Pin an exact vector for an exact input text
    pub(crate) fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.pinned.insert(text.to_string(), vector);
        self
    }

    /// How many encode calls this stub has served
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.pinned.get(text) {
            return vector.clone();
        }

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish() | 1;

        (0..self.emit_dimension)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 40) as f32) / (1u64 << 24) as f32 - 0.5
            })
            .collect()
    }
}

impl TextEncoder for StubEncoder {
    fn dimension(&self) -> usize {
        self.claimed_dimension
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}

/// Write a partition artifact pair the way the offline index builder does
pub(crate) fn write_partition(
    root: &Path,
    language: &str,
    vectors: &[Vec<f32>],
    code: &[&str],
) -> PathBuf {
    write_artifacts(root, language, vectors, code, None)
}

/// Same as [`write_partition`], with a docstring per snippet
pub(crate) fn write_partition_with_docs(
    root: &Path,
    language: &str,
    vectors: &[Vec<f32>],
    code: &[&str],
    docs: &[&str],
) -> PathBuf {
    write_artifacts(root, language, vectors, code, Some(docs))
}

fn write_artifacts(
    root: &Path,
    language: &str,
    vectors: &[Vec<f32>],
    code: &[&str],
    docs: Option<&[&str]>,
) -> PathBuf {
    let dir = root.join(language);
    std::fs::create_dir_all(&dir).unwrap();

    let dimension = vectors.first().map_or(4, Vec::len);
    let options = IndexOptions {
        dimensions: dimension,
        metric: MetricKind::L2sq,
        quantization: ScalarKind::F32,
        ..Default::default()
    };
    let index = Index::new(&options).unwrap();
    index.reserve(vectors.len()).unwrap();
    for (position, vector) in vectors.iter().enumerate() {
        index.add(position as u64, vector).unwrap();
    }
    index.save(&dir.join(INDEX_FILE).to_string_lossy()).unwrap();

    let metadata = PartitionMetadata {
        code: code.iter().map(|s| s.to_string()).collect(),
        docs: docs.map(|d| d.iter().map(|s| s.to_string()).collect()),
    };
    std::fs::write(
        dir.join(METADATA_FILE),
        rmp_serde::to_vec(&metadata).unwrap(),
    )
    .unwrap();

    dir
}

/// Config pointing at a temp artifact dir, for service-level tests
pub(crate) fn test_config(artifact_dir: &Path, languages: &[&str]) -> Config {
    Config {
        search: SearchConfig {
            languages: languages.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
        index: IndexConfig {
            artifact_dir: artifact_dir.to_path_buf(),
        },
        embedding: Default::default(),
    }
}
