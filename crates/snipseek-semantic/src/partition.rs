use crate::error::{LoadError, SearchError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snipseek_core::CodeSnippet;
use std::path::Path;
use tracing::{info, warn};
use usearch::ffi::{IndexOptions, MetricKind, ScalarKind};
use usearch::Index;

/// File names inside a partition directory
pub(crate) const INDEX_FILE: &str = "index.usearch";
pub(crate) const METADATA_FILE: &str = "metadata.msgpack";

/// On-disk metadata payload for one partition
///
/// Written by the offline index builder. Entry `i` describes the vector
/// stored under key `i` in the companion usearch file; `docs`, when
/// present, must run parallel to `code`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PartitionMetadata {
    pub code: Vec<String>,
    pub docs: Option<Vec<String>>,
}

/// One language's share of the prebuilt index, resident in memory
///
/// The vector index stores keys `0..n` and the snippet list has length
/// `n`; key `k` is the vector for snippet `k`. Loading refuses artifacts
/// that break that correspondence rather than guessing which half to
/// trust.
pub struct LanguagePartition {
    language: String,
    index: Index,
    snippets: Vec<CodeSnippet>,
    loaded_at: DateTime<Utc>,
}

impl LanguagePartition {
    /// Load one language's artifacts from `dir`
    ///
    /// `dimension` is the vector width the embedding model produces; an
    /// artifact built for a different width is rejected. This does real
    /// file IO and deserialization, so async callers should run it on the
    /// blocking pool.
    pub fn load(language: &str, dir: &Path, dimension: usize) -> Result<Self, LoadError> {
        let index_path = dir.join(INDEX_FILE);
        let metadata_path = dir.join(METADATA_FILE);

        for path in [&index_path, &metadata_path] {
            if !path.exists() {
                return Err(LoadError::MissingArtifact {
                    language: language.to_string(),
                    path: path.clone(),
                });
            }
        }

        let raw = std::fs::read(&metadata_path).map_err(|source| LoadError::Io {
            language: language.to_string(),
            source,
        })?;
        let metadata: PartitionMetadata =
            rmp_serde::from_slice(&raw).map_err(|e| LoadError::Metadata {
                language: language.to_string(),
                reason: e.to_string(),
            })?;
        let snippet_count = metadata.code.len();

        let options = IndexOptions {
            dimensions: dimension,
            metric: MetricKind::L2sq,
            quantization: ScalarKind::F32,
            ..Default::default()
        };
        let index = Index::new(&options)
            .and_then(|idx| {
                idx.load(&index_path.to_string_lossy())?;
                Ok(idx)
            })
            .map_err(|e| LoadError::Index {
                language: language.to_string(),
                reason: e.to_string(),
            })?;

        if index.dimensions() != dimension {
            return Err(LoadError::Index {
                language: language.to_string(),
                reason: format!(
                    "artifact is {}-dimensional but the model produces {}-dimensional vectors",
                    index.dimensions(),
                    dimension
                ),
            });
        }

        let vectors = index.size();
        if vectors != snippet_count {
            warn!(
                "Corrupt artifact for {}: index holds {} vectors, metadata lists {} snippets",
                language, vectors, snippet_count
            );
            return Err(LoadError::Corrupt {
                language: language.to_string(),
                vectors,
                snippets: snippet_count,
            });
        }

        let docs = match metadata.docs {
            Some(docs) if docs.len() == snippet_count => Some(docs),
            Some(docs) => {
                warn!(
                    "Ignoring docstrings for {}: {} entries for {} snippets",
                    language,
                    docs.len(),
                    snippet_count
                );
                None
            }
            None => None,
        };

        let snippets: Vec<CodeSnippet> = match docs {
            Some(docs) => metadata
                .code
                .into_iter()
                .zip(docs)
                .map(|(code, doc)| {
                    // the builder writes empty strings for undocumented snippets
                    if doc.trim().is_empty() {
                        CodeSnippet::new(code)
                    } else {
                        CodeSnippet::new(code).with_doc(doc)
                    }
                })
                .collect(),
            None => metadata.code.into_iter().map(CodeSnippet::new).collect(),
        };

        info!("Loaded {} partition: {} snippets", language, snippets.len());

        Ok(Self {
            language: language.to_string(),
            index,
            snippets,
            loaded_at: Utc::now(),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Number of snippets (and vectors) in this partition
    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// When this partition was brought into memory
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Snippet stored under a vector key, if the key is in range
    pub fn snippet(&self, position: usize) -> Option<&CodeSnippet> {
        self.snippets.get(position)
    }

    /// Nearest neighbors of `vector`, as (position, distance) pairs
    ///
    /// Results come back closest first. `top_k` is capped at the partition
    /// size, and a key outside the snippet range is dropped rather than
    /// surfaced as a phantom hit.
    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<(usize, f32)>, SearchError> {
        let k = top_k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let matches = self
            .index
            .search(vector, k)
            .map_err(|e| SearchError::QueryFailed {
                language: self.language.clone(),
                reason: e.to_string(),
            })?;

        Ok(matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .filter_map(|(&key, &distance)| {
                let position = key as usize;
                if position < self.snippets.len() {
                    Some((position, distance))
                } else {
                    warn!(
                        "Dropping out-of-range key {} from the {} index",
                        key, self.language
                    );
                    None
                }
            })
            .collect())
    }
}

impl std::fmt::Debug for LanguagePartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguagePartition")
            .field("language", &self.language)
            .field("snippets", &self.snippets.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use tempfile::TempDir;

    #[test]
    fn test_load_reads_snippets_and_docs() {
        let tmp = TempDir::new().unwrap();
        testutil::write_partition_with_docs(
            tmp.path(),
            "python",
            &[
                vec![0.0, 0.0, 0.0, 0.0],
                vec![1.0, 0.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0, 0.0],
            ],
            &["a()", "b()", "c()"],
            &["does a", "", "does c"],
        );

        let partition = LanguagePartition::load("python", &tmp.path().join("python"), 4).unwrap();

        assert_eq!(partition.language(), "python");
        assert_eq!(partition.len(), 3);
        assert_eq!(partition.snippet(0).unwrap().code, "a()");
        assert_eq!(partition.snippet(0).unwrap().doc.as_deref(), Some("does a"));
        // an empty docstring means "no doc", not "doc of length zero"
        assert!(partition.snippet(1).unwrap().doc.is_none());
        assert_eq!(partition.snippet(2).unwrap().doc.as_deref(), Some("does c"));
        assert!(partition.snippet(3).is_none());
    }

    #[test]
    fn test_query_orders_by_distance() {
        let tmp = TempDir::new().unwrap();
        testutil::write_partition(
            tmp.path(),
            "go",
            &[
                vec![0.0, 0.0, 0.0, 0.0],
                vec![3.0f32.sqrt(), 0.0, 0.0, 0.0],
                vec![1.0, 0.0, 0.0, 0.0],
            ],
            &["a()", "b()", "c()"],
        );
        let partition = LanguagePartition::load("go", &tmp.path().join("go"), 4).unwrap();

        let hits = partition.query(&[0.0, 0.0, 0.0, 0.0], 3).unwrap();

        let positions: Vec<usize> = hits.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![0, 2, 1]);
        assert!(hits[0].1.abs() < 1e-3);
        assert!((hits[1].1 - 1.0).abs() < 1e-3);
        assert!((hits[2].1 - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_query_caps_k_at_partition_size() {
        let tmp = TempDir::new().unwrap();
        let vectors: Vec<Vec<f32>> = (0..5)
            .map(|i| vec![i as f32, 0.0, 0.0, 0.0])
            .collect();
        let code: Vec<String> = (0..5).map(|i| format!("fn_{}()", i)).collect();
        let code_refs: Vec<&str> = code.iter().map(String::as_str).collect();
        testutil::write_partition(tmp.path(), "java", &vectors, &code_refs);
        let partition = LanguagePartition::load("java", &tmp.path().join("java"), 4).unwrap();

        let hits = partition.query(&[0.0, 0.0, 0.0, 0.0], 100).unwrap();
        assert_eq!(hits.len(), 5);

        let distances: Vec<f32> = hits.iter().map(|(_, d)| *d).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_missing_artifact_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = LanguagePartition::load("ruby", &tmp.path().join("ruby"), 4).unwrap_err();
        match err {
            LoadError::MissingArtifact { language, path } => {
                assert_eq!(language, "ruby");
                assert!(path.ends_with(INDEX_FILE));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_count_mismatch_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        testutil::write_partition(
            tmp.path(),
            "php",
            &[
                vec![0.0, 0.0, 0.0, 1.0],
                vec![0.0, 0.0, 1.0, 0.0],
                vec![0.0, 1.0, 0.0, 0.0],
            ],
            &["one()", "two()"],
        );

        let err = LanguagePartition::load("php", &tmp.path().join("php"), 4).unwrap_err();
        match err {
            LoadError::Corrupt {
                language,
                vectors,
                snippets,
            } => {
                assert_eq!(language, "php");
                assert_eq!(vectors, 3);
                assert_eq!(snippets, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_garbage_metadata_is_not_corrupt_silence() {
        let tmp = TempDir::new().unwrap();
        let dir =
            testutil::write_partition(tmp.path(), "go", &[vec![0.0, 0.0, 0.0, 1.0]], &["a()"]);
        std::fs::write(dir.join(METADATA_FILE), b"definitely not msgpack").unwrap();

        let err = LanguagePartition::load("go", &dir, 4).unwrap_err();
        assert!(matches!(err, LoadError::Metadata { .. }));
    }

    #[test]
    fn test_doc_count_mismatch_drops_docs_only() {
        let tmp = TempDir::new().unwrap();
        testutil::write_partition_with_docs(
            tmp.path(),
            "ruby",
            &[vec![0.0, 0.0, 0.0, 1.0], vec![0.0, 0.0, 1.0, 0.0]],
            &["a()", "b()"],
            &["only one doc"],
        );

        let partition = LanguagePartition::load("ruby", &tmp.path().join("ruby"), 4).unwrap();
        assert_eq!(partition.len(), 2);
        assert!(partition.snippet(0).unwrap().doc.is_none());
        assert!(partition.snippet(1).unwrap().doc.is_none());
    }
}
