use chrono::{DateTime, Utc};
use serde::Serialize;
use snipseek_core::CodeSnippet;

/// Convert a raw index distance to a similarity score
///
/// Distances from the shipped artifacts are squared euclidean, so they are
/// non-negative and the score lands in (0, 1], with 1.0 for an exact match.
/// A metric that can go negative would push scores above 1.0; artifacts for
/// this service are not built with one.
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// A single search hit
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// The matched snippet
    #[serde(flatten)]
    pub snippet: CodeSnippet,

    /// Raw distance reported by the index (lower is better)
    pub distance: f32,

    /// Similarity score in (0, 1] (higher is better)
    pub similarity: f32,
}

impl SearchResult {
    pub fn new(snippet: CodeSnippet, distance: f32) -> Self {
        Self {
            snippet,
            distance,
            similarity: similarity_from_distance(distance),
        }
    }
}

/// Load state of one language partition
#[derive(Debug, Clone)]
pub enum PartitionState {
    /// No load has been requested yet
    Unloaded,

    /// Resident in memory
    Loaded {
        snippets: usize,
        loaded_at: DateTime<Utc>,
    },

    /// The most recent load attempt failed; the next request retries
    Failed { error: String },
}

/// Status row for one configured language
#[derive(Debug, Clone)]
pub struct PartitionStatus {
    pub language: String,
    pub state: PartitionState,
}
