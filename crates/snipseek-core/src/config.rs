use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// This gets loaded from the config file when one exists.
/// Priority: explicit path > default file > defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl Config {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from an explicit path
    ///
    /// A missing file is not an error; you just get the defaults.
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Get the config file path
    /// Uses XDG on Linux/macOS, AppData on Windows
    fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("snipseek");

        Ok(config_dir.join("config.toml"))
    }
}

/// Which languages are searchable and how many results come back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Languages with a prebuilt index partition
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Result count when the caller does not ask for one
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Hard ceiling on the requested result count
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
}

fn default_languages() -> Vec<String> {
    ["go", "java", "javascript", "php", "python", "ruby"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_top_k() -> usize {
    3
}

fn default_max_top_k() -> usize {
    20 // past this it's noise, not search
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
        }
    }
}

/// Where the prebuilt index artifacts live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory with one subdirectory per language partition
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

fn default_artifact_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".data"))
        .join("snipseek")
        .join("partitions")
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
        }
    }
}

/// Embedding model selection and encoder limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model name
    ///
    /// Must match the model the index artifacts were built with, or the
    /// query vectors land in the wrong space and results are garbage.
    #[serde(default = "default_model")]
    pub model: String,

    /// Where downloaded model files are cached
    #[serde(default = "default_model_cache_dir")]
    pub cache_dir: PathBuf,

    /// Token budget per input text; longer inputs get truncated
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,

    /// How many texts go through the encoder per call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

fn default_model_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("snipseek")
        .join("models")
}

fn default_max_sequence_length() -> usize {
    512 // BERT-family context limit
}

fn default_batch_size() -> usize {
    16
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            cache_dir: default_model_cache_dir(),
            max_sequence_length: default_max_sequence_length(),
            batch_size: default_batch_size(),
        }
    }
}
