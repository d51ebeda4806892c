// Shared configuration and domain types for snipseek
pub mod config;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::Error;
pub use models::CodeSnippet;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
