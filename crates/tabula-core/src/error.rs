use thiserror::Error;

/// Top-level error type for Tabula.
///
/// Library crates with their own error enums implement
/// `From<TabulaError>` so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TabulaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for TabulaError {
    fn from(err: toml::de::Error) -> Self {
        TabulaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TabulaError {
    fn from(err: toml::ser::Error) -> Self {
        TabulaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TabulaError {
    fn from(err: serde_json::Error) -> Self {
        TabulaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Tabula operations.
pub type Result<T> = std::result::Result<T, TabulaError>;
