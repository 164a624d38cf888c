//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Message encoding or building failed.
    #[error("MIME error: {0}")]
    Mime(#[from] mailsmith_mime::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if the content could not be transcoded into the
    /// requested charset.
    #[must_use]
    pub const fn is_encoding_error(&self) -> bool {
        matches!(self, Self::Mime(e) if e.is_encoding_error())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
