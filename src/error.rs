//! Error types for merkle_guard

use thiserror::Error;

/// Result type alias for merkle_guard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by a caller-supplied leaf digest function
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in merkle_guard operations
#[derive(Error, Debug)]
pub enum Error {
    /// The leaf digest function rejected an item.
    ///
    /// The original error is kept as `source` and can be recovered with
    /// `downcast_ref`.
    #[error("Leaf digest failed: {source}")]
    Digest {
        #[source]
        source: BoxError,
    },

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl Error {
    /// Wrap an arbitrary error raised while digesting a leaf
    pub fn digest(source: impl Into<BoxError>) -> Self {
        Error::Digest {
            source: source.into(),
        }
    }
}
