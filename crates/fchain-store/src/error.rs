/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The upload grew past the configured size bound.
    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    /// The supplied file name cannot be used at all.
    #[error("invalid file name: {0:?}")]
    InvalidName(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
