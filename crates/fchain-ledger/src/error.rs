use std::path::PathBuf;

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("integrity violation at index {index}: {reason}")]
    IntegrityViolation { index: u64, reason: String },

    #[error("invalid block fields: {0}")]
    InvalidBlock(String),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

/// Errors produced while reading or writing the chain file.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("chain file I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chain file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
