use fchain_ledger::{Block, LedgerError, PersistenceError};
use fchain_store::StoreError;
use serde::Serialize;

/// Errors from the ingest pipeline.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Missing or malformed upload input. No block, no file.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The upload exceeded the size bound. No block, no file.
    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    /// Writing the uploaded bytes failed. No block, no file.
    #[error("storage error: {0}")]
    Storage(#[source] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The chain file could not be written. When `block` is set, that block
    /// is appended in memory but not yet on disk.
    #[error("ledger desynchronized from disk: {source}")]
    Persistence {
        block: Option<Box<Block>>,
        #[source]
        source: PersistenceError,
    },

    /// The chain file on disk cannot be trusted; startup must stop.
    #[error("chain file is corrupt: {0}")]
    CorruptChain(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TooLarge { limit } => Self::TooLarge { limit },
            StoreError::InvalidName(name) => Self::BadRequest(format!("invalid file name {name:?}")),
            other => Self::Storage(other),
        }
    }
}

/// Coarse error category, stable across versions for clients to match on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    TooLarge,
    Storage,
    Persistence,
    CorruptChain,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::TooLarge => "too_large",
            Self::Storage => "storage",
            Self::Persistence => "persistence",
            Self::CorruptChain => "corrupt_chain",
            Self::Internal => "internal",
        }
    }
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Persistence { .. } => ErrorKind::Persistence,
            Self::CorruptChain(_) => ErrorKind::CorruptChain,
            Self::Ledger(LedgerError::InvalidBlock(_)) => ErrorKind::BadRequest,
            Self::Ledger(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The block left in memory by a failed save, if any.
    pub fn unsaved_block(&self) -> Option<&Block> {
        match self {
            Self::Persistence { block, .. } => block.as_deref(),
            _ => None,
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
