//! Ingestion pipeline for fchain.
//!
//! Ties the content store, the ledger and chain persistence into one
//! operation: stream an upload to disk while hashing it, append a sealed
//! block, then save the whole chain atomically. This is the entry point for
//! embedding fchain without the HTTP layer.

pub mod error;
pub mod service;

pub use error::{ErrorKind, IngestError, IngestResult};
pub use service::{
    IngestConfig, IngestService, SyncStatus, DEFAULT_CHAIN_FILE, DEFAULT_MAX_UPLOAD_BYTES,
};

pub use fchain_ledger::{Block, ValidationReport, Violation, ViolationKind};
pub use fchain_store::{PendingUpload, StagedFile, StoredFile};
pub use fchain_types::Digest;
