//! Content store for fchain.
//!
//! Uploaded bytes live here, outside the ledger; blocks only reference them
//! by path and SHA-256 digest.
//!
//! # Upload lifecycle
//!
//! 1. [`FsContentStore::begin`] opens a temp file inside the storage root.
//! 2. [`PendingUpload::write`] streams chunks to disk and into the digest in
//!    one pass, enforcing the size bound.
//! 3. [`PendingUpload::finish`] fsyncs and yields a [`StagedFile`].
//! 4. [`StagedFile::commit`] renames it to `<uuid-v7>-<sanitized name>`.
//!
//! Dropping the upload at any step before commit deletes the temp file, so
//! a failed upload never leaves a file behind.

pub mod disk;
pub mod error;
pub mod name;

pub use disk::{FsContentStore, PendingUpload, StagedFile, StoredFile};
pub use error::{StoreError, StoreResult};
pub use name::sanitize_file_name;
