use std::fs;
use std::path::{Path, PathBuf};

use fchain_crypto::ContentHasher;
use fchain_types::Digest;
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::name::sanitize_file_name;

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Filesystem-backed content store.
///
/// Each upload is streamed into a hidden temp file inside the storage root,
/// hashed as it is written, and only moved to its final name once complete.
/// Final names are `<uuid-v7>-<sanitized name>`, so concurrent uploads
/// carrying the same client name never touch each other's bytes.
#[derive(Clone, Debug)]
pub struct FsContentStore {
    root: PathBuf,
    max_upload_bytes: u64,
}

/// A file that has been fully written and committed under the storage root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    /// Name as supplied by the client, unsanitized.
    pub original_name: String,
    pub path: PathBuf,
    pub digest: Digest,
    pub size: u64,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>, max_upload_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_upload_bytes,
        }
    }

    /// Create the storage root if needed and return a store over it.
    pub fn open(root: impl Into<PathBuf>, max_upload_bytes: u64) -> StoreResult<Self> {
        let store = Self::new(root, max_upload_bytes);
        fs::create_dir_all(&store.root)?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Start a streaming upload.
    pub async fn begin(&self, name: &str) -> StoreResult<PendingUpload> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidName(name.to_string()));
        }

        let stored_name = format!("{}-{}", Uuid::now_v7().simple(), sanitize_file_name(name));
        let target = self.root.join(stored_name);

        let root = self.root.clone();
        let (temp, file) = blocking(move || {
            let temp = tempfile::Builder::new()
                .prefix(".upload-")
                .suffix(".part")
                .tempfile_in(&root)?;
            let file = temp.as_file().try_clone()?;
            Ok((temp, file))
        })
        .await?;
        let file = tokio::fs::File::from_std(file);

        debug!(temp = %temp.path().display(), target = %target.display(), "upload started");

        Ok(PendingUpload {
            original_name: name.to_string(),
            target,
            temp,
            file,
            hasher: ContentHasher::new(),
            limit: self.max_upload_bytes,
        })
    }

    /// Stream `reader` into the store and commit it.
    pub async fn store<R>(&self, name: &str, mut reader: R) -> StoreResult<StoredFile>
    where
        R: AsyncRead + Unpin,
    {
        let mut pending = self.begin(name).await?;
        let mut buf = vec![0u8; COPY_BUF_SIZE];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            pending.write(&buf[..n]).await?;
        }
        pending.finish().await?.commit().await
    }
}

/// Run filesystem metadata calls off the async worker threads.
async fn blocking<T, F>(op: F) -> StoreResult<T>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(std::io::Error::other)?
        .map_err(StoreError::Io)
}

/// An upload in progress. Dropping it deletes everything written so far.
pub struct PendingUpload {
    original_name: String,
    target: PathBuf,
    temp: NamedTempFile,
    file: tokio::fs::File,
    hasher: ContentHasher,
    limit: u64,
}

impl PendingUpload {
    /// Write the next chunk to disk and into the digest.
    pub async fn write(&mut self, chunk: &[u8]) -> StoreResult<()> {
        let total = self.hasher.bytes_hashed() + chunk.len() as u64;
        if total > self.limit {
            return Err(StoreError::TooLarge { limit: self.limit });
        }
        self.file.write_all(chunk).await?;
        self.hasher.update(chunk);
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.hasher.bytes_hashed()
    }

    /// Flush and fsync the content, fixing its digest.
    pub async fn finish(mut self) -> StoreResult<StagedFile> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        let size = self.hasher.bytes_hashed();
        Ok(StagedFile {
            original_name: self.original_name,
            target: self.target,
            temp: self.temp,
            digest: self.hasher.finalize(),
            size,
        })
    }
}

/// Fully written and hashed content, still under its temp name.
///
/// Dropping a staged file deletes it, so a request that fails after the
/// bytes arrived leaves nothing behind.
pub struct StagedFile {
    original_name: String,
    target: PathBuf,
    temp: NamedTempFile,
    digest: Digest,
    size: u64,
}

impl StagedFile {
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Move the content to its final name. Never overwrites an existing file.
    pub async fn commit(self) -> StoreResult<StoredFile> {
        let temp = self.temp;
        let target = self.target.clone();
        blocking(move || {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o644))?;
            }
            temp.persist_noclobber(&target).map(drop).map_err(|e| e.error)
        })
        .await?;

        debug!(
            path = %self.target.display(),
            digest = %self.digest.short_hex(),
            size = self.size,
            "upload committed"
        );

        Ok(StoredFile {
            original_name: self.original_name,
            path: self.target,
            digest: self.digest,
            size: self.size,
        })
    }
}
