use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use fchain_ledger::{
    Block, ChainPersistence, JsonChainFile, Ledger, NewBlock, PersistenceError, ValidationReport,
};
use fchain_store::{FsContentStore, StagedFile, StoredFile};
use fchain_types::Digest;
use serde::Serialize;
use tokio::io::AsyncRead;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{IngestError, IngestResult};

/// Chain file name used when none is configured.
pub const DEFAULT_CHAIN_FILE: &str = "chain.json";

/// Upload size bound used when none is configured (1 GiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1 << 30;

/// Where ingested content and the chain live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestConfig {
    pub storage_dir: PathBuf,
    pub chain_file: PathBuf,
    pub max_upload_bytes: u64,
}

impl IngestConfig {
    /// Defaults rooted at `storage_dir`: `<storage_dir>/chain.json`, 1 GiB uploads.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        let storage_dir = storage_dir.into();
        Self {
            chain_file: storage_dir.join(DEFAULT_CHAIN_FILE),
            storage_dir,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Whether the chain file has caught up with the in-memory ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub block_count: usize,
    pub persisted_count: usize,
    /// `true` while the ledger holds blocks the chain file does not.
    pub dirty: bool,
    pub head: Option<Digest>,
    pub chain_file: String,
}

/// Orchestrates one ingestion: content store, then ledger append, then
/// chain save.
///
/// The in-memory ledger is authoritative. If a save fails the block stays
/// appended, the service reports itself dirty, and the next successful save
/// (after a later upload, or an explicit [`reconcile`](Self::reconcile))
/// writes the whole chain and clears it.
pub struct IngestService {
    ledger: Arc<Ledger>,
    store: FsContentStore,
    persistence: Arc<dyn ChainPersistence>,
    /// Serializes saves; holds the block count known to be on disk. The
    /// guard travels with the blocking save, so a cancelled request cannot
    /// release it while a rename is still pending.
    save_lock: Arc<Mutex<usize>>,
    persisted: Arc<AtomicUsize>,
}

impl IngestService {
    /// Create the storage directory, load the chain file and verify it.
    ///
    /// A chain file that cannot be decoded or fails verification is
    /// [`IngestError::CorruptChain`]; callers must not start serving.
    pub fn open(config: IngestConfig) -> IngestResult<Self> {
        let store = FsContentStore::open(&config.storage_dir, config.max_upload_bytes)?;
        let persistence = JsonChainFile::new(&config.chain_file);

        let blocks = persistence.load().map_err(|e| match e {
            PersistenceError::Corrupt { .. } => IngestError::CorruptChain(e.to_string()),
            other => IngestError::Persistence {
                block: None,
                source: other,
            },
        })?;
        let ledger = Ledger::restore(blocks)
            .map_err(|e| IngestError::CorruptChain(format!("{}: {e}", persistence.location())))?;

        let service = Self::new(Arc::new(ledger), store, Arc::new(persistence))?;
        let status = service.status()?;
        info!(
            storage = %config.storage_dir.display(),
            chain = %status.chain_file,
            blocks = status.block_count,
            "ledger opened"
        );
        Ok(service)
    }

    /// Assemble a service from parts. `ledger` must hold exactly what
    /// `persistence` holds.
    pub fn new(
        ledger: Arc<Ledger>,
        store: FsContentStore,
        persistence: Arc<dyn ChainPersistence>,
    ) -> IngestResult<Self> {
        let persisted = ledger.len()?;
        Ok(Self {
            ledger,
            store,
            persistence,
            save_lock: Arc::new(Mutex::new(persisted)),
            persisted: Arc::new(AtomicUsize::new(persisted)),
        })
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn store(&self) -> &FsContentStore {
        &self.store
    }

    /// Ingest `reader` under the client-supplied `name`.
    pub async fn handle_upload<R>(
        &self,
        name: &str,
        reader: R,
        external_ref: Option<String>,
    ) -> IngestResult<Block>
    where
        R: AsyncRead + Unpin,
    {
        if name.trim().is_empty() {
            return Err(IngestError::BadRequest("file name is required".into()));
        }

        let stored = self.store.store(name, reader).await.map_err(|e| {
            warn!(file = name, error = %e, "upload not stored");
            IngestError::from(e)
        })?;
        self.record(stored, external_ref).await
    }

    /// Ingest content that was already streamed and staged by the caller.
    pub async fn ingest_staged(
        &self,
        staged: StagedFile,
        external_ref: Option<String>,
    ) -> IngestResult<Block> {
        let name = staged.original_name().to_string();
        let stored = staged.commit().await.map_err(|e| {
            warn!(file = %name, error = %e, "staged upload not committed");
            IngestError::from(e)
        })?;
        self.record(stored, external_ref).await
    }

    /// Full block sequence.
    pub fn chain(&self) -> IngestResult<Vec<Block>> {
        Ok(self.ledger.snapshot()?)
    }

    pub fn block(&self, index: u64) -> IngestResult<Option<Block>> {
        Ok(self.ledger.get(index)?)
    }

    pub fn verify(&self) -> IngestResult<ValidationReport> {
        Ok(self.ledger.validate()?)
    }

    pub fn status(&self) -> IngestResult<SyncStatus> {
        let block_count = self.ledger.len()?;
        let persisted_count = self.persisted.load(Ordering::Acquire);
        Ok(SyncStatus {
            block_count,
            persisted_count,
            dirty: block_count > persisted_count,
            head: self.ledger.head()?,
            chain_file: self.persistence.location(),
        })
    }

    /// Write the full chain to disk now, clearing any divergence.
    pub async fn reconcile(&self) -> IngestResult<SyncStatus> {
        let was_dirty = self.status()?.dirty;
        self.persist().await.inspect_err(|e| {
            error!(error = %e, "reconcile failed; ledger still ahead of disk");
        })?;
        if was_dirty {
            info!("chain file reconciled with ledger");
        }
        self.status()
    }

    async fn record(&self, stored: StoredFile, external_ref: Option<String>) -> IngestResult<Block> {
        let fields = NewBlock {
            timestamp: Utc::now(),
            file_name: stored.original_name.clone(),
            storage_path: stored.path.display().to_string(),
            file_digest: stored.digest,
            external_ref,
        };

        let block = match self.ledger.append(fields) {
            Ok(block) => block,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&stored.path).await {
                    warn!(path = %stored.path.display(), error = %rm, "orphaned upload not removed");
                }
                return Err(e.into());
            }
        };

        info!(
            index = block.index,
            hash = %block.hash.short_hex(),
            digest = %block.file_digest.short_hex(),
            size = stored.size,
            file = %block.file_name,
            "block appended"
        );

        match self.persist().await {
            Ok(_) => Ok(block),
            Err(IngestError::Persistence { source, .. }) => {
                error!(
                    index = block.index,
                    error = %source,
                    "chain file save failed; ledger is ahead of disk"
                );
                Err(IngestError::Persistence {
                    block: Some(Box::new(block)),
                    source,
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Save the current snapshot unless the file already holds it.
    ///
    /// The snapshot is taken under the save lock, so saves land in ledger
    /// order and the file never goes back to a shorter chain. The owned
    /// guard is held by the blocking task until its rename is done, even if
    /// the calling request is dropped meanwhile.
    async fn persist(&self) -> IngestResult<usize> {
        let mut guard = Arc::clone(&self.save_lock).lock_owned().await;
        let blocks = self.ledger.snapshot()?;
        let count = blocks.len();
        if count == *guard {
            return Ok(count);
        }

        let persistence = Arc::clone(&self.persistence);
        let persisted = Arc::clone(&self.persisted);
        tokio::task::spawn_blocking(move || -> Result<(), PersistenceError> {
            persistence.save(&blocks)?;
            *guard = count;
            persisted.store(count, Ordering::Release);
            Ok(())
        })
        .await
        .map_err(|e| IngestError::Internal(format!("save task failed: {e}")))?
        .map_err(|source| IngestError::Persistence {
            block: None,
            source,
        })?;

        Ok(count)
    }
}
