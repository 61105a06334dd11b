use chrono::{DateTime, Utc};
use fchain_crypto::{FieldHasher, HashLinked};
use fchain_types::digest::genesis_link;
use fchain_types::Digest;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// One immutable record of a single file ingestion.
///
/// `hash` covers every other field, `prev_hash` included, and is fixed when
/// the block is sealed. A block whose fields no longer reproduce its hash
/// has been tampered with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    /// Client-supplied name, kept as metadata only.
    pub file_name: String,
    pub storage_path: String,
    pub file_digest: Digest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    /// Empty string on the wire for the genesis block.
    #[serde(with = "genesis_link")]
    pub prev_hash: Option<Digest>,
    pub hash: Digest,
}

/// Caller-supplied fields for the next block.
///
/// The ledger adds `index`, `prev_hash` and `hash` under its lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBlock {
    pub timestamp: DateTime<Utc>,
    pub file_name: String,
    pub storage_path: String,
    pub file_digest: Digest,
    pub external_ref: Option<String>,
}

impl NewBlock {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.file_name.is_empty() {
            return Err(LedgerError::InvalidBlock("file_name is empty".into()));
        }
        if self.storage_path.is_empty() {
            return Err(LedgerError::InvalidBlock("storage_path is empty".into()));
        }
        Ok(())
    }
}

impl Block {
    /// Build a block at `index` linked to `prev_hash` and compute its hash.
    pub fn seal(index: u64, prev_hash: Option<Digest>, fields: NewBlock) -> Self {
        let mut block = Self {
            index,
            timestamp: fields.timestamp,
            file_name: fields.file_name,
            storage_path: fields.storage_path,
            file_digest: fields.file_digest,
            external_ref: fields.external_ref,
            prev_hash,
            hash: Digest::from_hash([0; 32]),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Hash of every field except `hash`, in canonical framing.
    ///
    /// Field order: index, timestamp seconds, timestamp subsecond nanos,
    /// file_name, storage_path, file_digest, external_ref, prev_hash.
    pub fn compute_hash(&self) -> Digest {
        FieldHasher::new(FieldHasher::BLOCK_DOMAIN)
            .u64(self.index)
            .i64(self.timestamp.timestamp())
            .u32(self.timestamp.timestamp_subsec_nanos())
            .str(&self.file_name)
            .str(&self.storage_path)
            .digest(&self.file_digest)
            .opt_str(self.external_ref.as_deref())
            .opt_digest(self.prev_hash.as_ref())
            .finish()
    }

    pub fn verify_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Hex of `prev_hash`, or `""` for genesis.
    pub fn prev_hash_hex(&self) -> String {
        self.prev_hash.map(|d| d.to_hex()).unwrap_or_default()
    }
}

impl HashLinked for Block {
    fn position(&self) -> u64 {
        self.index
    }

    fn link_hash(&self) -> Digest {
        self.hash
    }

    fn prev_link(&self) -> Option<Digest> {
        self.prev_hash
    }

    fn recompute_hash(&self) -> Digest {
        self.compute_hash()
    }
}
