use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use fchain_crypto::HashChainVerifier;
use fchain_types::Digest;
use tracing::debug;

use crate::block::{Block, NewBlock};
use crate::error::LedgerError;
use crate::validation::{ChainValidator, ValidationReport};

/// Append-only, hash-linked block sequence.
///
/// `append` holds the write lock across reading the tail, sealing the new
/// block and pushing it, so concurrent appends are linearized and no two of
/// them see the same `(index, prev_hash)`. Readers take the read lock and
/// only ever see whole blocks.
pub struct Ledger {
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    blocks: Vec<Block>,
}

impl Ledger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerState::default()),
        }
    }

    /// Rebuild a ledger from persisted blocks, re-verifying the whole chain.
    pub fn restore(blocks: Vec<Block>) -> Result<Self, LedgerError> {
        HashChainVerifier::verify_chain(&blocks).map_err(|e| LedgerError::IntegrityViolation {
            index: e.index() as u64,
            reason: e.to_string(),
        })?;
        debug!(blocks = blocks.len(), "ledger restored");
        Ok(Self {
            inner: RwLock::new(LedgerState { blocks }),
        })
    }

    /// Seal `fields` as the next block and append it.
    pub fn append(&self, fields: NewBlock) -> Result<Block, LedgerError> {
        fields.validate()?;

        let mut state = self.write_state()?;
        let index = state.blocks.len() as u64;
        let prev_hash = state.blocks.last().map(|b| b.hash);
        let block = Block::seal(index, prev_hash, fields);
        state.blocks.push(block.clone());

        Ok(block)
    }

    /// Copy of the full block sequence.
    pub fn snapshot(&self) -> Result<Vec<Block>, LedgerError> {
        Ok(self.read_state()?.blocks.clone())
    }

    /// Hash of the last block, if any.
    pub fn head(&self) -> Result<Option<Digest>, LedgerError> {
        Ok(self.read_state()?.blocks.last().map(|b| b.hash))
    }

    /// Hex of the last block's hash, or `""` when empty.
    pub fn last_hash(&self) -> Result<String, LedgerError> {
        Ok(self.head()?.map(|d| d.to_hex()).unwrap_or_default())
    }

    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.read_state()?.blocks.len())
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, index: u64) -> Result<Option<Block>, LedgerError> {
        let state = self.read_state()?;
        Ok(usize::try_from(index)
            .ok()
            .and_then(|i| state.blocks.get(i))
            .cloned())
    }

    /// Check every chain invariant over the current blocks.
    pub fn validate(&self) -> Result<ValidationReport, LedgerError> {
        let state = self.read_state()?;
        Ok(ChainValidator::validate(&state.blocks))
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.inner.write().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
