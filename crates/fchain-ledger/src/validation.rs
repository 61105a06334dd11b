use fchain_crypto::{ChainError, HashChainVerifier};
use fchain_types::Digest;
use serde::Serialize;

use crate::block::Block;

/// Result of validating a block sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub block_count: u64,
    pub head: Option<Digest>,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub index: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    IndexMismatch,
    GenesisHasPrevHash,
    MissingPrevHash,
    BrokenLink,
    HashMismatch,
}

impl From<ChainError> for Violation {
    fn from(err: ChainError) -> Self {
        let kind = match err {
            ChainError::IndexMismatch { .. } => ViolationKind::IndexMismatch,
            ChainError::GenesisHasPrevHash => ViolationKind::GenesisHasPrevHash,
            ChainError::MissingPrevHash { .. } => ViolationKind::MissingPrevHash,
            ChainError::BrokenLink { .. } => ViolationKind::BrokenLink,
            ChainError::HashMismatch { .. } => ViolationKind::HashMismatch,
        };
        Self {
            index: err.index() as u64,
            kind,
            description: err.to_string(),
        }
    }
}

/// Whole-chain integrity validator.
///
/// Unlike [`HashChainVerifier::verify_chain`], which stops at the first
/// problem, this reports every violation so an operator can see the full
/// extent of any damage.
pub struct ChainValidator;

impl ChainValidator {
    pub fn validate(blocks: &[Block]) -> ValidationReport {
        ValidationReport {
            block_count: blocks.len() as u64,
            head: blocks.last().map(|b| b.hash),
            violations: HashChainVerifier::violations(blocks)
                .into_iter()
                .map(Violation::from)
                .collect(),
        }
    }
}
