use fchain_types::Digest;

/// Trait for records that participate in a hash chain.
pub trait HashLinked {
    /// Position the record claims in its chain.
    fn position(&self) -> u64;
    /// The record's stored hash.
    fn link_hash(&self) -> Digest;
    /// The previous record's hash (None for genesis).
    fn prev_link(&self) -> Option<Digest>;
    /// Hash recomputed from the record's own fields.
    fn recompute_hash(&self) -> Digest;
}

/// Hash chain integrity verifier.
///
/// Verifies that a sequence of records forms a valid hash chain:
/// positions count up from zero, each record's prev link matches the
/// previous record's hash, and each stored hash matches the hash recomputed
/// from the record's fields.
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Verify a chain, stopping at the first violation.
    pub fn verify_chain(records: &[impl HashLinked]) -> Result<(), ChainError> {
        for index in 0..records.len() {
            if let Some(err) = Self::check_record(records, index).into_iter().next() {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Every violation in the chain, in record order.
    pub fn violations(records: &[impl HashLinked]) -> Vec<ChainError> {
        (0..records.len())
            .flat_map(|index| Self::check_record(records, index))
            .collect()
    }

    fn check_record(records: &[impl HashLinked], index: usize) -> Vec<ChainError> {
        let record = &records[index];
        let mut found = Vec::new();

        if record.position() != index as u64 {
            found.push(ChainError::IndexMismatch {
                index,
                found: record.position(),
            });
        }

        if index == 0 {
            if record.prev_link().is_some() {
                found.push(ChainError::GenesisHasPrevHash);
            }
        } else {
            let expected_prev = records[index - 1].link_hash();
            match record.prev_link() {
                Some(prev) if prev == expected_prev => {}
                Some(_) => found.push(ChainError::BrokenLink { index }),
                None => found.push(ChainError::MissingPrevHash { index }),
            }
        }

        if record.recompute_hash() != record.link_hash() {
            found.push(ChainError::HashMismatch { index });
        }

        found
    }
}

/// Errors from chain verification.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("index mismatch at position {index}: record claims index {found}")]
    IndexMismatch { index: usize, found: u64 },

    #[error("genesis block has a previous hash (should be empty)")]
    GenesisHasPrevHash,

    #[error("broken link at index {index}: prev_hash does not match")]
    BrokenLink { index: usize },

    #[error("missing prev_hash at index {index} (should reference previous block)")]
    MissingPrevHash { index: usize },

    #[error("hash mismatch at index {index}: computed hash differs from stored")]
    HashMismatch { index: usize },
}

impl ChainError {
    /// Position in the chain where the violation was found.
    pub fn index(&self) -> usize {
        match self {
            Self::GenesisHasPrevHash => 0,
            Self::IndexMismatch { index, .. }
            | Self::BrokenLink { index }
            | Self::MissingPrevHash { index }
            | Self::HashMismatch { index } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::FieldHasher;

    struct TestRecord {
        position: u64,
        hash: Digest,
        prev: Option<Digest>,
        payload: String,
    }

    impl HashLinked for TestRecord {
        fn position(&self) -> u64 {
            self.position
        }
        fn link_hash(&self) -> Digest {
            self.hash
        }
        fn prev_link(&self) -> Option<Digest> {
            self.prev
        }
        fn recompute_hash(&self) -> Digest {
            hash_of(self.position, &self.payload, self.prev)
        }
    }

    fn hash_of(position: u64, payload: &str, prev: Option<Digest>) -> Digest {
        FieldHasher::new("test")
            .u64(position)
            .str(payload)
            .opt_digest(prev.as_ref())
            .finish()
    }

    fn build_chain(count: usize) -> Vec<TestRecord> {
        let mut chain = Vec::new();
        let mut prev = None;
        for i in 0..count {
            let payload = format!("record-{i}");
            let hash = hash_of(i as u64, &payload, prev);
            chain.push(TestRecord {
                position: i as u64,
                hash,
                prev,
                payload,
            });
            prev = Some(hash);
        }
        chain
    }

    #[test]
    fn empty_chain_is_valid() {
        let chain: Vec<TestRecord> = vec![];
        assert!(HashChainVerifier::verify_chain(&chain).is_ok());
    }

    #[test]
    fn multi_record_chain() {
        let chain = build_chain(10);
        assert!(HashChainVerifier::verify_chain(&chain).is_ok());
        assert!(HashChainVerifier::violations(&chain).is_empty());
    }

    #[test]
    fn genesis_with_prev_hash_fails() {
        let mut chain = build_chain(1);
        chain[0].prev = Some(Digest::from_hash([1; 32]));
        let err = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::GenesisHasPrevHash);
    }

    #[test]
    fn broken_link_detected() {
        let mut chain = build_chain(3);
        chain[2].prev = Some(Digest::from_hash([99; 32]));
        let err = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::BrokenLink { index: 2 });
    }

    #[test]
    fn missing_prev_hash_detected() {
        let mut chain = build_chain(3);
        chain[1].prev = None;
        let err = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::MissingPrevHash { index: 1 });
    }

    #[test]
    fn tampered_payload_detected() {
        let mut chain = build_chain(3);
        chain[1].payload = "tampered".into();
        let err = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::HashMismatch { index: 1 });
    }

    #[test]
    fn index_gap_detected() {
        let mut chain = build_chain(2);
        chain[1].position = 5;
        let violations = HashChainVerifier::violations(&chain);
        assert_eq!(violations[0], ChainError::IndexMismatch { index: 1, found: 5 });
    }

    #[test]
    fn violations_collects_everything() {
        let mut chain = build_chain(4);
        chain[1].payload = "tampered".into();
        chain[3].prev = None;
        let violations = HashChainVerifier::violations(&chain);
        assert_eq!(
            violations,
            vec![
                ChainError::HashMismatch { index: 1 },
                ChainError::MissingPrevHash { index: 3 },
                ChainError::HashMismatch { index: 3 },
            ]
        );
        assert_eq!(violations[1].index(), 3);
    }
}
