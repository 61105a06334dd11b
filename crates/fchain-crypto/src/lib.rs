//! Cryptographic primitives for fchain.
//!
//! Provides streaming SHA-256 content hashing, a domain-separated canonical
//! field hasher for block hashes, and hash chain verification.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod chain;
pub mod hasher;

pub use chain::{ChainError, HashChainVerifier, HashLinked};
pub use hasher::{ContentHasher, FieldHasher};
