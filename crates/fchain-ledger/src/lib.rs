//! Append-only, hash-linked file ingestion ledger.
//!
//! This crate is the heart of fchain. It provides:
//! - [`Block`], one immutable ingestion record sealed with a SHA-256 hash
//!   over a canonical field framing
//! - [`Ledger`], the in-memory block sequence with a single linearized
//!   append path
//! - [`ChainValidator`], a whole-chain integrity report
//! - [`ChainPersistence`] / [`JsonChainFile`], atomic replace-on-write
//!   storage of the chain
//!
//! Invariants held by every ledger:
//! - `blocks[i].index == i`
//! - `blocks[0].prev_hash` is empty, and `blocks[i].prev_hash == blocks[i-1].hash`
//! - `blocks[i].hash` recomputes from the block's other fields
//! - blocks are never mutated or removed once appended

pub mod block;
pub mod error;
pub mod ledger;
pub mod persistence;
pub mod validation;

pub use block::{Block, NewBlock};
pub use error::{LedgerError, PersistenceError};
pub use ledger::Ledger;
pub use persistence::{ChainPersistence, JsonChainFile};
pub use validation::{ChainValidator, ValidationReport, Violation, ViolationKind};
