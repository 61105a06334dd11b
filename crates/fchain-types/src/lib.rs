//! Foundation types for fchain.
//!
//! Every other fchain crate depends on `fchain-types`. It holds the
//! [`Digest`] value used for file content hashes and block hashes alike.
//! On the wire a digest is always a lowercase hex string.

pub mod digest;
pub mod error;

pub use digest::Digest;
pub use error::TypeError;
