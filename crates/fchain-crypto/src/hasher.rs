use fchain_types::Digest;
use sha2::{Digest as _, Sha256};

/// Incremental SHA-256 hasher for file content.
///
/// Fed chunk by chunk while the same bytes are written to disk, so a file's
/// digest is known the moment the last chunk lands without re-reading it.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
    bytes: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Total bytes fed so far.
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes
    }

    pub fn finalize(self) -> Digest {
        Digest::from_hash(self.inner.finalize().into())
    }

    /// One-shot SHA-256 over a byte slice.
    pub fn digest(data: &[u8]) -> Digest {
        Digest::from_hash(Sha256::digest(data).into())
    }
}

/// Domain-separated SHA-256 over an unambiguous field framing.
///
/// Every variable-length value is written as a big-endian `u64` length
/// followed by its bytes; optional values carry a one-byte presence tag.
/// Two field sequences that differ in any value, or in where one field ends
/// and the next begins, never produce the same hash input.
///
/// The domain tag is framed the same way as the fields, so a tag cannot be
/// confused with the start of a payload.
pub struct FieldHasher {
    inner: Sha256,
}

impl FieldHasher {
    /// Domain tag for ledger blocks.
    pub const BLOCK_DOMAIN: &'static str = "fchain-block-v1";

    pub fn new(domain: &str) -> Self {
        let mut hasher = Self { inner: Sha256::new() };
        hasher.write_bytes(domain.as_bytes());
        hasher
    }

    pub fn u64(mut self, value: u64) -> Self {
        self.inner.update(value.to_be_bytes());
        self
    }

    pub fn i64(mut self, value: i64) -> Self {
        self.inner.update(value.to_be_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.inner.update(value.to_be_bytes());
        self
    }

    pub fn str(mut self, value: &str) -> Self {
        self.write_bytes(value.as_bytes());
        self
    }

    pub fn opt_str(mut self, value: Option<&str>) -> Self {
        match value {
            Some(s) => {
                self.inner.update([1u8]);
                self.write_bytes(s.as_bytes());
            }
            None => self.inner.update([0u8]),
        }
        self
    }

    pub fn digest(mut self, value: &Digest) -> Self {
        self.inner.update(value.as_bytes());
        self
    }

    pub fn opt_digest(mut self, value: Option<&Digest>) -> Self {
        match value {
            Some(d) => {
                self.inner.update([1u8]);
                self.inner.update(d.as_bytes());
            }
            None => self.inner.update([0u8]),
        }
        self
    }

    pub fn finish(self) -> Digest {
        Digest::from_hash(self.inner.finalize().into())
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.inner.update((bytes.len() as u64).to_be_bytes());
        self.inner.update(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn known_sha256_vector() {
        assert_eq!(ContentHasher::digest(b"hello").to_hex(), HELLO_SHA256);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut h = ContentHasher::new();
        h.update(b"he");
        h.update(b"");
        h.update(b"llo");
        assert_eq!(h.bytes_hashed(), 5);
        assert_eq!(h.finalize().to_hex(), HELLO_SHA256);
    }

    #[test]
    fn empty_content_digest() {
        assert_eq!(
            ContentHasher::new().finalize().to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn field_hash_is_deterministic() {
        let a = FieldHasher::new("d").u64(1).str("x").finish();
        let b = FieldHasher::new("d").u64(1).str("x").finish();
        assert_eq!(a, b);
    }

    #[test]
    fn domains_separate_hashes() {
        let a = FieldHasher::new("one").str("x").finish();
        let b = FieldHasher::new("two").str("x").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn absent_differs_from_empty() {
        let absent = FieldHasher::new("d").opt_str(None).finish();
        let empty = FieldHasher::new("d").opt_str(Some("")).finish();
        assert_ne!(absent, empty);
    }

    #[test]
    fn genesis_link_differs_from_zero_link() {
        let genesis = FieldHasher::new("d").opt_digest(None).finish();
        let zero = FieldHasher::new("d")
            .opt_digest(Some(&Digest::from_hash([0; 32])))
            .finish();
        assert_ne!(genesis, zero);
    }

    proptest! {
        #[test]
        fn field_boundaries_are_unambiguous(
            a in ".{0,16}",
            b in ".{0,16}",
            c in ".{0,16}",
            d in ".{0,16}",
        ) {
            prop_assume!((a.as_str(), b.as_str()) != (c.as_str(), d.as_str()));
            let left = FieldHasher::new("d").str(&a).str(&b).finish();
            let right = FieldHasher::new("d").str(&c).str(&d).finish();
            prop_assert_ne!(left, right);
        }
    }
}
