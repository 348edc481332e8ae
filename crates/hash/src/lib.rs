//! The hash capability (spec §6 "Hash capability").
//!
//! A [`Hasher`] is a zero-sized marker type fixing a digest algorithm and
//! output width; the trie and store are generic over it the same way the
//! pack's own sparse-Merkle-tree crate is generic over its `Hasher`
//! (`Smt<D, H>`). Two implementations are provided: [`Blake3`] and
//! [`Sha256`]/[`Sha256Truncated`], the latter matching the specification's
//! own worked example of SHA-256 truncated to 20 bytes for a 160-bit key
//! space.

use urkel_types::Digest;

mod blake3_impl;
mod sha2_impl;

pub use blake3_impl::Blake3;
pub use sha2_impl::{Sha256, Sha256Truncated};

/// Prefix byte for a leaf digest: `H(0x00 ‖ key ‖ H(value))` (spec §3.1).
pub const LEAF_PREFIX: u8 = 0x00;

/// Prefix byte for an internal digest: `H(0x01 ‖ left ‖ right)` (spec §3.1).
pub const INTERNAL_PREFIX: u8 = 0x01;

/// A streaming hash context (spec §6: "a streaming context with init/update/final").
pub trait HashContext {
    /// Feeds more bytes into the running hash.
    fn update(&mut self, data: &[u8]) -> &mut Self;

    /// Consumes the context, producing the final digest.
    fn finalize(self) -> Digest;
}

/// The hash capability: fixed output width, a zero constant, a stateless
/// one-shot digest and a streaming context (spec §6).
pub trait Hasher: Clone + Send + Sync + 'static {
    /// The streaming context type for this algorithm.
    type Context: HashContext;

    /// Output width in bytes (`H` in the specification).
    const SIZE: usize;

    /// The all-zero digest of this width, denoting the empty tree.
    fn zero() -> Digest {
        Digest::zero(Self::SIZE)
    }

    /// Hashes `data` in one shot.
    fn hash(data: &[u8]) -> Digest;

    /// Opens a new streaming context.
    fn context() -> Self::Context;
}

/// Computes the leaf digest `H(0x00 ‖ key ‖ H(value))` (spec §3.1).
pub fn leaf_digest<H: Hasher>(key: &[u8], value: &[u8]) -> Digest {
    let value_digest = H::hash(value);
    let mut ctx = H::context();

    ctx.update(&[LEAF_PREFIX]).update(key).update(value_digest.as_bytes());

    ctx.finalize()
}

/// Computes a leaf digest from an already-hashed value: `H(0x00 ‖ key ‖ value_digest)`.
///
/// Used when reconstructing a collision-proof witness leaf, whose value is
/// never transmitted — only `H(value)` is (spec §4.3).
pub fn leaf_digest_from_value_digest<H: Hasher>(key: &[u8], value_digest: &Digest) -> Digest {
    let mut ctx = H::context();

    ctx.update(&[LEAF_PREFIX]).update(key).update(value_digest.as_bytes());

    ctx.finalize()
}

/// Computes the internal digest `H(0x01 ‖ left ‖ right)` (spec §3.1).
pub fn internal_digest<H: Hasher>(left: &Digest, right: &Digest) -> Digest {
    let mut ctx = H::context();

    ctx.update(&[INTERNAL_PREFIX])
        .update(left.as_bytes())
        .update(right.as_bytes());

    ctx.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_digest_matches_one_shot<H: Hasher>() {
        let key = b"some-key-bytes";
        let value = b"some-value";

        let expected = {
            let value_digest = H::hash(value);
            let mut buf = vec![LEAF_PREFIX];
            buf.extend_from_slice(key);
            buf.extend_from_slice(value_digest.as_bytes());
            H::hash(&buf)
        };

        assert_eq!(leaf_digest::<H>(key, value), expected);
    }

    #[test]
    fn blake3_leaf_digest() {
        leaf_digest_matches_one_shot::<Blake3>();
    }

    #[test]
    fn sha256_leaf_digest() {
        leaf_digest_matches_one_shot::<Sha256>();
    }

    #[test]
    fn internal_digest_is_deterministic() {
        let a = Blake3::hash(b"a");
        let b = Blake3::hash(b"b");

        assert_eq!(internal_digest::<Blake3>(&a, &b), internal_digest::<Blake3>(&a, &b));
        assert_ne!(internal_digest::<Blake3>(&a, &b), internal_digest::<Blake3>(&b, &a));
    }

    #[test]
    fn zero_is_all_zero_bytes() {
        assert!(Blake3::zero().is_zero());
        assert_eq!(Sha256Truncated::<20>::zero().len(), 20);
    }
}
